//! Free-text completion keys recorded outside the structured progress table.
//!
//! A key may embed a real lesson id (`"completed-507f1f77bcf86cd799439011"`)
//! or be an opaque in-app identifier (`"autism-lesson-1"`). Keys are
//! classified once into [`LegacyEntry`] so the merge logic never inspects
//! string shape.

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::ids::LessonId;

static EMBEDDED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{24}").expect("embedded id pattern is valid")
});

/// A classified legacy completion key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LegacyEntry {
    /// The key embeds a 24-hex substring that may name a catalog lesson.
    DbBacked(LessonId),
    /// Display-only key with no embedded id.
    Opaque(String),
}

impl LegacyEntry {
    /// Classifies a key by its first 24-hex-character substring.
    #[must_use]
    pub fn classify(key: &str) -> Self {
        EMBEDDED_ID
            .find(key)
            .and_then(|m| m.as_str().parse::<LessonId>().ok())
            .map_or_else(|| Self::Opaque(key.to_owned()), Self::DbBacked)
    }
}

/// Metadata recorded next to a legacy key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCompletionMeta {
    pub key: String,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A user's legacy completion list with its metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyCompletions {
    pub keys: Vec<String>,
    pub meta: Vec<LegacyCompletionMeta>,
}

impl LegacyCompletions {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// `key -> completed_at` lookup. Later metadata entries win; entries
    /// without a timestamp never shadow one that has it.
    #[must_use]
    pub fn completed_at_by_key(&self) -> HashMap<&str, DateTime<Utc>> {
        self.meta
            .iter()
            .filter_map(|m| m.completed_at.map(|at| (m.key.as_str(), at)))
            .collect()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    /// Appends `key` unless already present. Returns whether it was added.
    pub fn push(&mut self, key: impl Into<String>, completed_at: Option<DateTime<Utc>>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.meta.push(LegacyCompletionMeta {
            key: key.clone(),
            completed_at,
        });
        self.keys.push(key);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn plain_key_is_opaque() {
        assert_eq!(
            LegacyEntry::classify("autism-lesson-1"),
            LegacyEntry::Opaque("autism-lesson-1".into())
        );
    }

    #[test]
    fn embedded_id_is_extracted() {
        let entry = LegacyEntry::classify("completed-507f1f77bcf86cd799439099");
        let expected: LessonId = "507f1f77bcf86cd799439099".parse().unwrap();
        assert_eq!(entry, LegacyEntry::DbBacked(expected));
    }

    #[test]
    fn first_embedded_id_wins() {
        let entry = LegacyEntry::classify(
            "507f1f77bcf86cd799439011/507f1f77bcf86cd799439022",
        );
        let expected: LessonId = "507f1f77bcf86cd799439011".parse().unwrap();
        assert_eq!(entry, LegacyEntry::DbBacked(expected));
    }

    #[test]
    fn short_hex_run_stays_opaque() {
        assert!(matches!(
            LegacyEntry::classify("lesson-deadbeef"),
            LegacyEntry::Opaque(_)
        ));
    }

    #[test]
    fn push_is_idempotent_per_key() {
        let mut legacy = LegacyCompletions::empty();
        assert!(legacy.push("autism-lesson-1", Some(fixed_now())));
        assert!(!legacy.push("autism-lesson-1", None));
        assert_eq!(legacy.keys.len(), 1);
        assert_eq!(
            legacy.completed_at_by_key().get("autism-lesson-1"),
            Some(&fixed_now())
        );
    }
}
