use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::ids::{LessonId, UserId};

/// Per-user, per-lesson progress row. Unique on `(user_id, lesson_id)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub current_section_id: String,
    pub completed_sections: Vec<String>,
    pub interaction_states: Map<String, Value>,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub last_accessed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// A fresh, not-yet-completed row as created on first access.
    #[must_use]
    pub fn started(
        user_id: UserId,
        lesson_id: LessonId,
        current_section_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            current_section_id: current_section_id.into(),
            completed_sections: Vec::new(),
            interaction_states: Map::new(),
            completed: false,
            completed_at: None,
            last_accessed_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    /// Completion time used for summaries: `completed_at`, else `updated_at`.
    ///
    /// Every stored row carries `updated_at` (initialized to `created_at`), so
    /// that is the last fallback.
    #[must_use]
    pub fn effective_completed_at(&self) -> DateTime<Utc> {
        self.completed_at.unwrap_or(self.updated_at)
    }

    /// Applies a patch in place; `None` fields keep their stored value.
    pub fn apply(&mut self, patch: &ProgressPatch, now: DateTime<Utc>) {
        if let Some(section) = &patch.current_section_id {
            self.current_section_id.clone_from(section);
        }
        if let Some(sections) = &patch.completed_sections {
            self.completed_sections = dedup_sections(sections);
        }
        if let Some(states) = &patch.interaction_states {
            self.interaction_states.clone_from(states);
        }
        if patch.mark_completed {
            self.completed = true;
            if self.completed_at.is_none() {
                self.completed_at = Some(now);
            }
        }
        self.last_accessed_at = now;
        self.updated_at = now;
    }
}

/// Partial update for a progress row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressPatch {
    pub current_section_id: Option<String>,
    pub completed_sections: Option<Vec<String>>,
    pub interaction_states: Option<Map<String, Value>>,
    /// Sets `completed`; `completed_at` is only stamped the first time.
    pub mark_completed: bool,
}

impl ProgressPatch {
    #[must_use]
    pub fn completion() -> Self {
        Self {
            mark_completed: true,
            ..Self::default()
        }
    }
}

/// Removes repeated section ids, keeping the first occurrence of each.
#[must_use]
pub fn dedup_sections(sections: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::with_capacity(sections.len());
    sections
        .iter()
        .filter(|s| seen.insert(s.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn record() -> ProgressRecord {
        ProgressRecord::started(
            "65a000000000000000000001".parse().unwrap(),
            "507f1f77bcf86cd799439011".parse().unwrap(),
            "",
            fixed_now(),
        )
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let input = vec!["b".to_owned(), "a".to_owned(), "b".to_owned(), "c".to_owned()];
        assert_eq!(dedup_sections(&input), vec!["b", "a", "c"]);
    }

    #[test]
    fn completion_stamps_once() {
        let mut rec = record();
        let first = fixed_now() + Duration::hours(1);
        rec.apply(&ProgressPatch::completion(), first);
        rec.apply(&ProgressPatch::completion(), first + Duration::hours(1));
        assert!(rec.completed);
        assert_eq!(rec.completed_at, Some(first));
        assert_eq!(rec.updated_at, first + Duration::hours(1));
    }

    #[test]
    fn effective_completed_at_falls_back_to_updated_at() {
        let mut rec = record();
        rec.updated_at = fixed_now() + Duration::days(1);
        assert_eq!(rec.effective_completed_at(), fixed_now() + Duration::days(1));
        rec.completed_at = Some(fixed_now() + Duration::days(2));
        assert_eq!(rec.effective_completed_at(), fixed_now() + Duration::days(2));
    }

    #[test]
    fn patch_leaves_unset_fields_alone() {
        let mut rec = record();
        rec.current_section_id = "intro".into();
        rec.apply(
            &ProgressPatch {
                completed_sections: Some(vec!["intro".into(), "intro".into()]),
                ..ProgressPatch::default()
            },
            fixed_now(),
        );
        assert_eq!(rec.current_section_id, "intro");
        assert_eq!(rec.completed_sections, vec!["intro"]);
        assert!(!rec.completed);
    }
}
