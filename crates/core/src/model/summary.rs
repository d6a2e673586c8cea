//! Merges structured progress rows and legacy completion keys into one view.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ids::LessonId;
use crate::model::legacy::{LegacyCompletions, LegacyEntry};
use crate::model::progress::ProgressRecord;

/// Title shown for an id that does not resolve to a catalog lesson.
pub const UNTITLED: &str = "Untitled";

/// One completed item in a summary.
///
/// `lesson_id` is the hex lesson id for catalog-backed items and the raw key
/// for opaque legacy items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedLesson {
    pub lesson_id: String,
    pub title: String,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Overall completion state for a learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Catalog size, raised to the number of distinct completed items.
    ///
    /// Opaque legacy keys count here, so this is a display figure rather
    /// than a true catalog count.
    pub total_lessons: u64,
    pub completed_count: u64,
    pub remaining: u64,
    pub percentage: u8,
    /// Newest first; entries without a timestamp come last.
    pub completed_lessons: Vec<CompletedLesson>,
}

/// Completed items gathered from both sources, before titles are known.
///
/// Built with [`SummaryPlan::new`]; the caller fetches titles for
/// [`SummaryPlan::lesson_ids`] in one batch and finishes with
/// [`SummaryPlan::into_summary`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryPlan {
    db_backed: Vec<(LessonId, Option<DateTime<Utc>>)>,
    opaque: Vec<(String, Option<DateTime<Utc>>)>,
}

impl SummaryPlan {
    /// Unions progress-derived ids with ids embedded in legacy keys.
    ///
    /// Insertion order is progress rows first, then legacy keys in stored
    /// order. Rows with `completed = false` are skipped.
    #[must_use]
    pub fn new(progress: &[ProgressRecord], legacy: &LegacyCompletions) -> Self {
        let meta = legacy.completed_at_by_key();
        let mut plan = Self::default();
        let mut index: HashMap<LessonId, usize> = HashMap::new();

        for record in progress.iter().filter(|r| r.completed) {
            if index.contains_key(&record.lesson_id) {
                continue;
            }
            index.insert(record.lesson_id, plan.db_backed.len());
            plan.db_backed
                .push((record.lesson_id, Some(record.effective_completed_at())));
        }

        let mut opaque_seen: HashSet<String> = HashSet::new();
        for key in &legacy.keys {
            let completed_at = meta.get(key.as_str()).copied();
            match LegacyEntry::classify(key) {
                LegacyEntry::DbBacked(id) => match index.get(&id) {
                    Some(&slot) => {
                        let existing = &mut plan.db_backed[slot].1;
                        if existing.is_none() {
                            *existing = completed_at;
                        }
                    }
                    None => {
                        index.insert(id, plan.db_backed.len());
                        plan.db_backed.push((id, completed_at));
                    }
                },
                LegacyEntry::Opaque(key) => {
                    if opaque_seen.insert(key.clone()) {
                        plan.opaque.push((key, completed_at));
                    }
                }
            }
        }

        plan
    }

    /// Every catalog-backed id, for a single title lookup.
    #[must_use]
    pub fn lesson_ids(&self) -> Vec<LessonId> {
        self.db_backed.iter().map(|(id, _)| *id).collect()
    }

    #[must_use]
    pub fn distinct_count(&self) -> usize {
        self.db_backed.len() + self.opaque.len()
    }

    /// Attaches titles, adjusts the total and sorts newest first.
    ///
    /// Ids missing from `titles` are titled [`UNTITLED`] and still counted.
    #[must_use]
    pub fn into_summary(self, catalog_count: u64, titles: &HashMap<LessonId, String>) -> Summary {
        let mut completed_lessons: Vec<CompletedLesson> =
            Vec::with_capacity(self.distinct_count());

        for (id, completed_at) in self.db_backed {
            completed_lessons.push(CompletedLesson {
                lesson_id: id.to_string(),
                title: titles
                    .get(&id)
                    .cloned()
                    .unwrap_or_else(|| UNTITLED.to_owned()),
                completed_at,
            });
        }
        for (key, completed_at) in self.opaque {
            completed_lessons.push(CompletedLesson {
                lesson_id: key.clone(),
                title: key,
                completed_at,
            });
        }

        // `None < Some(_)`, so a descending sort leaves untimed entries last.
        completed_lessons.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

        let completed_count = completed_lessons.len() as u64;
        let total_lessons = catalog_count.max(completed_count);
        Summary {
            total_lessons,
            completed_count,
            remaining: total_lessons.saturating_sub(completed_count),
            percentage: percentage(completed_count, total_lessons),
            completed_lessons,
        }
    }
}

/// Rounded share of `completed` in `total`, `0` for an empty catalog.
fn percentage(completed: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let scaled = (u128::from(completed) * 200 + u128::from(total)) / (u128::from(total) * 2);
    u8::try_from(scaled.min(100)).unwrap_or(100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::UserId;
    use crate::model::legacy::LegacyCompletionMeta;
    use crate::time::fixed_now;
    use chrono::Duration;

    const LESSON_A: &str = "507f1f77bcf86cd799439011";
    const LESSON_B: &str = "507f1f77bcf86cd799439022";

    fn user() -> UserId {
        "65a000000000000000000001".parse().unwrap()
    }

    fn completed(lesson: &str, at: DateTime<Utc>) -> ProgressRecord {
        let mut rec = ProgressRecord::started(user(), lesson.parse().unwrap(), "", at);
        rec.completed = true;
        rec.completed_at = Some(at);
        rec
    }

    fn legacy(keys: &[(&str, Option<DateTime<Utc>>)]) -> LegacyCompletions {
        LegacyCompletions {
            keys: keys.iter().map(|(k, _)| (*k).to_owned()).collect(),
            meta: keys
                .iter()
                .map(|(k, at)| LegacyCompletionMeta {
                    key: (*k).to_owned(),
                    completed_at: *at,
                })
                .collect(),
        }
    }

    fn titles(pairs: &[(&str, &str)]) -> HashMap<LessonId, String> {
        pairs
            .iter()
            .map(|(id, title)| (id.parse().unwrap(), (*title).to_owned()))
            .collect()
    }

    #[test]
    fn same_lesson_from_both_sources_appears_once() {
        let progress = vec![completed(LESSON_A, fixed_now())];
        let key = format!("done-{LESSON_A}");
        let legacy = legacy(&[(key.as_str(), None)]);
        let plan = SummaryPlan::new(&progress, &legacy);
        assert_eq!(plan.lesson_ids().len(), 1);

        let summary = plan.into_summary(3, &titles(&[(LESSON_A, "Colors")]));
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.completed_lessons[0].title, "Colors");
        assert_eq!(summary.completed_lessons[0].completed_at, Some(fixed_now()));
    }

    #[test]
    fn incomplete_rows_are_ignored() {
        let mut rec = completed(LESSON_A, fixed_now());
        rec.completed = false;
        let summary = SummaryPlan::new(&[rec], &LegacyCompletions::empty())
            .into_summary(4, &HashMap::new());
        assert_eq!(summary.completed_count, 0);
        assert_eq!(summary.remaining, 4);
        assert_eq!(summary.percentage, 0);
    }

    #[test]
    fn orders_newest_first_with_untimed_last() {
        let now = fixed_now();
        let progress = vec![
            completed(LESSON_A, now),
            completed(LESSON_B, now + Duration::days(2)),
        ];
        let legacy = legacy(&[
            ("autism-lesson-1", None),
            ("autism-lesson-2", Some(now + Duration::days(1))),
        ]);
        let summary = SummaryPlan::new(&progress, &legacy).into_summary(0, &HashMap::new());

        let order: Vec<&str> = summary
            .completed_lessons
            .iter()
            .map(|l| l.lesson_id.as_str())
            .collect();
        assert_eq!(order, vec![LESSON_B, "autism-lesson-2", LESSON_A, "autism-lesson-1"]);
    }

    #[test]
    fn opaque_key_passes_through() {
        let at = fixed_now();
        let summary = SummaryPlan::new(&[], &legacy(&[("autism-lesson-1", Some(at))]))
            .into_summary(10, &HashMap::new());
        let entry = &summary.completed_lessons[0];
        assert_eq!(entry.lesson_id, "autism-lesson-1");
        assert_eq!(entry.title, "autism-lesson-1");
        assert_eq!(entry.completed_at, Some(at));
    }

    #[test]
    fn unresolved_embedded_id_counts_as_untitled() {
        let summary = SummaryPlan::new(
            &[],
            &legacy(&[("completed-507f1f77bcf86cd799439099", None)]),
        )
        .into_summary(5, &HashMap::new());
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.completed_lessons[0].title, UNTITLED);
        assert_eq!(
            summary.completed_lessons[0].lesson_id,
            "507f1f77bcf86cd799439099"
        );
    }

    #[test]
    fn total_is_raised_to_completed_items() {
        let summary = SummaryPlan::new(
            &[],
            &legacy(&[("autism-lesson-1", None), ("autism-lesson-2", None)]),
        )
        .into_summary(1, &HashMap::new());
        assert_eq!(summary.total_lessons, 2);
        assert_eq!(summary.completed_count, 2);
        assert_eq!(summary.remaining, 0);
        assert_eq!(summary.percentage, 100);
    }

    #[test]
    fn completed_never_exceeds_total() {
        for catalog in 0..4_u64 {
            for extra in 0..4_usize {
                let keys: Vec<(String, Option<DateTime<Utc>>)> =
                    (0..extra).map(|i| (format!("key-{i}"), None)).collect();
                let keys: Vec<(&str, Option<DateTime<Utc>>)> =
                    keys.iter().map(|(k, at)| (k.as_str(), *at)).collect();
                let summary = SummaryPlan::new(&[], &legacy(&keys))
                    .into_summary(catalog, &HashMap::new());
                assert!(summary.completed_count <= summary.total_lessons);
                assert!(summary.percentage <= 100);
            }
        }
    }

    #[test]
    fn duplicate_opaque_keys_collapse() {
        let legacy = LegacyCompletions {
            keys: vec!["autism-lesson-1".into(), "autism-lesson-1".into()],
            meta: Vec::new(),
        };
        let summary = SummaryPlan::new(&[], &legacy).into_summary(1, &HashMap::new());
        assert_eq!(summary.completed_count, 1);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
    }
}
