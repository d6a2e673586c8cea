use std::collections::HashMap;
use std::sync::Arc;

use lingua_core::model::{LessonId, Summary, SummaryPlan, UserId};
use storage::repository::{LessonCatalog, ProgressRepository, UserRepository};
use tracing::{debug, warn};

use crate::error::SummaryError;

/// Builds a learner's progress summary from structured rows and legacy keys.
///
/// Stateless between calls: every summary is computed from storage, so
/// repeated calls without writes in between return the same value.
#[derive(Clone)]
pub struct SummaryService {
    progress: Arc<dyn ProgressRepository>,
    users: Arc<dyn UserRepository>,
    lessons: Arc<dyn LessonCatalog>,
}

impl SummaryService {
    #[must_use]
    pub fn new(
        progress: Arc<dyn ProgressRepository>,
        users: Arc<dyn UserRepository>,
        lessons: Arc<dyn LessonCatalog>,
    ) -> Self {
        Self {
            progress,
            users,
            lessons,
        }
    }

    /// Reconcile completions for `user_id`.
    ///
    /// Progress rows and legacy keys are fetched concurrently; the catalog
    /// count and the title batch follow once both are in.
    ///
    /// # Errors
    ///
    /// Returns `SummaryError::Storage` if the progress rows, legacy keys or
    /// catalog count cannot be read. A failed title lookup is not an error.
    pub async fn get_summary(&self, user_id: UserId) -> Result<Summary, SummaryError> {
        let (progress, legacy) = tokio::try_join!(
            self.progress.completed_progress(user_id),
            self.users.legacy_completions(user_id),
        )?;

        let plan = SummaryPlan::new(&progress, &legacy);
        let ids = plan.lesson_ids();

        let (count, titles) = tokio::join!(self.lessons.count_all(), self.titles_for(&ids));
        let summary = plan.into_summary(count?, &titles);

        debug!(
            event = "summary_built",
            user_id = %user_id,
            total = summary.total_lessons,
            completed = summary.completed_count,
        );
        Ok(summary)
    }

    async fn titles_for(&self, ids: &[LessonId]) -> HashMap<LessonId, String> {
        if ids.is_empty() {
            return HashMap::new();
        }
        match self.lessons.find_titles_by_ids(ids).await {
            Ok(rows) => rows.into_iter().collect(),
            Err(err) => {
                warn!(event = "title_lookup_failed", count = ids.len(), error = %err);
                HashMap::new()
            }
        }
    }
}
