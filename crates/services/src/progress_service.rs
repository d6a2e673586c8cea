use std::sync::Arc;

use lingua_core::model::{LessonId, ProgressPatch, ProgressRecord, Summary, UserId};
use serde_json::{Map, Value};
use storage::repository::{LessonCatalog, ProgressRepository};
use tracing::info;

use crate::Clock;
use crate::error::ProgressError;
use crate::summary_service::SummaryService;

/// Client-reported progress for one lesson.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub lesson_id: LessonId,
    pub current_section_id: Option<String>,
    pub completed_sections: Option<Vec<String>>,
    pub interaction_states: Option<Map<String, Value>>,
    /// Replays never write; the stored row is returned as-is.
    pub is_replay: bool,
}

impl ProgressUpdate {
    #[must_use]
    pub fn new(lesson_id: LessonId) -> Self {
        Self {
            lesson_id,
            current_section_id: None,
            completed_sections: None,
            interaction_states: None,
            is_replay: false,
        }
    }

    fn patch(&self) -> ProgressPatch {
        ProgressPatch {
            current_section_id: self.current_section_id.clone(),
            completed_sections: self.completed_sections.clone(),
            interaction_states: self.interaction_states.clone(),
            mark_completed: false,
        }
    }
}

/// Reads and writes structured per-lesson progress.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    lessons: Arc<dyn LessonCatalog>,
    summaries: Arc<SummaryService>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        lessons: Arc<dyn LessonCatalog>,
        summaries: Arc<SummaryService>,
    ) -> Self {
        Self {
            clock,
            progress,
            lessons,
            summaries,
        }
    }

    /// Returns the stored row, creating it on first access.
    ///
    /// A new row starts at the lesson's first section, or at `""` when the
    /// lesson has no sections.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the row cannot be read or created.
    pub async fn get_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<ProgressRecord, ProgressError> {
        if let Some(row) = self.progress.get_progress(user_id, lesson_id).await? {
            return Ok(row);
        }

        let first = self
            .lessons
            .first_section_id(lesson_id)
            .await?
            .map(|id| id.to_string())
            .unwrap_or_default();
        let row = self
            .progress
            .ensure_progress(user_id, lesson_id, &first, self.clock.now())
            .await?;

        info!(event = "progress_started", user_id = %user_id, lesson_id = %lesson_id);
        Ok(row)
    }

    /// Applies an update, or returns the stored row untouched for replays.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the row cannot be read or written.
    pub async fn update_progress(
        &self,
        user_id: UserId,
        update: &ProgressUpdate,
    ) -> Result<Option<ProgressRecord>, ProgressError> {
        if update.is_replay {
            let row = self.progress.get_progress(user_id, update.lesson_id).await?;
            return Ok(row);
        }

        let row = self
            .progress
            .upsert_progress(user_id, update.lesson_id, &update.patch(), self.clock.now())
            .await?;
        Ok(Some(row))
    }

    /// Marks the lesson completed and returns the refreshed summary.
    ///
    /// The first completion time is kept on repeated calls.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the row cannot be written or the summary
    /// cannot be rebuilt.
    pub async fn mark_complete(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Summary, ProgressError> {
        let row = self
            .progress
            .upsert_progress(user_id, lesson_id, &ProgressPatch::completion(), self.clock.now())
            .await?;
        info!(
            event = "lesson_completed",
            user_id = %user_id,
            lesson_id = %lesson_id,
            completed_at = ?row.completed_at,
        );

        Ok(self.summaries.get_summary(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use lingua_core::model::{Lesson, LessonSection, SectionId};
    use lingua_core::time::{fixed_clock, fixed_now};
    use serde_json::json;
    use storage::repository::{InMemoryRepository, Storage};

    fn user_id() -> UserId {
        "65a000000000000000000001".parse().unwrap()
    }

    fn lesson_id() -> LessonId {
        "507f1f77bcf86cd799439011".parse().unwrap()
    }

    fn service(repo: &InMemoryRepository, clock: Clock) -> ProgressService {
        let storage = Storage::from_repository(repo.clone());
        let summaries = Arc::new(SummaryService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.users),
            Arc::clone(&storage.lessons),
        ));
        ProgressService::new(clock, storage.progress, storage.lessons, summaries)
    }

    #[tokio::test]
    async fn first_access_starts_at_first_section() {
        let repo = InMemoryRepository::new();
        let lesson = Lesson::new(lesson_id(), "Colors", "text", fixed_now()).unwrap();
        let intro = LessonSection::new(SectionId::generate(fixed_now()), lesson_id(), 0, "Intro")
            .unwrap();
        repo.save_lesson(&lesson, &[intro.clone()]).await.unwrap();

        let service = service(&repo, fixed_clock());
        let row = service.get_progress(user_id(), lesson_id()).await.unwrap();
        assert_eq!(row.current_section_id, intro.id().to_string());
        assert!(!row.completed);

        let again = service.get_progress(user_id(), lesson_id()).await.unwrap();
        assert_eq!(row, again);
    }

    #[tokio::test]
    async fn lesson_without_sections_starts_empty() {
        let repo = InMemoryRepository::new();
        let row = service(&repo, fixed_clock())
            .get_progress(user_id(), lesson_id())
            .await
            .unwrap();
        assert_eq!(row.current_section_id, "");
    }

    #[tokio::test]
    async fn replay_does_not_write() {
        let repo = InMemoryRepository::new();
        let service = service(&repo, fixed_clock());

        let mut update = ProgressUpdate::new(lesson_id());
        update.current_section_id = Some("quiz".into());
        update.is_replay = true;
        assert_eq!(service.update_progress(user_id(), &update).await.unwrap(), None);
        assert_eq!(repo.get_progress(user_id(), lesson_id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_dedups_sections_and_keeps_missing_fields() {
        let repo = InMemoryRepository::new();
        let service = service(&repo, fixed_clock());

        let mut first = ProgressUpdate::new(lesson_id());
        first.current_section_id = Some("video".into());
        first.interaction_states = json!({"q1": 2}).as_object().cloned();
        service.update_progress(user_id(), &first).await.unwrap();

        let mut second = ProgressUpdate::new(lesson_id());
        second.completed_sections = Some(vec!["intro".into(), "video".into(), "intro".into()]);
        let row = service
            .update_progress(user_id(), &second)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(row.completed_sections, vec!["intro", "video"]);
        assert_eq!(row.current_section_id, "video");
        assert_eq!(row.interaction_states["q1"], json!(2));
    }

    #[tokio::test]
    async fn mark_complete_keeps_first_timestamp() {
        let repo = InMemoryRepository::new();
        let lesson = Lesson::new(lesson_id(), "Colors", "text", fixed_now()).unwrap();
        repo.save_lesson(&lesson, &[]).await.unwrap();

        let summary = service(&repo, fixed_clock())
            .mark_complete(user_id(), lesson_id())
            .await
            .unwrap();
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.percentage, 100);
        assert_eq!(summary.completed_lessons[0].title, "Colors");

        let later = Clock::fixed(fixed_now() + Duration::days(2));
        let summary = service(&repo, later)
            .mark_complete(user_id(), lesson_id())
            .await
            .unwrap();
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.completed_lessons[0].completed_at, Some(fixed_now()));
    }
}
