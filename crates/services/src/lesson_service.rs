use std::sync::Arc;

use lingua_core::model::{Interaction, Lesson, LessonId, LessonSection, SectionId};
use storage::repository::LessonCatalog;

use crate::Clock;
use crate::error::LessonServiceError;

/// Lesson catalog access for handlers and seeding.
#[derive(Clone)]
pub struct LessonService {
    clock: Clock,
    lessons: Arc<dyn LessonCatalog>,
}

impl LessonService {
    #[must_use]
    pub fn new(clock: Clock, lessons: Arc<dyn LessonCatalog>) -> Self {
        Self { clock, lessons }
    }

    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if the catalog cannot be read.
    pub async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, LessonServiceError> {
        Ok(self.lessons.get_lesson(id).await?)
    }

    /// Sections of the lesson in reading order; empty for an unknown lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Storage` if the catalog cannot be read.
    pub async fn list_sections(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonSection>, LessonServiceError> {
        Ok(self.lessons.list_sections(lesson_id).await?)
    }

    /// Create a lesson with its sections in the given order.
    ///
    /// Everything is validated before the single catalog write, so a failure
    /// leaves no partial lesson behind.
    ///
    /// # Errors
    ///
    /// Returns `LessonServiceError::Lesson` for blank fields or duplicate
    /// interaction ids, or `LessonServiceError::Storage` if persistence fails.
    pub async fn create_lesson(
        &self,
        id: LessonId,
        title: &str,
        text_content: &str,
        section_titles: &[&str],
        interactions: Vec<Interaction>,
    ) -> Result<Lesson, LessonServiceError> {
        let now = self.clock.now();
        let lesson = Lesson::new(id, title, text_content, now)?.with_interactions(interactions)?;
        let sections = section_titles
            .iter()
            .zip(0_u32..)
            .map(|(title, order)| LessonSection::new(SectionId::generate(now), id, order, *title))
            .collect::<Result<Vec<_>, _>>()?;

        self.lessons.save_lesson(&lesson, &sections).await?;
        Ok(lesson)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use lingua_core::model::LessonError;
    use lingua_core::time::fixed_clock;
    use storage::repository::{InMemoryRepository, StorageError};

    fn lesson_id() -> LessonId {
        "507f1f77bcf86cd799439011".parse().unwrap()
    }

    /// Catalog whose writes always fail after reads succeed.
    struct ReadOnlyCatalog {
        inner: InMemoryRepository,
    }

    #[async_trait]
    impl LessonCatalog for ReadOnlyCatalog {
        async fn count_all(&self) -> Result<u64, StorageError> {
            self.inner.count_all().await
        }

        async fn find_titles_by_ids(
            &self,
            ids: &[LessonId],
        ) -> Result<Vec<(LessonId, String)>, StorageError> {
            self.inner.find_titles_by_ids(ids).await
        }

        async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
            self.inner.get_lesson(id).await
        }

        async fn save_lesson(
            &self,
            _lesson: &Lesson,
            _sections: &[LessonSection],
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("database is read-only".into()))
        }

        async fn list_sections(
            &self,
            lesson_id: LessonId,
        ) -> Result<Vec<LessonSection>, StorageError> {
            self.inner.list_sections(lesson_id).await
        }

        async fn first_section_id(
            &self,
            lesson_id: LessonId,
        ) -> Result<Option<SectionId>, StorageError> {
            self.inner.first_section_id(lesson_id).await
        }
    }

    #[tokio::test]
    async fn create_then_get_lesson() {
        let repo = InMemoryRepository::new();
        let service = LessonService::new(fixed_clock(), Arc::new(repo.clone()));

        let created = service
            .create_lesson(lesson_id(), "Shapes", "Circle, square", &["Intro", "Quiz"], Vec::new())
            .await
            .unwrap();
        let fetched = service.get_lesson(lesson_id()).await.unwrap();
        assert_eq!(fetched, Some(created));

        let sections = service.list_sections(lesson_id()).await.unwrap();
        let titles: Vec<&str> = sections.iter().map(LessonSection::title).collect();
        assert_eq!(titles, vec!["Intro", "Quiz"]);
        assert_eq!(
            repo.first_section_id(lesson_id()).await.unwrap(),
            Some(sections[0].id())
        );
    }

    #[tokio::test]
    async fn blank_section_title_writes_nothing() {
        let repo = InMemoryRepository::new();
        let service = LessonService::new(fixed_clock(), Arc::new(repo.clone()));

        let err = service
            .create_lesson(lesson_id(), "Shapes", "text", &["Intro", " "], Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LessonServiceError::Lesson(LessonError::EmptySectionTitle)
        ));
        assert_eq!(service.get_lesson(lesson_id()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn failed_write_leaves_no_lesson() {
        let repo = InMemoryRepository::new();
        let service = LessonService::new(
            fixed_clock(),
            Arc::new(ReadOnlyCatalog {
                inner: repo.clone(),
            }),
        );

        let err = service
            .create_lesson(lesson_id(), "Shapes", "text", &["Intro"], Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, LessonServiceError::Storage(_)));
        assert_eq!(repo.get_lesson(lesson_id()).await.unwrap(), None);
        assert!(repo.list_sections(lesson_id()).await.unwrap().is_empty());
    }
}
