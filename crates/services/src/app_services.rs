use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::completion_service::CompletionService;
use crate::error::AppServicesError;
use crate::interaction_service::InteractionService;
use crate::lesson_service::LessonService;
use crate::preferences_service::PreferencesService;
use crate::progress_service::ProgressService;
use crate::summary_service::SummaryService;

/// Assembles the services handed to request handlers.
#[derive(Clone)]
pub struct AppServices {
    summaries: Arc<SummaryService>,
    progress: Arc<ProgressService>,
    completions: Arc<CompletionService>,
    lessons: Arc<LessonService>,
    interactions: Arc<InteractionService>,
    preferences: Arc<PreferencesService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if connecting or migrating fails.
    pub async fn new_sqlite(db_url: &str, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock))
    }

    /// Build services over fresh in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock) -> Self {
        let summaries = Arc::new(SummaryService::new(
            Arc::clone(&storage.progress),
            Arc::clone(&storage.users),
            Arc::clone(&storage.lessons),
        ));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.progress),
            Arc::clone(&storage.lessons),
            Arc::clone(&summaries),
        ));
        let completions = Arc::new(CompletionService::new(clock, Arc::clone(&storage.users)));
        let lessons = Arc::new(LessonService::new(clock, Arc::clone(&storage.lessons)));
        let interactions = Arc::new(InteractionService::new(
            clock,
            Arc::clone(&storage.lessons),
            Arc::clone(&storage.interactions),
        ));
        let preferences = Arc::new(PreferencesService::new(
            clock,
            Arc::clone(&storage.preferences),
            Arc::clone(&storage.users),
        ));

        Self {
            summaries,
            progress,
            completions,
            lessons,
            interactions,
            preferences,
        }
    }

    #[must_use]
    pub fn summaries(&self) -> Arc<SummaryService> {
        Arc::clone(&self.summaries)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn completions(&self) -> Arc<CompletionService> {
        Arc::clone(&self.completions)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn interactions(&self) -> Arc<InteractionService> {
        Arc::clone(&self.interactions)
    }

    #[must_use]
    pub fn preferences(&self) -> Arc<PreferencesService> {
        Arc::clone(&self.preferences)
    }
}
