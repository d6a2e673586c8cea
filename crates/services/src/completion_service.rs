use std::sync::Arc;

use lingua_core::model::UserId;
use storage::repository::{StorageError, UserRepository};
use tracing::info;

use crate::Clock;
use crate::error::CompletionError;

/// Records lessons completed through the free-text key path.
#[derive(Clone)]
pub struct CompletionService {
    clock: Clock,
    users: Arc<dyn UserRepository>,
}

impl CompletionService {
    #[must_use]
    pub fn new(clock: Clock, users: Arc<dyn UserRepository>) -> Self {
        Self { clock, users }
    }

    /// Append `key` to the user's completed keys unless already present.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::EmptyKey` for a blank key,
    /// `CompletionError::UnknownUser` if the user does not exist, or
    /// `CompletionError::Storage` on write failure.
    pub async fn complete_lesson_key(
        &self,
        user_id: UserId,
        key: &str,
    ) -> Result<Vec<String>, CompletionError> {
        let key = key.trim();
        if key.is_empty() {
            return Err(CompletionError::EmptyKey);
        }

        let legacy = self
            .users
            .append_legacy_completion(user_id, key, Some(self.clock.now()))
            .await
            .map_err(|err| match err {
                StorageError::NotFound => CompletionError::UnknownUser,
                other => CompletionError::Storage(other),
            })?;

        info!(event = "lesson_key_completed", user_id = %user_id, key);
        Ok(legacy.keys)
    }

    /// # Errors
    ///
    /// Returns `CompletionError::Storage` if the keys cannot be read.
    pub async fn completed_lesson_keys(
        &self,
        user_id: UserId,
    ) -> Result<Vec<String>, CompletionError> {
        Ok(self.users.legacy_completions(user_id).await?.keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use lingua_core::model::{LearningCondition, User};
    use lingua_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn user_id() -> UserId {
        "65a000000000000000000001".parse().unwrap()
    }

    async fn repo_with_user() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        let user = User::new(user_id(), "Sam", LearningCondition::Dyslexia, fixed_now()).unwrap();
        repo.upsert_user(&user).await.unwrap();
        repo
    }

    #[tokio::test]
    async fn keys_are_trimmed_and_deduplicated() {
        let repo = repo_with_user().await;
        let mut clock = fixed_clock();
        let service = CompletionService::new(clock, Arc::new(repo.clone()));

        service
            .complete_lesson_key(user_id(), "  dyslexia-lesson-1 ")
            .await
            .unwrap();
        clock.advance(Duration::minutes(5));
        let service = CompletionService::new(clock, Arc::new(repo.clone()));
        let keys = service
            .complete_lesson_key(user_id(), "dyslexia-lesson-1")
            .await
            .unwrap();

        assert_eq!(keys, vec!["dyslexia-lesson-1"]);
        let legacy = repo.legacy_completions(user_id()).await.unwrap();
        assert_eq!(legacy.meta[0].completed_at, Some(fixed_now()));
        assert_eq!(service.completed_lesson_keys(user_id()).await.unwrap(), keys);
    }

    #[tokio::test]
    async fn blank_key_is_rejected() {
        let service = CompletionService::new(fixed_clock(), Arc::new(repo_with_user().await));
        assert!(matches!(
            service.complete_lesson_key(user_id(), "   ").await,
            Err(CompletionError::EmptyKey)
        ));
    }

    #[tokio::test]
    async fn unknown_user_is_reported() {
        let service = CompletionService::new(fixed_clock(), Arc::new(InMemoryRepository::new()));
        assert!(matches!(
            service.complete_lesson_key(user_id(), "adhd-lesson-1").await,
            Err(CompletionError::UnknownUser)
        ));
        assert!(service.completed_lesson_keys(user_id()).await.unwrap().is_empty());
    }
}
