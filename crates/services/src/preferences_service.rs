use std::sync::Arc;

use lingua_core::model::{
    PreferenceGroup, PreferenceSettings, Preferences, PreferencesPatch, UserId,
};
use storage::repository::{PreferencesRepository, UserRepository};
use tracing::info;

use crate::Clock;
use crate::error::PreferencesServiceError;

/// Accessibility settings: one document per learner.
#[derive(Clone)]
pub struct PreferencesService {
    clock: Clock,
    preferences: Arc<dyn PreferencesRepository>,
    users: Arc<dyn UserRepository>,
}

impl PreferencesService {
    #[must_use]
    pub fn new(
        clock: Clock,
        preferences: Arc<dyn PreferencesRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            clock,
            preferences,
            users,
        }
    }

    /// # Errors
    ///
    /// Returns `PreferencesServiceError::NotFound` when the learner has no
    /// settings yet, or `PreferencesServiceError::Storage`.
    pub async fn get(&self, user_id: UserId) -> Result<Preferences, PreferencesServiceError> {
        self.preferences
            .get_preferences(user_id)
            .await?
            .ok_or(PreferencesServiceError::NotFound)
    }

    /// Applies any subset of settings, creating the document from plain
    /// defaults first if the learner has none.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError::Invalid` for out-of-range values,
    /// or `PreferencesServiceError::Storage`.
    pub async fn update(
        &self,
        user_id: UserId,
        patch: &PreferencesPatch,
    ) -> Result<Preferences, PreferencesServiceError> {
        patch.validate()?;
        let now = self.clock.now();
        self.preferences
            .ensure_preferences(&Preferences::new(user_id, PreferenceSettings::default(), now))
            .await?;
        let prefs = self
            .preferences
            .patch_preferences(user_id, patch, now)
            .await?
            .ok_or(PreferencesServiceError::NotFound)?;

        info!(event = "preferences_updated", user_id = %user_id);
        Ok(prefs)
    }

    /// Applies only the fields `group` owns; the rest of `patch` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError::NotFound` when the learner has no
    /// settings, `PreferencesServiceError::Invalid` for out-of-range values,
    /// or `PreferencesServiceError::Storage`.
    pub async fn update_group(
        &self,
        user_id: UserId,
        group: PreferenceGroup,
        patch: &PreferencesPatch,
    ) -> Result<Preferences, PreferencesServiceError> {
        let patch = group.restrict(patch);
        patch.validate()?;
        if patch.is_empty() {
            return self.get(user_id).await;
        }

        let prefs = self
            .preferences
            .patch_preferences(user_id, &patch, self.clock.now())
            .await?
            .ok_or(PreferencesServiceError::NotFound)?;

        info!(event = "preferences_updated", user_id = %user_id, group = group.as_str());
        Ok(prefs)
    }

    /// Replaces every setting with the defaults for the learner's condition.
    ///
    /// # Errors
    ///
    /// Returns `PreferencesServiceError::UnknownUser` if the learner does not
    /// exist, or `PreferencesServiceError::Storage`.
    pub async fn reset(&self, user_id: UserId) -> Result<Preferences, PreferencesServiceError> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(PreferencesServiceError::UnknownUser)?;
        let defaults = Preferences::new(
            user_id,
            PreferenceSettings::for_condition(user.learning_condition()),
            self.clock.now(),
        );
        let prefs = self.preferences.replace_preferences(&defaults).await?;

        info!(
            event = "preferences_reset",
            user_id = %user_id,
            condition = %user.learning_condition(),
        );
        Ok(prefs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use lingua_core::model::{
        FontFamily, FontSize, LearningCondition, LearningPace, LineHeight, PreferencesError, User,
    };
    use lingua_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn user_id() -> UserId {
        "65a000000000000000000001".parse().unwrap()
    }

    fn service_at(repo: &InMemoryRepository, clock: Clock) -> PreferencesService {
        PreferencesService::new(clock, Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn update_creates_then_patches() {
        let repo = InMemoryRepository::new();
        let service = service_at(&repo, fixed_clock());
        assert!(matches!(
            service.get(user_id()).await,
            Err(PreferencesServiceError::NotFound)
        ));

        let created = service
            .update(
                user_id(),
                &PreferencesPatch {
                    font_size: Some(FontSize::Large),
                    ..PreferencesPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(created.settings.font_size, FontSize::Large);
        assert_eq!(created.settings.session_duration, 20);

        let later = Clock::fixed(fixed_now() + Duration::hours(1));
        let updated = service_at(&repo, later)
            .update(
                user_id(),
                &PreferencesPatch {
                    learning_pace: Some(LearningPace::Slow),
                    ..PreferencesPatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.settings.font_size, FontSize::Large);
        assert_eq!(updated.settings.learning_pace, LearningPace::Slow);
        assert_eq!(updated.created_at, fixed_now());
        assert_eq!(updated.last_modified, fixed_now() + Duration::hours(1));
    }

    #[tokio::test]
    async fn out_of_range_values_write_nothing() {
        let repo = InMemoryRepository::new();
        let service = service_at(&repo, fixed_clock());
        let err = service
            .update(
                user_id(),
                &PreferencesPatch {
                    session_duration: Some(2),
                    ..PreferencesPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PreferencesServiceError::Invalid(PreferencesError::SessionDuration(2))
        ));
        assert!(repo.get_preferences(user_id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn group_update_ignores_foreign_fields() {
        let repo = InMemoryRepository::new();
        let service = service_at(&repo, fixed_clock());

        let patch = PreferencesPatch {
            line_height: Some(LineHeight::Loose),
            font_size: Some(FontSize::Small),
            ..PreferencesPatch::default()
        };
        assert!(matches!(
            service
                .update_group(user_id(), PreferenceGroup::Dyslexia, &patch)
                .await,
            Err(PreferencesServiceError::NotFound)
        ));

        service
            .update(user_id(), &PreferencesPatch::default())
            .await
            .unwrap();
        let prefs = service
            .update_group(user_id(), PreferenceGroup::Dyslexia, &patch)
            .await
            .unwrap();
        assert_eq!(prefs.settings.line_height, LineHeight::Loose);
        assert_eq!(prefs.settings.font_size, FontSize::Medium);

        // Nothing in the patch belongs to the ADHD screen.
        let unchanged = service
            .update_group(user_id(), PreferenceGroup::Adhd, &patch)
            .await
            .unwrap();
        assert_eq!(unchanged, prefs);
    }

    #[tokio::test]
    async fn reset_uses_condition_defaults() {
        let repo = InMemoryRepository::new();
        let service = service_at(&repo, fixed_clock());
        assert!(matches!(
            service.reset(user_id()).await,
            Err(PreferencesServiceError::UnknownUser)
        ));

        let user = User::new(user_id(), "Ari", LearningCondition::Dyslexia, fixed_now()).unwrap();
        repo.upsert_user(&user).await.unwrap();
        service
            .update(
                user_id(),
                &PreferencesPatch {
                    font_family: Some(FontFamily::Arial),
                    font_size: Some(FontSize::Small),
                    ..PreferencesPatch::default()
                },
            )
            .await
            .unwrap();

        let reset = service.reset(user_id()).await.unwrap();
        assert_eq!(reset.settings.font_family, FontFamily::Opendyslexic);
        assert_eq!(reset.settings.font_size, FontSize::Medium);
        assert_eq!(service.get(user_id()).await.unwrap(), reset);
    }
}
