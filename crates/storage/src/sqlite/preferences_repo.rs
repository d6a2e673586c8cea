use chrono::{DateTime, Utc};
use lingua_core::model::{Preferences, PreferencesPatch, UserId};

use super::SqliteRepository;
use super::mapping::{conn, map_preferences_row, patch_to_json, ser};
use crate::repository::{PreferencesRepository, StorageError};

const PREFERENCES_COLUMNS: &str = "user_id, settings, last_modified, created_at, updated_at";

#[async_trait::async_trait]
impl PreferencesRepository for SqliteRepository {
    async fn get_preferences(
        &self,
        user_id: UserId,
    ) -> Result<Option<Preferences>, StorageError> {
        let sql = format!("SELECT {PREFERENCES_COLUMNS} FROM preferences WHERE user_id = ?1");
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_preferences_row).transpose()
    }

    async fn ensure_preferences(&self, defaults: &Preferences) -> Result<(), StorageError> {
        let settings = serde_json::to_string(&defaults.settings).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO preferences (user_id, settings, last_modified, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(user_id) DO NOTHING
            ",
        )
        .bind(defaults.user_id.to_string())
        .bind(settings)
        .bind(defaults.last_modified)
        .bind(defaults.created_at)
        .bind(defaults.updated_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn patch_preferences(
        &self,
        user_id: UserId,
        patch: &PreferencesPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Preferences>, StorageError> {
        let sql = format!(
            "UPDATE preferences
             SET settings = json_patch(settings, ?2), last_modified = ?3, updated_at = ?3
             WHERE user_id = ?1
             RETURNING {PREFERENCES_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(patch_to_json(patch)?)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_preferences_row).transpose()
    }

    async fn replace_preferences(
        &self,
        preferences: &Preferences,
    ) -> Result<Preferences, StorageError> {
        let settings = serde_json::to_string(&preferences.settings).map_err(ser)?;
        let sql = format!(
            "INSERT INTO preferences (user_id, settings, last_modified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id) DO UPDATE SET
                 settings = excluded.settings,
                 last_modified = excluded.last_modified,
                 updated_at = excluded.updated_at
             RETURNING {PREFERENCES_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(preferences.user_id.to_string())
            .bind(settings)
            .bind(preferences.last_modified)
            .bind(preferences.created_at)
            .bind(preferences.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;

        map_preferences_row(&row)
    }
}
