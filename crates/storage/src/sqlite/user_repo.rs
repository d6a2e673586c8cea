use chrono::{DateTime, Utc};
use lingua_core::model::{LegacyCompletionMeta, LegacyCompletions, User, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, map_user_row, ser};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn upsert_user(&self, user: &User) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, learning_condition, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                learning_condition = excluded.learning_condition
            ",
        )
        .bind(user.id().to_string())
        .bind(user.name())
        .bind(user.learning_condition().as_str())
        .bind(user.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, learning_condition, created_at
            FROM users WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn legacy_completions(
        &self,
        user_id: UserId,
    ) -> Result<LegacyCompletions, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT lesson_key, completed_at
            FROM user_completed_lessons
            WHERE user_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut legacy = LegacyCompletions::empty();
        for row in rows {
            let key: String = row.try_get("lesson_key").map_err(ser)?;
            let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;
            legacy.keys.push(key.clone());
            legacy.meta.push(LegacyCompletionMeta { key, completed_at });
        }
        Ok(legacy)
    }

    async fn append_legacy_completion(
        &self,
        user_id: UserId,
        key: &str,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<LegacyCompletions, StorageError> {
        if self.get_user(user_id).await?.is_none() {
            return Err(StorageError::NotFound);
        }

        sqlx::query(
            r"
            INSERT INTO user_completed_lessons (user_id, lesson_key, position, completed_at)
            SELECT ?1, ?2, COALESCE(MAX(position) + 1, 0), ?3
            FROM user_completed_lessons
            WHERE user_id = ?1
            ON CONFLICT(user_id, lesson_key) DO NOTHING
            ",
        )
        .bind(user_id.to_string())
        .bind(key)
        .bind(completed_at)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        self.legacy_completions(user_id).await
    }
}
