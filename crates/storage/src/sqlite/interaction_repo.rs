use chrono::{DateTime, Utc};
use lingua_core::model::{InteractionRecord, LessonId, UserId};
use serde_json::Value;

use super::SqliteRepository;
use super::mapping::{conn, map_interaction_row, ser};
use crate::repository::{InteractionRepository, StorageError};

#[async_trait::async_trait]
impl InteractionRepository for SqliteRepository {
    async fn record_answer(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        interaction_id: &str,
        answer: &Value,
        is_correct: bool,
        now: DateTime<Utc>,
    ) -> Result<InteractionRecord, StorageError> {
        let answer = serde_json::to_string(answer).map_err(ser)?;
        let row = sqlx::query(
            r"
            INSERT INTO user_interactions (
                user_id, lesson_id, interaction_id, attempts, last_answer, is_correct,
                created_at, updated_at
            )
            VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, ?6)
            ON CONFLICT(user_id, lesson_id, interaction_id) DO UPDATE SET
                attempts = attempts + 1,
                last_answer = excluded.last_answer,
                is_correct = excluded.is_correct,
                updated_at = excluded.updated_at
            RETURNING user_id, lesson_id, interaction_id, attempts, last_answer, is_correct,
                      created_at, updated_at
            ",
        )
        .bind(user_id.to_string())
        .bind(lesson_id.to_string())
        .bind(interaction_id)
        .bind(answer)
        .bind(i64::from(is_correct))
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        map_interaction_row(&row)
    }
}
