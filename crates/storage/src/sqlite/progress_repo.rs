use chrono::{DateTime, Utc};
use lingua_core::model::{LessonId, ProgressPatch, ProgressRecord, UserId, dedup_sections};

use super::SqliteRepository;
use super::mapping::{conn, map_progress_row, sections_to_json, states_to_json};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = r"
    user_id, lesson_id, current_section_id, completed_sections, interaction_states,
    completed, completed_at, last_accessed_at, created_at, updated_at
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn completed_progress(
        &self,
        user_id: UserId,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress
             WHERE user_id = ?1 AND completed = 1
             ORDER BY created_at ASC, lesson_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn get_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = ?1 AND lesson_id = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(lesson_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn ensure_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        first_section_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError> {
        // The primary key decides the race; losers fall through to the read.
        sqlx::query(
            r"
            INSERT INTO user_progress (
                user_id, lesson_id, current_section_id, last_accessed_at, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?4, ?4)
            ON CONFLICT(user_id, lesson_id) DO NOTHING
            ",
        )
        .bind(user_id.to_string())
        .bind(lesson_id.to_string())
        .bind(first_section_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        self.get_progress(user_id, lesson_id)
            .await?
            .ok_or(StorageError::NotFound)
    }

    async fn upsert_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        patch: &ProgressPatch,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, StorageError> {
        let sections = patch
            .completed_sections
            .as_deref()
            .map(|s| sections_to_json(&dedup_sections(s)))
            .transpose()?;
        let states = patch
            .interaction_states
            .as_ref()
            .map(states_to_json)
            .transpose()?;
        let mark_completed = i64::from(patch.mark_completed);

        let sql = format!(
            r"
            INSERT INTO user_progress (
                user_id, lesson_id, current_section_id, completed_sections, interaction_states,
                completed, completed_at, last_accessed_at, created_at, updated_at
            )
            VALUES (
                ?1, ?2, COALESCE(?3, ''), COALESCE(?4, '[]'), COALESCE(?5, '{{}}'),
                ?6, CASE WHEN ?6 = 1 THEN ?7 ELSE NULL END, ?7, ?7, ?7
            )
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                current_section_id = COALESCE(?3, user_progress.current_section_id),
                completed_sections = COALESCE(?4, user_progress.completed_sections),
                interaction_states = COALESCE(?5, user_progress.interaction_states),
                completed = CASE WHEN ?6 = 1 THEN 1 ELSE user_progress.completed END,
                completed_at = CASE
                    WHEN ?6 = 1 THEN COALESCE(user_progress.completed_at, ?7)
                    ELSE user_progress.completed_at
                END,
                last_accessed_at = ?7,
                updated_at = ?7
            RETURNING {PROGRESS_COLUMNS}
            "
        );

        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(lesson_id.to_string())
            .bind(patch.current_section_id.as_deref())
            .bind(sections)
            .bind(states)
            .bind(mark_completed)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;

        map_progress_row(&row)
    }
}
