use lingua_core::model::{Lesson, LessonId, LessonSection, SectionId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, lesson_id_from_str, map_lesson_row, map_section_row, section_id_from_str, ser,
};
use crate::repository::{LessonCatalog, StorageError, check_sections};

#[async_trait::async_trait]
impl LessonCatalog for SqliteRepository {
    async fn count_all(&self) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lessons")
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;
        u64::try_from(count)
            .map_err(|_| StorageError::Serialization(format!("invalid count: {count}")))
    }

    async fn find_titles_by_ids(
        &self,
        ids: &[LessonId],
    ) -> Result<Vec<(LessonId, String)>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = String::from("SELECT id, title FROM lessons WHERE id IN (");
        for i in 0..ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push(')');

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }

        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let id = lesson_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?;
            out.push((id, row.try_get::<String, _>("title").map_err(ser)?));
        }
        Ok(out)
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, text_content, interactions, created_at
            FROM lessons WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn save_lesson(
        &self,
        lesson: &Lesson,
        sections: &[LessonSection],
    ) -> Result<(), StorageError> {
        check_sections(lesson, sections)?;
        let interactions = serde_json::to_string(lesson.interactions()).map_err(ser)?;

        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query(
            r"
            INSERT INTO lessons (id, title, text_content, interactions, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                text_content = excluded.text_content,
                interactions = excluded.interactions
            ",
        )
        .bind(lesson.id().to_string())
        .bind(lesson.title())
        .bind(lesson.text_content())
        .bind(interactions)
        .bind(lesson.created_at())
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        sqlx::query("DELETE FROM lesson_sections WHERE lesson_id = ?1")
            .bind(lesson.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for section in sections {
            sqlx::query(
                r"
                INSERT INTO lesson_sections (id, lesson_id, position, title)
                VALUES (?1, ?2, ?3, ?4)
                ",
            )
            .bind(section.id().to_string())
            .bind(section.lesson_id().to_string())
            .bind(i64::from(section.order()))
            .bind(section.title())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)?;
        Ok(())
    }

    async fn list_sections(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonSection>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, position, title
            FROM lesson_sections
            WHERE lesson_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(lesson_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_section_row).collect()
    }

    async fn first_section_id(
        &self,
        lesson_id: LessonId,
    ) -> Result<Option<SectionId>, StorageError> {
        let id: Option<String> = sqlx::query_scalar(
            r"
            SELECT id FROM lesson_sections
            WHERE lesson_id = ?1
            ORDER BY position ASC, id ASC
            LIMIT 1
            ",
        )
        .bind(lesson_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        id.as_deref().map(section_id_from_str).transpose()
    }
}
