use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs versioned migrations, recording each in `schema_migrations`.
///
/// Version 1 creates the catalog, users and legacy keys. Version 2 adds the
/// structured progress table. Version 3 adds lesson interactions, per-learner
/// answers and accessibility preferences.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lessons (
                    id TEXT PRIMARY KEY CHECK (length(id) = 24),
                    title TEXT NOT NULL CHECK (length(title) > 0),
                    text_content TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_sections (
                    id TEXT PRIMARY KEY CHECK (length(id) = 24),
                    lesson_id TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    title TEXT NOT NULL,
                    FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS users (
                    id TEXT PRIMARY KEY CHECK (length(id) = 24),
                    name TEXT NOT NULL,
                    learning_condition TEXT NOT NULL
                        CHECK (learning_condition IN ('dyslexia', 'adhd', 'autism', 'none')),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_completed_lessons (
                    user_id TEXT NOT NULL,
                    lesson_key TEXT NOT NULL,
                    position INTEGER NOT NULL CHECK (position >= 0),
                    completed_at TEXT,
                    PRIMARY KEY (user_id, lesson_key),
                    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_lesson_sections_lesson_position
                    ON lesson_sections (lesson_id, position, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_user_completed_lessons_position
                    ON user_completed_lessons (user_id, position);
            ",
        )
        .execute(&mut *tx)
        .await?;

        record_version(&mut tx, 1).await?;
        tx.commit().await?;
    }

    // Progress rows reference lessons by id without a foreign key: a lesson
    // may be deleted while completion history stays.
    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_progress (
                    user_id TEXT NOT NULL,
                    lesson_id TEXT NOT NULL CHECK (length(lesson_id) = 24),
                    current_section_id TEXT NOT NULL DEFAULT '',
                    completed_sections TEXT NOT NULL DEFAULT '[]',
                    interaction_states TEXT NOT NULL DEFAULT '{}',
                    completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
                    completed_at TEXT,
                    last_accessed_at TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, lesson_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_user_progress_user_completed
                    ON user_progress (user_id, completed, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        record_version(&mut tx, 2).await?;
        tx.commit().await?;
    }

    if !is_applied(pool, 3).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                ALTER TABLE lessons ADD COLUMN interactions TEXT NOT NULL DEFAULT '[]';
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS user_interactions (
                    user_id TEXT NOT NULL,
                    lesson_id TEXT NOT NULL CHECK (length(lesson_id) = 24),
                    interaction_id TEXT NOT NULL CHECK (length(interaction_id) > 0),
                    attempts INTEGER NOT NULL CHECK (attempts > 0),
                    last_answer TEXT NOT NULL,
                    is_correct INTEGER NOT NULL CHECK (is_correct IN (0, 1)),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, lesson_id, interaction_id)
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // Settings are one JSON object so partial updates can use json_patch.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS preferences (
                    user_id TEXT PRIMARY KEY CHECK (length(user_id) = 24),
                    settings TEXT NOT NULL CHECK (json_type(settings) = 'object'),
                    last_modified TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        record_version(&mut tx, 3).await?;
        tx.commit().await?;
    }

    Ok(())
}

async fn record_version(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(version)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}
