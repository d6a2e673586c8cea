use chrono::{DateTime, Utc};
use lingua_core::model::{
    Interaction, InteractionRecord, LearningCondition, Lesson, LessonId, LessonSection,
    PreferenceSettings, Preferences, PreferencesPatch, ProgressRecord, SectionId, User, UserId,
};
use serde_json::{Map, Value};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn lesson_id_from_str(v: &str) -> Result<LessonId, StorageError> {
    v.parse().map_err(ser)
}

pub(crate) fn user_id_from_str(v: &str) -> Result<UserId, StorageError> {
    v.parse().map_err(ser)
}

pub(crate) fn section_id_from_str(v: &str) -> Result<SectionId, StorageError> {
    v.parse().map_err(ser)
}

pub(crate) fn sections_to_json(sections: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(sections).map_err(ser)
}

pub(crate) fn states_to_json(states: &Map<String, Value>) -> Result<String, StorageError> {
    serde_json::to_string(states).map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let user_id = user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let lesson_id = lesson_id_from_str(&row.try_get::<String, _>("lesson_id").map_err(ser)?)?;

    let completed_sections: Vec<String> =
        serde_json::from_str(&row.try_get::<String, _>("completed_sections").map_err(ser)?)
            .map_err(ser)?;

    // Anything other than a JSON object is stored garbage; treat it as empty.
    let raw_states: String = row.try_get("interaction_states").map_err(ser)?;
    let interaction_states = match serde_json::from_str::<Value>(&raw_states).map_err(ser)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let completed = row.try_get::<i64, _>("completed").map_err(ser)? != 0;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;

    Ok(ProgressRecord {
        user_id,
        lesson_id,
        current_section_id: row.try_get("current_section_id").map_err(ser)?,
        completed_sections,
        interaction_states,
        completed,
        completed_at,
        last_accessed_at: row.try_get("last_accessed_at").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    let interactions: Vec<Interaction> =
        serde_json::from_str(&row.try_get::<String, _>("interactions").map_err(ser)?)
            .map_err(ser)?;
    Lesson::new(
        lesson_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get::<String, _>("text_content").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .and_then(|lesson| lesson.with_interactions(interactions))
    .map_err(ser)
}

pub(crate) fn map_section_row(row: &SqliteRow) -> Result<LessonSection, StorageError> {
    let order = u32::try_from(row.try_get::<i64, _>("position").map_err(ser)?).map_err(ser)?;
    LessonSection::new(
        section_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?,
        lesson_id_from_str(&row.try_get::<String, _>("lesson_id").map_err(ser)?)?,
        order,
        row.try_get::<String, _>("title").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_interaction_row(row: &SqliteRow) -> Result<InteractionRecord, StorageError> {
    let attempts = u32::try_from(row.try_get::<i64, _>("attempts").map_err(ser)?).map_err(ser)?;
    Ok(InteractionRecord {
        user_id: user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        lesson_id: lesson_id_from_str(&row.try_get::<String, _>("lesson_id").map_err(ser)?)?,
        interaction_id: row.try_get("interaction_id").map_err(ser)?,
        attempts,
        last_answer: serde_json::from_str(&row.try_get::<String, _>("last_answer").map_err(ser)?)
            .map_err(ser)?,
        is_correct: row.try_get::<i64, _>("is_correct").map_err(ser)? != 0,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

pub(crate) fn map_preferences_row(row: &SqliteRow) -> Result<Preferences, StorageError> {
    let settings: PreferenceSettings =
        serde_json::from_str(&row.try_get::<String, _>("settings").map_err(ser)?).map_err(ser)?;
    Ok(Preferences {
        user_id: user_id_from_str(&row.try_get::<String, _>("user_id").map_err(ser)?)?,
        settings,
        last_modified: row.try_get("last_modified").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        updated_at: row.try_get("updated_at").map_err(ser)?,
    })
}

/// Only the fields the patch sets; `null` would delete keys under `json_patch`.
pub(crate) fn patch_to_json(patch: &PreferencesPatch) -> Result<String, StorageError> {
    let mut value = serde_json::to_value(patch).map_err(ser)?;
    if let Value::Object(map) = &mut value {
        map.retain(|_, v| !v.is_null());
    }
    serde_json::to_string(&value).map_err(ser)
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<User, StorageError> {
    let condition: LearningCondition = row
        .try_get::<String, _>("learning_condition")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    User::new(
        user_id_from_str(&row.try_get::<String, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("name").map_err(ser)?,
        condition,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
