use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use lingua_core::model::{
    LessonId, PreferenceGroup, Preferences, PreferencesPatch, ProgressRecord, Summary, UserId,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};
use services::{AppServices, ProgressUpdate};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::CurrentUser;
use crate::error::ApiError;

/// Build the HTTP API over the given services.
pub fn build_router(services: AppServices) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/health", get(api_health))
        .route("/api/lessons/:id", get(get_lesson))
        .route("/api/lessons/:id/sections", get(list_sections))
        .route("/api/interactions/submit", post(submit_interaction))
        .route("/api/progress/summary", get(get_summary))
        .route("/api/progress/update", post(update_progress))
        .route("/api/progress/complete", post(complete_progress))
        .route("/api/progress/:lesson_id", get(get_progress))
        .route("/api/users/complete-lesson", post(complete_lesson_key))
        .route("/api/users/completed-lessons", get(completed_lesson_keys))
        .route("/api/preferences", get(get_preferences).put(put_preferences))
        .route("/api/preferences/accessibility", patch(patch_accessibility))
        .route("/api/preferences/dyslexia", patch(patch_dyslexia))
        .route("/api/preferences/adhd", patch(patch_adhd))
        .route("/api/preferences/autism", patch(patch_autism))
        .route("/api/preferences/reset", delete(reset_preferences))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(services)
}

fn parse_lesson_id(raw: Option<&str>) -> Result<LessonId, ApiError> {
    raw.and_then(|s| s.parse().ok())
        .ok_or_else(|| ApiError::bad_request("Valid lessonId is required"))
}

fn parse_path_lesson_id(raw: &str) -> Result<LessonId, ApiError> {
    raw.parse().map_err(|_| ApiError::bad_request("Invalid lesson ID"))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "Server is running" }))
}

async fn api_health() -> Json<Value> {
    Json(json!({ "status": "OK", "message": "API is running" }))
}

async fn get_lesson(
    State(services): State<AppServices>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_path_lesson_id(&id)?;
    let lesson = services
        .lessons()
        .get_lesson(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Lesson not found"))?;
    Ok(Json(json!({ "success": true, "lesson": lesson })))
}

async fn list_sections(
    State(services): State<AppServices>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let id = parse_path_lesson_id(&id)?;
    let sections = services.lessons().list_sections(id).await?;
    Ok(Json(json!({
        "success": true,
        "count": sections.len(),
        "sections": sections,
    })))
}

/// Keeps an explicit `null` distinct from a missing field.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitAnswerBody {
    lesson_id: Option<String>,
    #[serde(default)]
    interaction_id: String,
    #[serde(default, deserialize_with = "present")]
    selected_answer: Option<Value>,
}

async fn submit_interaction(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<SubmitAnswerBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let lesson_id = parse_lesson_id(body.lesson_id.as_deref())?;
    let answer = body
        .selected_answer
        .ok_or_else(|| ApiError::bad_request("selectedAnswer is required"))?;
    let submitted = services
        .interactions()
        .submit_answer(user_id, lesson_id, &body.interaction_id, &answer)
        .await?;
    Ok(Json(json!({
        "success": true,
        "isCorrect": submitted.is_correct,
        "feedback": submitted.feedback,
        "attempts": submitted.attempts,
    })))
}

#[derive(Serialize)]
struct SummaryResponse {
    success: bool,
    #[serde(flatten)]
    summary: Summary,
}

async fn get_summary(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SummaryResponse>, ApiError> {
    let summary = services.summaries().get_summary(user_id).await?;
    Ok(Json(SummaryResponse {
        success: true,
        summary,
    }))
}

#[derive(Serialize)]
struct ProgressResponse {
    success: bool,
    progress: Option<ProgressRecord>,
}

async fn get_progress(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    Path(lesson_id): Path<String>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let lesson_id = parse_path_lesson_id(&lesson_id)?;
    let progress = services.progress().get_progress(user_id, lesson_id).await?;
    Ok(Json(ProgressResponse {
        success: true,
        progress: Some(progress),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProgressBody {
    lesson_id: Option<String>,
    current_section_id: Option<String>,
    completed_sections: Option<Vec<String>>,
    interaction_states: Option<Value>,
    #[serde(default)]
    is_replay: bool,
}

impl UpdateProgressBody {
    fn into_update(self) -> Result<ProgressUpdate, ApiError> {
        let lesson_id = parse_lesson_id(self.lesson_id.as_deref())?;
        let interaction_states = match self.interaction_states {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => return Err(ApiError::bad_request("interactionStates must be an object")),
        };
        Ok(ProgressUpdate {
            lesson_id,
            current_section_id: self.current_section_id,
            completed_sections: self.completed_sections,
            interaction_states,
            is_replay: self.is_replay,
        })
    }
}

async fn update_progress(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<UpdateProgressBody>, JsonRejection>,
) -> Result<Json<ProgressResponse>, ApiError> {
    let Json(body) = payload?;
    let update = body.into_update()?;
    let progress = services.progress().update_progress(user_id, &update).await?;
    Ok(Json(ProgressResponse {
        success: true,
        progress,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteProgressBody {
    lesson_id: Option<String>,
}

async fn complete_progress(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<CompleteProgressBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let lesson_id = parse_lesson_id(body.lesson_id.as_deref())?;
    let summary = services.progress().mark_complete(user_id, lesson_id).await?;
    Ok(Json(json!({ "success": true, "summary": summary })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompleteLessonBody {
    #[serde(default)]
    lesson_key: String,
}

async fn complete_lesson_key(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<CompleteLessonBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let keys = services
        .completions()
        .complete_lesson_key(user_id, &body.lesson_key)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Lesson marked as completed",
        "completedLessons": keys,
    })))
}

async fn completed_lesson_keys(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let keys = services.completions().completed_lesson_keys(user_id).await?;
    Ok(Json(json!({ "success": true, "completedLessons": keys })))
}

fn preferences_saved(message: &str, preferences: &Preferences) -> Json<Value> {
    Json(json!({ "success": true, "message": message, "preferences": preferences }))
}

async fn get_preferences(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let preferences = services.preferences().get(user_id).await?;
    Ok(Json(json!({ "success": true, "preferences": preferences })))
}

async fn put_preferences(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<PreferencesPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(patch) = payload?;
    let preferences = services.preferences().update(user_id, &patch).await?;
    Ok(preferences_saved("Preferences updated successfully", &preferences))
}

async fn update_group(
    services: &AppServices,
    user_id: UserId,
    group: PreferenceGroup,
    payload: Result<Json<PreferencesPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(patch) = payload?;
    let preferences = services
        .preferences()
        .update_group(user_id, group, &patch)
        .await?;
    let message = match group {
        PreferenceGroup::Accessibility => "Accessibility settings updated",
        PreferenceGroup::Dyslexia => "Dyslexia settings updated",
        PreferenceGroup::Adhd => "ADHD settings updated",
        PreferenceGroup::Autism => "Autism settings updated",
    };
    Ok(preferences_saved(message, &preferences))
}

async fn patch_accessibility(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<PreferencesPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    update_group(&services, user_id, PreferenceGroup::Accessibility, payload).await
}

async fn patch_dyslexia(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<PreferencesPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    update_group(&services, user_id, PreferenceGroup::Dyslexia, payload).await
}

async fn patch_adhd(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<PreferencesPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    update_group(&services, user_id, PreferenceGroup::Adhd, payload).await
}

async fn patch_autism(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
    payload: Result<Json<PreferencesPatch>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    update_group(&services, user_id, PreferenceGroup::Autism, payload).await
}

async fn reset_preferences(
    State(services): State<AppServices>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Value>, ApiError> {
    let preferences = services.preferences().reset(user_id).await?;
    Ok(preferences_saved("Preferences reset to defaults", &preferences))
}
