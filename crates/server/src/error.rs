use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use services::{
    CompletionError, InteractionError, LessonServiceError, PreferencesServiceError, ProgressError,
    SummaryError,
};
use thiserror::Error;
use tracing::error;

/// Failure of a request handler, rendered as `{success: false, message}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Not authorized")]
    Unauthorized,

    #[error("{0}")]
    NotFound(String),

    /// Details are logged; clients only see a generic message.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::Internal(detail) => {
                error!(event = "request_failed", error = %detail);
                "Server error".to_owned()
            }
            other => other.to_string(),
        };
        let body = json!({ "success": false, "message": message });
        (self.status(), Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<ProgressError> for ApiError {
    fn from(err: ProgressError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<LessonServiceError> for ApiError {
    fn from(err: LessonServiceError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<CompletionError> for ApiError {
    fn from(err: CompletionError) -> Self {
        match err {
            CompletionError::EmptyKey => Self::bad_request("Lesson key is required"),
            CompletionError::UnknownUser => Self::not_found("User not found"),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<InteractionError> for ApiError {
    fn from(err: InteractionError) -> Self {
        match err {
            InteractionError::EmptyInteractionId => {
                Self::bad_request("interactionId is required")
            }
            InteractionError::LessonNotFound => Self::not_found("Lesson not found"),
            InteractionError::InteractionNotFound => {
                Self::not_found("Interaction not found in lesson")
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PreferencesServiceError> for ApiError {
    fn from(err: PreferencesServiceError) -> Self {
        match err {
            PreferencesServiceError::Invalid(invalid) => Self::bad_request(invalid.to_string()),
            PreferencesServiceError::NotFound => Self::not_found("Preferences not found"),
            PreferencesServiceError::UnknownUser => Self::not_found("User not found"),
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::to_bytes;
    use lingua_core::model::PreferencesError;
    use serde_json::Value;

    #[test]
    fn completion_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError::from(CompletionError::EmptyKey).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(CompletionError::UnknownUser).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn lookup_errors_map_to_client_statuses() {
        assert_eq!(
            ApiError::from(InteractionError::InteractionNotFound).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(InteractionError::EmptyInteractionId).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PreferencesServiceError::Invalid(
                PreferencesError::SessionDuration(90)
            ))
            .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PreferencesServiceError::NotFound).status(),
            StatusCode::NOT_FOUND
        );
    }

    #[tokio::test]
    async fn internal_details_are_not_rendered() {
        let response = ApiError::Internal("disk I/O error".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(!String::from_utf8_lossy(&bytes).contains("disk I/O"));
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "success": false, "message": "Server error" }));
    }
}
