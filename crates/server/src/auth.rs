use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use lingua_core::model::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated learner id, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The learner making the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub UserId);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        raw.trim()
            .parse()
            .map(CurrentUser)
            .map_err(|_| ApiError::Unauthorized)
    }
}
