#![forbid(unsafe_code)]

pub mod auth;
pub mod error;
pub mod routes;
pub mod seed;

pub use auth::{CurrentUser, USER_ID_HEADER};
pub use error::ApiError;
pub use routes::build_router;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "server=info,services=info,tower_http=info";
