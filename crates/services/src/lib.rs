#![forbid(unsafe_code)]

pub mod app_services;
pub mod completion_service;
pub mod error;
pub mod interaction_service;
pub mod lesson_service;
pub mod preferences_service;
pub mod progress_service;
pub mod summary_service;

pub use lingua_core::Clock;

pub use app_services::AppServices;
pub use completion_service::CompletionService;
pub use error::{
    AppServicesError, CompletionError, InteractionError, LessonServiceError,
    PreferencesServiceError, ProgressError, SummaryError,
};
pub use interaction_service::{InteractionService, SubmittedAnswer};
pub use lesson_service::LessonService;
pub use preferences_service::PreferencesService;
pub use progress_service::{ProgressService, ProgressUpdate};
pub use summary_service::SummaryService;
