//! Shared error types for the services crate.

use thiserror::Error;

use lingua_core::model::{LessonError, PreferencesError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `SummaryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SummaryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error(transparent)]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CompletionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionError {
    #[error("lesson key cannot be empty")]
    EmptyKey,
    #[error("user not found")]
    UnknownUser,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LessonService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonServiceError {
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `InteractionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InteractionError {
    #[error("interaction id cannot be empty")]
    EmptyInteractionId,
    #[error("lesson not found")]
    LessonNotFound,
    #[error("interaction not found in lesson")]
    InteractionNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `PreferencesService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PreferencesServiceError {
    #[error(transparent)]
    Invalid(#[from] PreferencesError),
    #[error("preferences not found")]
    NotFound,
    #[error("user not found")]
    UnknownUser,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
