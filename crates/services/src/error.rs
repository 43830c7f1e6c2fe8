//! Shared error types for the services crate.

use thiserror::Error;

use mentor_core::model::{CourseError, CourseId};
use mentor_core::session::SessionError;
use storage::repository::StorageError;

/// Errors emitted by the generation client and response parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("content generation is not configured")]
    Disabled,
    #[error("content generation returned an empty response")]
    EmptyResponse,
    #[error("content generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("generated payload failed validation: {0}")]
    Malformed(String),
}

/// Errors emitted by `CourseService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CourseServiceError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `MaterializeService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MaterializeError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Course(#[from] CourseError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionLoopError {
    #[error("course {0} not found")]
    CourseNotFound(CourseId),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
