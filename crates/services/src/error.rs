//! Shared error types for the services crate.

use thiserror::Error;

use course_core::model::{EnrollmentError, ProgressError};
use storage::repository::StorageError;

/// Errors emitted by `ProgressService`.
///
/// Callers only ever see these five kinds; `Storage` covers infrastructure failures
/// that are never retried.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    /// Enrollment or chapter missing, or the chapter belongs to another course.
    #[error("not found")]
    NotFound,
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ProgressError),
    /// Compare-and-swap kept losing; the whole request may be retried later.
    #[error("conflict: gave up after {attempts} attempts")]
    Conflict { attempts: u32 },
    #[error("precondition failed: {0}")]
    PreconditionFailed(#[from] EnrollmentError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ProgressServiceError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound,
            other => Self::Storage(other),
        }
    }
}
