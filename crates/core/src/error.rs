use thiserror::Error;

use crate::model::{ChapterError, EnrollmentError, ProgressError};

/// Any domain error raised by this crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Chapter(#[from] ChapterError),
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Enrollment(#[from] EnrollmentError),
}
