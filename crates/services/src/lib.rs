#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod progress_service;

pub use course_core::Clock;

pub use config::ProgressServiceConfig;
pub use error::ProgressServiceError;
pub use progress_service::{ChapterUpdate, DropOutcome, ProgressReport, ProgressService};
