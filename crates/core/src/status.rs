//! Enrollment lifecycle transitions.
//!
//! ```text
//! not-started ──activity──▶ in-progress ──percentage hits 100──▶ completed
//!      │                         │
//!      └────── explicit drop ────┴──▶ dropped
//! ```
//!
//! `completed` and `dropped` are never left. Recomputing with the same summary is a no-op.

use crate::model::{Enrollment, EnrollmentError, EnrollmentProgressSummary, EnrollmentStatus};
use chrono::{DateTime, Utc};

/// Apply a freshly computed summary to an enrollment.
///
/// Returns the next enrollment; its `version` is bumped only when something changed.
#[must_use]
pub fn reconcile(
    current: &Enrollment,
    summary: &EnrollmentProgressSummary,
    now: DateTime<Utc>,
) -> Enrollment {
    let mut next = current.clone();

    match current.status() {
        EnrollmentStatus::Dropped => return next,
        EnrollmentStatus::Completed => {
            next.set_progress_percentage(summary.percentage);
        }
        EnrollmentStatus::NotStarted | EnrollmentStatus::InProgress => {
            next.set_progress_percentage(summary.percentage);
            if summary.reaches_completion() {
                next.set_status(EnrollmentStatus::Completed);
                next.set_completed_at(now);
            } else if current.status() == EnrollmentStatus::NotStarted
                && (summary.completed_chapters > 0 || summary.has_activity)
            {
                next.set_status(EnrollmentStatus::InProgress);
            }
        }
    }

    if next != *current {
        next.bump_version();
    }
    next
}

/// Explicitly drop an enrollment. Dropping twice is a no-op.
///
/// # Errors
///
/// Returns `EnrollmentError::AlreadyCompleted` for completed enrollments.
pub fn drop_enrollment(current: &Enrollment) -> Result<Enrollment, EnrollmentError> {
    match current.status() {
        EnrollmentStatus::Completed => Err(EnrollmentError::AlreadyCompleted(current.id())),
        EnrollmentStatus::Dropped => Ok(current.clone()),
        EnrollmentStatus::NotStarted | EnrollmentStatus::InProgress => {
            let mut next = current.clone();
            next.set_status(EnrollmentStatus::Dropped);
            next.bump_version();
            Ok(next)
        }
    }
}
