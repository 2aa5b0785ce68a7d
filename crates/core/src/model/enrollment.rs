use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{CourseId, EnrollmentId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EnrollmentError {
    #[error("enrollment {0} is completed and cannot be dropped")]
    AlreadyCompleted(EnrollmentId),

    #[error("enrollment {0} has been dropped")]
    Dropped(EnrollmentId),

    #[error("unknown enrollment status: {0}")]
    UnknownStatus(String),

    #[error("invalid persisted enrollment: {0}")]
    InvalidPersistedState(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of an enrollment.
///
/// `Completed` is terminal. `Dropped` is only reachable from `NotStarted` or `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnrollmentStatus {
    NotStarted,
    InProgress,
    Completed,
    Dropped,
}

impl EnrollmentStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EnrollmentStatus::NotStarted => "not-started",
            EnrollmentStatus::InProgress => "in-progress",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Dropped => "dropped",
        }
    }

    /// # Errors
    ///
    /// Returns `EnrollmentError::UnknownStatus` for values not produced by `as_str`.
    pub fn parse(raw: &str) -> Result<Self, EnrollmentError> {
        match raw {
            "not-started" => Ok(EnrollmentStatus::NotStarted),
            "in-progress" => Ok(EnrollmentStatus::InProgress),
            "completed" => Ok(EnrollmentStatus::Completed),
            "dropped" => Ok(EnrollmentStatus::Dropped),
            other => Err(EnrollmentError::UnknownStatus(other.to_owned())),
        }
    }
}

//
// ─── ENROLLMENT ────────────────────────────────────────────────────────────────
//

/// A learner's enrollment in a course, the aggregate root the status manager mutates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    id: EnrollmentId,
    course_id: CourseId,
    status: EnrollmentStatus,
    progress_percentage: u8,
    enrolled_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl Enrollment {
    #[must_use]
    pub fn new(id: EnrollmentId, course_id: CourseId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            id,
            course_id,
            status: EnrollmentStatus::NotStarted,
            progress_percentage: 0,
            enrolled_at,
            completed_at: None,
            version: 0,
        }
    }

    /// Rehydrate an enrollment from storage.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::InvalidPersistedState` when the percentage exceeds 100 or
    /// `completed_at` disagrees with the status.
    pub fn from_persisted(
        id: EnrollmentId,
        course_id: CourseId,
        status: EnrollmentStatus,
        progress_percentage: u8,
        enrolled_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
        version: u64,
    ) -> Result<Self, EnrollmentError> {
        if progress_percentage > 100 {
            let detail = format!("progress percentage {progress_percentage} exceeds 100");
            return Err(EnrollmentError::InvalidPersistedState(detail));
        }
        if (status == EnrollmentStatus::Completed) != completed_at.is_some() {
            let detail = "completed_at must be set exactly when status is completed";
            return Err(EnrollmentError::InvalidPersistedState(detail.into()));
        }

        Ok(Self {
            id,
            course_id,
            status,
            progress_percentage,
            enrolled_at,
            completed_at,
            version,
        })
    }

    #[must_use]
    pub fn id(&self) -> EnrollmentId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn status(&self) -> EnrollmentStatus {
        self.status
    }

    #[must_use]
    pub fn progress_percentage(&self) -> u8 {
        self.progress_percentage
    }

    #[must_use]
    pub fn enrolled_at(&self) -> DateTime<Utc> {
        self.enrolled_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Rejects engagement on an enrollment that is no longer active.
    ///
    /// # Errors
    ///
    /// Returns `EnrollmentError::Dropped` for dropped enrollments.
    pub fn ensure_accepts_events(&self) -> Result<(), EnrollmentError> {
        if self.status == EnrollmentStatus::Dropped {
            return Err(EnrollmentError::Dropped(self.id));
        }
        Ok(())
    }

    pub(crate) fn set_status(&mut self, status: EnrollmentStatus) {
        self.status = status;
    }

    pub(crate) fn set_progress_percentage(&mut self, percentage: u8) {
        self.progress_percentage = percentage.min(100);
    }

    pub(crate) fn set_completed_at(&mut self, at: DateTime<Utc>) {
        self.completed_at = Some(at);
    }

    pub(crate) fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn status_names_round_trip() {
        for status in [
            EnrollmentStatus::NotStarted,
            EnrollmentStatus::InProgress,
            EnrollmentStatus::Completed,
            EnrollmentStatus::Dropped,
        ] {
            assert_eq!(EnrollmentStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(EnrollmentStatus::parse("paused").is_err());
    }

    #[test]
    fn persisted_completion_needs_timestamp() {
        let err = Enrollment::from_persisted(
            EnrollmentId::new(1),
            CourseId::new(1),
            EnrollmentStatus::Completed,
            100,
            fixed_now(),
            None,
            2,
        )
        .unwrap_err();
        assert!(matches!(err, EnrollmentError::InvalidPersistedState(_)));
    }

    #[test]
    fn dropped_enrollment_refuses_events() {
        let enrollment = Enrollment::from_persisted(
            EnrollmentId::new(9),
            CourseId::new(1),
            EnrollmentStatus::Dropped,
            40,
            fixed_now(),
            None,
            5,
        )
        .unwrap();
        assert_eq!(
            enrollment.ensure_accepts_events(),
            Err(EnrollmentError::Dropped(EnrollmentId::new(9)))
        );
    }
}
