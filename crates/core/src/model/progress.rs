use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::chapter::ContentType;
use crate::model::ids::{ChapterId, EnrollmentId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("time spent delta must be non-negative, got {minutes}")]
    NegativeTimeDelta { minutes: i64 },

    #[error("time spent would overflow")]
    TimeOverflow,

    #[error("{event} does not apply to a {content_type} chapter")]
    ContentTypeMismatch {
        event: &'static str,
        content_type: &'static str,
    },

    #[error("invalid persisted progress: {0}")]
    InvalidPersistedState(String),
}

//
// ─── EVENTS ────────────────────────────────────────────────────────────────────
//

/// A single learner engagement signal for one chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressEvent {
    MarkVideoWatched,
    MarkPdfViewed,
    MarkResourceOpened,
    MarkCompleted,
    AddTimeSpent(i64),
}

impl ProgressEvent {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ProgressEvent::MarkVideoWatched => "markVideoWatched",
            ProgressEvent::MarkPdfViewed => "markPdfViewed",
            ProgressEvent::MarkResourceOpened => "markResourceOpened",
            ProgressEvent::MarkCompleted => "markCompleted",
            ProgressEvent::AddTimeSpent(_) => "addTimeSpent",
        }
    }

    /// Content type an engagement event is tied to; `None` for events valid on any chapter.
    #[must_use]
    pub fn engagement_target(self) -> Option<ContentType> {
        match self {
            ProgressEvent::MarkVideoWatched => Some(ContentType::Video),
            ProgressEvent::MarkPdfViewed => Some(ContentType::Pdf),
            ProgressEvent::MarkResourceOpened => Some(ContentType::ExternalResource),
            ProgressEvent::MarkCompleted | ProgressEvent::AddTimeSpent(_) => None,
        }
    }

    /// Strict check used when a caller asked for this event explicitly.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::ContentTypeMismatch` when the event targets another content type.
    pub fn ensure_applies_to(self, content_type: ContentType) -> Result<(), ProgressError> {
        match self.engagement_target() {
            Some(target) if target != content_type => Err(ProgressError::ContentTypeMismatch {
                event: self.name(),
                content_type: content_type.as_str(),
            }),
            _ => Ok(()),
        }
    }
}

//
// ─── CHAPTER PROGRESS ──────────────────────────────────────────────────────────
//

/// Version carried by a record that was just created and never updated.
pub const INITIAL_VERSION: u64 = 0;

/// Per-(enrollment, chapter) engagement record.
///
/// Fields are only mutated through [`crate::progress_machine::apply`], which keeps
/// `completed_at` in step with `completed` and bumps `version` on every change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterProgress {
    enrollment_id: EnrollmentId,
    chapter_id: ChapterId,
    video_watched: bool,
    pdf_viewed: bool,
    resource_opened: bool,
    completed: bool,
    time_spent_minutes: u64,
    completed_at: Option<DateTime<Utc>>,
    version: u64,
}

impl ChapterProgress {
    /// Fresh record: nothing engaged, nothing completed.
    #[must_use]
    pub fn new(enrollment_id: EnrollmentId, chapter_id: ChapterId) -> Self {
        Self {
            enrollment_id,
            chapter_id,
            video_watched: false,
            pdf_viewed: false,
            resource_opened: false,
            completed: false,
            time_spent_minutes: 0,
            completed_at: None,
            version: INITIAL_VERSION,
        }
    }

    /// Rehydrate a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidPersistedState` if `completed_at` is set without
    /// `completed` or the other way round.
    #[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
    pub fn from_persisted(
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
        video_watched: bool,
        pdf_viewed: bool,
        resource_opened: bool,
        completed: bool,
        time_spent_minutes: u64,
        completed_at: Option<DateTime<Utc>>,
        version: u64,
    ) -> Result<Self, ProgressError> {
        if completed != completed_at.is_some() {
            let detail = "completed_at must be set exactly when completed";
            return Err(ProgressError::InvalidPersistedState(detail.into()));
        }

        Ok(Self {
            enrollment_id,
            chapter_id,
            video_watched,
            pdf_viewed,
            resource_opened,
            completed,
            time_spent_minutes,
            completed_at,
            version,
        })
    }

    #[must_use]
    pub fn enrollment_id(&self) -> EnrollmentId {
        self.enrollment_id
    }

    #[must_use]
    pub fn chapter_id(&self) -> ChapterId {
        self.chapter_id
    }

    #[must_use]
    pub fn video_watched(&self) -> bool {
        self.video_watched
    }

    #[must_use]
    pub fn pdf_viewed(&self) -> bool {
        self.pdf_viewed
    }

    #[must_use]
    pub fn resource_opened(&self) -> bool {
        self.resource_opened
    }

    #[must_use]
    pub fn completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn time_spent_minutes(&self) -> u64 {
        self.time_spent_minutes
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of engagement flags currently set.
    #[must_use]
    pub fn engagement_count(&self) -> u8 {
        u8::from(self.video_watched) + u8::from(self.pdf_viewed) + u8::from(self.resource_opened)
    }

    /// True once the learner has done anything that counts as activity.
    #[must_use]
    pub fn shows_activity(&self) -> bool {
        self.completed || self.time_spent_minutes > 0
    }

    pub(crate) fn set_video_watched(&mut self) {
        self.video_watched = true;
    }

    pub(crate) fn set_pdf_viewed(&mut self) {
        self.pdf_viewed = true;
    }

    pub(crate) fn set_resource_opened(&mut self) {
        self.resource_opened = true;
    }

    pub(crate) fn set_completed(&mut self, at: DateTime<Utc>) {
        self.completed = true;
        self.completed_at = Some(at);
    }

    pub(crate) fn set_time_spent(&mut self, minutes: u64) {
        self.time_spent_minutes = minutes;
    }

    pub(crate) fn bump_version(&mut self) {
        self.version = self.version.saturating_add(1);
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
