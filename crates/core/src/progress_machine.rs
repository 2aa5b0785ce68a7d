//! Per-chapter progress state machine.
//!
//! [`apply`] is a pure function from `(record, event)` to the next record. An event
//! that changes nothing returns the record untouched, with the same `version`, so a
//! replayed client request is indistinguishable from the original one.

use chrono::{DateTime, Utc};

use crate::model::{ChapterProgress, ContentType, ProgressError, ProgressEvent};

/// Apply one event to a progress record.
///
/// - Engagement events are no-ops when they do not match `content_type` or the flag is
///   already set.
/// - `MarkCompleted` stamps `completed_at` on the first transition only.
/// - `AddTimeSpent(0)` is a no-op; negative deltas are rejected.
///
/// # Errors
///
/// Returns `ProgressError::NegativeTimeDelta` for a negative delta and
/// `ProgressError::TimeOverflow` if the accumulator would overflow.
pub fn apply(
    current: &ChapterProgress,
    content_type: ContentType,
    event: ProgressEvent,
    now: DateTime<Utc>,
) -> Result<ChapterProgress, ProgressError> {
    let mut next = current.clone();

    let changed = match event {
        ProgressEvent::MarkVideoWatched => {
            let applies = content_type == ContentType::Video && !current.video_watched();
            if applies {
                next.set_video_watched();
            }
            applies
        }
        ProgressEvent::MarkPdfViewed => {
            let applies = content_type == ContentType::Pdf && !current.pdf_viewed();
            if applies {
                next.set_pdf_viewed();
            }
            applies
        }
        ProgressEvent::MarkResourceOpened => {
            let applies =
                content_type == ContentType::ExternalResource && !current.resource_opened();
            if applies {
                next.set_resource_opened();
            }
            applies
        }
        ProgressEvent::MarkCompleted => {
            let applies = !current.completed();
            if applies {
                next.set_completed(now);
            }
            applies
        }
        ProgressEvent::AddTimeSpent(minutes) => {
            let delta = u64::try_from(minutes)
                .map_err(|_| ProgressError::NegativeTimeDelta { minutes })?;
            if delta > 0 {
                let total = current
                    .time_spent_minutes()
                    .checked_add(delta)
                    .ok_or(ProgressError::TimeOverflow)?;
                next.set_time_spent(total);
            }
            delta > 0
        }
    };

    if changed {
        next.bump_version();
    }
    Ok(next)
}

/// Apply a batch of events in order, all or nothing.
///
/// # Errors
///
/// Returns the first `ProgressError` raised; no partial result is produced.
pub fn apply_all(
    current: &ChapterProgress,
    content_type: ContentType,
    events: &[ProgressEvent],
    now: DateTime<Utc>,
) -> Result<ChapterProgress, ProgressError> {
    let mut next = current.clone();
    for event in events {
        next = apply(&next, content_type, *event, now)?;
    }
    Ok(next)
}
