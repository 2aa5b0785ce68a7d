use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use course_core::aggregation;
use course_core::model::{
    Chapter, ChapterId, ChapterProgress, Enrollment, EnrollmentId, EnrollmentProgressSummary,
    EnrollmentStatus, ProgressEvent,
};
use course_core::progress_machine;
use course_core::status;
use course_core::time::Clock;
use storage::repository::{
    CatalogRepository, EnrollmentRepository, ProgressRecordStore, Storage, StorageError,
};

use crate::config::ProgressServiceConfig;
use crate::error::ProgressServiceError;

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// What every progress operation hands back: the recomputed summary and the
/// enrollment as persisted after the status step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    pub summary: EnrollmentProgressSummary,
    pub enrollment: Enrollment,
}

impl ProgressReport {
    #[must_use]
    pub fn status(&self) -> EnrollmentStatus {
        self.enrollment.status()
    }
}

/// Result of an explicit drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropOutcome {
    pub enrollment: Enrollment,
    /// Progress records deleted; zero unless a purge was requested.
    pub purged_records: u64,
}

/// Generic chapter update. A `true` flag becomes its event; `false` means "leave as is",
/// since nothing in the model can be unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChapterUpdate {
    pub video_watched: bool,
    pub pdf_viewed: bool,
    pub resource_opened: bool,
    pub completed: bool,
    pub time_spent_delta_minutes: Option<i64>,
}

impl ChapterUpdate {
    /// Events in application order: engagement flags, then completion, then time.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        let mut events = Vec::with_capacity(5);
        if self.video_watched {
            events.push(ProgressEvent::MarkVideoWatched);
        }
        if self.pdf_viewed {
            events.push(ProgressEvent::MarkPdfViewed);
        }
        if self.resource_opened {
            events.push(ProgressEvent::MarkResourceOpened);
        }
        if self.completed {
            events.push(ProgressEvent::MarkCompleted);
        }
        if let Some(minutes) = self.time_spent_delta_minutes {
            events.push(ProgressEvent::AddTimeSpent(minutes));
        }
        events
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Façade over the progress engine: per-chapter writes with optimistic
/// concurrency, followed by aggregation and the enrollment status step.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    config: ProgressServiceConfig,
    catalog: Arc<dyn CatalogRepository>,
    enrollments: Arc<dyn EnrollmentRepository>,
    progress: Arc<dyn ProgressRecordStore>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: ProgressServiceConfig,
        catalog: Arc<dyn CatalogRepository>,
        enrollments: Arc<dyn EnrollmentRepository>,
        progress: Arc<dyn ProgressRecordStore>,
    ) -> Self {
        Self {
            clock,
            config,
            catalog,
            enrollments,
            progress,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, config: ProgressServiceConfig, storage: &Storage) -> Self {
        Self::new(
            clock,
            config,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.enrollments),
            Arc::clone(&storage.progress),
        )
    }

    /// Apply one event. Engagement events that do not match the chapter's content
    /// type are accepted as no-ops.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` for unknown ids or a chapter outside the
    /// enrollment's course, `InvalidArgument` for a negative time delta,
    /// `PreconditionFailed` for a dropped enrollment, and `Conflict` once the retry
    /// budget is spent.
    pub async fn handle_event(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
        event: ProgressEvent,
    ) -> Result<ProgressReport, ProgressServiceError> {
        self.handle_events(enrollment_id, chapter_id, &[event])
            .await
    }

    /// Apply one event requested through a dedicated endpoint, where a content type
    /// mismatch is a caller error rather than a no-op.
    ///
    /// # Errors
    ///
    /// Same as [`Self::handle_event`], plus `InvalidArgument` when the event does not
    /// apply to the chapter's content type.
    pub async fn handle_explicit_event(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
        event: ProgressEvent,
    ) -> Result<ProgressReport, ProgressServiceError> {
        let (enrollment, chapter) = self.resolve(enrollment_id, chapter_id).await?;
        event.ensure_applies_to(chapter.content_type)?;
        self.commit(&enrollment, &chapter, &[event]).await
    }

    /// Apply a generic update as a single write.
    ///
    /// # Errors
    ///
    /// Same as [`Self::handle_events`].
    pub async fn apply_update(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
        update: ChapterUpdate,
    ) -> Result<ProgressReport, ProgressServiceError> {
        self.handle_events(enrollment_id, chapter_id, &update.events())
            .await
    }

    /// Apply several events to one record and commit them with one compare-and-swap.
    /// If any event fails, nothing is written.
    ///
    /// # Errors
    ///
    /// Same as [`Self::handle_event`].
    pub async fn handle_events(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
        events: &[ProgressEvent],
    ) -> Result<ProgressReport, ProgressServiceError> {
        let (enrollment, chapter) = self.resolve(enrollment_id, chapter_id).await?;
        self.commit(&enrollment, &chapter, events).await
    }

    /// Read-only aggregation; nothing is written.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::NotFound` for an unknown enrollment.
    pub async fn get_summary(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<ProgressReport, ProgressServiceError> {
        let enrollment = self.enrollments.get_enrollment(enrollment_id).await?;
        let summary = self.summarize(&enrollment).await?;
        Ok(ProgressReport {
            summary,
            enrollment,
        })
    }

    /// Drop an enrollment, optionally deleting its progress records.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::PreconditionFailed` for a completed enrollment,
    /// `NotFound` for an unknown one, and `Conflict` once the retry budget is spent.
    pub async fn drop_enrollment(
        &self,
        enrollment_id: EnrollmentId,
        purge: bool,
    ) -> Result<DropOutcome, ProgressServiceError> {
        let enrollment = self.write_drop(enrollment_id).await?;

        let purged_records = if purge {
            let purged = self.progress.purge_enrollment(enrollment_id).await?;
            info!(enrollment_id = %enrollment_id, purged, "purged progress records");
            purged
        } else {
            0
        };

        Ok(DropOutcome {
            enrollment,
            purged_records,
        })
    }

    //
    // ─── INTERNALS ─────────────────────────────────────────────────────────────
    //

    async fn resolve(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
    ) -> Result<(Enrollment, Chapter), ProgressServiceError> {
        let enrollment = self.enrollments.get_enrollment(enrollment_id).await?;
        let chapter = self.catalog.get_chapter(chapter_id).await?;
        if chapter.course_id != enrollment.course_id() {
            return Err(ProgressServiceError::NotFound);
        }
        enrollment.ensure_accepts_events()?;
        Ok((enrollment, chapter))
    }

    async fn commit(
        &self,
        enrollment: &Enrollment,
        chapter: &Chapter,
        events: &[ProgressEvent],
    ) -> Result<ProgressReport, ProgressServiceError> {
        let now = self.clock.now();
        self.write_record(enrollment.id(), chapter, events, now)
            .await?;
        self.recompute(enrollment.id(), now).await
    }

    /// Load-or-create, apply, compare-and-swap; reload and start over on conflict.
    async fn write_record(
        &self,
        enrollment_id: EnrollmentId,
        chapter: &Chapter,
        events: &[ProgressEvent],
        now: DateTime<Utc>,
    ) -> Result<ChapterProgress, ProgressServiceError> {
        let max_attempts = self.config.max_attempts();

        for attempt in 1..=max_attempts {
            let current = match self.progress.get(enrollment_id, chapter.id).await {
                Ok(record) => record,
                Err(StorageError::NotFound) => {
                    // The enrollment may have been dropped and purged since `resolve`.
                    self.enrollments
                        .get_enrollment(enrollment_id)
                        .await?
                        .ensure_accepts_events()?;
                    self.progress.create(enrollment_id, chapter.id).await?
                }
                Err(err) => return Err(err.into()),
            };

            let next = progress_machine::apply_all(&current, chapter.content_type, events, now)?;
            if next == current {
                return Ok(current);
            }

            match self
                .progress
                .compare_and_swap(&next, current.version())
                .await
            {
                Ok(()) => return Ok(next),
                Err(StorageError::VersionConflict) => {
                    debug!(
                        enrollment_id = %enrollment_id,
                        chapter_id = %chapter.id,
                        attempt,
                        "progress record changed underneath, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(
            enrollment_id = %enrollment_id,
            chapter_id = %chapter.id,
            max_attempts,
            "giving up on progress record after repeated conflicts"
        );
        Err(ProgressServiceError::Conflict {
            attempts: max_attempts,
        })
    }

    /// Aggregate, reconcile the enrollment status, and persist it if it moved.
    async fn recompute(
        &self,
        enrollment_id: EnrollmentId,
        now: DateTime<Utc>,
    ) -> Result<ProgressReport, ProgressServiceError> {
        let max_attempts = self.config.max_attempts();

        for attempt in 1..=max_attempts {
            let current = self.enrollments.get_enrollment(enrollment_id).await?;
            let summary = self.summarize(&current).await?;
            let next = status::reconcile(&current, &summary, now);

            if next == current {
                return Ok(ProgressReport {
                    summary,
                    enrollment: current,
                });
            }

            match self
                .enrollments
                .compare_and_swap_enrollment(&next, current.version())
                .await
            {
                Ok(()) => {
                    if next.status() != current.status() {
                        info!(
                            enrollment_id = %enrollment_id,
                            from = current.status().as_str(),
                            to = next.status().as_str(),
                            percentage = summary.percentage,
                            "enrollment status changed"
                        );
                    }
                    return Ok(ProgressReport {
                        summary,
                        enrollment: next,
                    });
                }
                Err(StorageError::VersionConflict) => {
                    debug!(
                        enrollment_id = %enrollment_id,
                        attempt,
                        "enrollment changed underneath, retrying status step"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(
            enrollment_id = %enrollment_id,
            max_attempts,
            "giving up on enrollment status after repeated conflicts"
        );
        Err(ProgressServiceError::Conflict {
            attempts: max_attempts,
        })
    }

    async fn write_drop(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, ProgressServiceError> {
        let max_attempts = self.config.max_attempts();

        for attempt in 1..=max_attempts {
            let current = self.enrollments.get_enrollment(enrollment_id).await?;
            let next = status::drop_enrollment(&current)?;
            if next == current {
                return Ok(current);
            }

            match self
                .enrollments
                .compare_and_swap_enrollment(&next, current.version())
                .await
            {
                Ok(()) => {
                    info!(
                        enrollment_id = %enrollment_id,
                        from = current.status().as_str(),
                        "enrollment dropped"
                    );
                    return Ok(next);
                }
                Err(StorageError::VersionConflict) => {
                    debug!(enrollment_id = %enrollment_id, attempt, "retrying drop");
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(enrollment_id = %enrollment_id, max_attempts, "giving up on drop");
        Err(ProgressServiceError::Conflict {
            attempts: max_attempts,
        })
    }

    async fn summarize(
        &self,
        enrollment: &Enrollment,
    ) -> Result<EnrollmentProgressSummary, ProgressServiceError> {
        let chapters = self
            .catalog
            .chapters_for_course(enrollment.course_id())
            .await?;
        let records = self.progress.get_all(enrollment.id()).await?;
        Ok(aggregation::summarize(&chapters, &records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_events_follow_fixed_order() {
        let update = ChapterUpdate {
            video_watched: true,
            pdf_viewed: false,
            resource_opened: true,
            completed: true,
            time_spent_delta_minutes: Some(3),
        };
        assert_eq!(
            update.events(),
            vec![
                ProgressEvent::MarkVideoWatched,
                ProgressEvent::MarkResourceOpened,
                ProgressEvent::MarkCompleted,
                ProgressEvent::AddTimeSpent(3),
            ]
        );
    }

    #[test]
    fn empty_update_has_no_events() {
        assert!(ChapterUpdate::default().events().is_empty());
    }
}
