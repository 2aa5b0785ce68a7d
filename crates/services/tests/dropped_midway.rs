use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use course_core::model::{
    Chapter, ChapterId, ContentType, CourseId, Enrollment, EnrollmentId, ProgressEvent,
};
use course_core::status::drop_enrollment;
use course_core::time::fixed_clock;
use services::{ProgressService, ProgressServiceConfig, ProgressServiceError};
use storage::repository::{
    CatalogRepository, EnrollmentRepository, InMemoryRepository, ProgressRecordStore, StorageError,
};

const COURSE: CourseId = CourseId::new(1);
const ENROLLMENT: EnrollmentId = EnrollmentId::new(1);
const CHAPTER: ChapterId = ChapterId::new(1);

/// Answers the first read with the live enrollment, then drops it before every
/// later read, the way a concurrent drop request would.
struct DroppedAfterFirstRead {
    inner: InMemoryRepository,
    reads: AtomicU32,
}

#[async_trait]
impl EnrollmentRepository for DroppedAfterFirstRead {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        self.inner.insert_enrollment(enrollment).await
    }

    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Enrollment, StorageError> {
        let current = self.inner.get_enrollment(id).await?;
        if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(current);
        }

        let dropped = drop_enrollment(&current).unwrap();
        if dropped != current {
            self.inner
                .compare_and_swap_enrollment(&dropped, current.version())
                .await?;
        }
        Ok(dropped)
    }

    async fn compare_and_swap_enrollment(
        &self,
        enrollment: &Enrollment,
        expected_version: u64,
    ) -> Result<(), StorageError> {
        self.inner
            .compare_and_swap_enrollment(enrollment, expected_version)
            .await
    }
}

#[tokio::test]
async fn drop_between_resolve_and_create_blocks_the_write() {
    let repo = InMemoryRepository::new();
    let chapter = Chapter::new(CHAPTER, COURSE, 1, ContentType::Video, true);
    repo.upsert_chapter(&chapter).await.unwrap();
    let enrollment = Enrollment::new(ENROLLMENT, COURSE, fixed_clock().now());
    repo.insert_enrollment(&enrollment).await.unwrap();

    let enrollments = DroppedAfterFirstRead {
        inner: repo.clone(),
        reads: AtomicU32::new(0),
    };
    let service = ProgressService::new(
        fixed_clock(),
        ProgressServiceConfig::default(),
        Arc::new(repo.clone()),
        Arc::new(enrollments),
        Arc::new(repo.clone()),
    );

    let err = service
        .handle_event(ENROLLMENT, CHAPTER, ProgressEvent::MarkCompleted)
        .await
        .unwrap_err();
    assert!(matches!(err, ProgressServiceError::PreconditionFailed(_)));

    // Nothing was recreated behind the drop.
    assert!(repo.get_all(ENROLLMENT).await.unwrap().is_empty());
    assert!(matches!(
        repo.get(ENROLLMENT, CHAPTER).await,
        Err(StorageError::NotFound)
    ));
}
