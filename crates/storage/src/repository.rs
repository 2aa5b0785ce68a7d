use async_trait::async_trait;
use course_core::model::{Chapter, ChapterId, ChapterProgress, CourseId, Enrollment, EnrollmentId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    /// The stored version no longer matches the caller's expectation.
    #[error("version conflict")]
    VersionConflict,

    /// An insert collided with an existing row.
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable per-(enrollment, chapter) progress records.
///
/// `compare_and_swap` is the only concurrency primitive the progress engine relies on:
/// of two concurrent swaps against the same key and version, exactly one succeeds.
#[async_trait]
pub trait ProgressRecordStore: Send + Sync {
    /// Fetch one record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no record exists yet.
    async fn get(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
    ) -> Result<ChapterProgress, StorageError>;

    /// All records of an enrollment; chapters without events have no record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the records cannot be read.
    async fn get_all(&self, id: EnrollmentId) -> Result<Vec<ChapterProgress>, StorageError>;

    /// Replace the stored record if its version still equals `expected_version`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::VersionConflict` if another writer got there first and
    /// `StorageError::NotFound` if the record does not exist.
    async fn compare_and_swap(
        &self,
        record: &ChapterProgress,
        expected_version: u64,
    ) -> Result<(), StorageError>;

    /// Create an empty record, or return the existing one if a concurrent creator won.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the enrollment does not exist (where the
    /// backend can tell), or other storage errors.
    async fn create(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
    ) -> Result<ChapterProgress, StorageError>;

    /// Delete every record of an enrollment, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if deletion fails.
    async fn purge_enrollment(&self, enrollment_id: EnrollmentId) -> Result<u64, StorageError>;
}

/// Enrollment aggregate roots, written with optimistic concurrency.
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is taken.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Enrollment, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::VersionConflict` if the stored version moved on.
    async fn compare_and_swap_enrollment(
        &self,
        enrollment: &Enrollment,
        expected_version: u64,
    ) -> Result<(), StorageError>;
}

/// Read side of the course catalog, plus the write the catalog owner uses to sync chapters.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the chapter cannot be stored.
    async fn upsert_chapter(&self, chapter: &Chapter) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, StorageError>;

    /// Every chapter of a course, published or not, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the roster cannot be read.
    async fn chapters_for_course(&self, course_id: CourseId) -> Result<Vec<Chapter>, StorageError>;
}

/// In-memory implementation for tests and local runs.
///
/// Each map sits behind one mutex, so every compare-and-swap is a single critical section.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<(EnrollmentId, ChapterId), ChapterProgress>>>,
    enrollments: Arc<Mutex<HashMap<EnrollmentId, Enrollment>>>,
    chapters: Arc<Mutex<HashMap<ChapterId, Chapter>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressRecordStore for InMemoryRepository {
    async fn get(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
    ) -> Result<ChapterProgress, StorageError> {
        let guard = lock(&self.progress)?;
        guard
            .get(&(enrollment_id, chapter_id))
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn get_all(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<ChapterProgress>, StorageError> {
        let guard = lock(&self.progress)?;
        let mut records: Vec<ChapterProgress> = guard
            .values()
            .filter(|r| r.enrollment_id() == enrollment_id)
            .cloned()
            .collect();
        records.sort_by_key(ChapterProgress::chapter_id);
        Ok(records)
    }

    async fn compare_and_swap(
        &self,
        record: &ChapterProgress,
        expected_version: u64,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.progress)?;
        let key = (record.enrollment_id(), record.chapter_id());
        let stored = guard.get_mut(&key).ok_or(StorageError::NotFound)?;
        if stored.version() != expected_version {
            return Err(StorageError::VersionConflict);
        }
        *stored = record.clone();
        Ok(())
    }

    async fn create(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
    ) -> Result<ChapterProgress, StorageError> {
        let mut guard = lock(&self.progress)?;
        let record = guard
            .entry((enrollment_id, chapter_id))
            .or_insert_with(|| ChapterProgress::new(enrollment_id, chapter_id));
        Ok(record.clone())
    }

    async fn purge_enrollment(&self, enrollment_id: EnrollmentId) -> Result<u64, StorageError> {
        let mut guard = lock(&self.progress)?;
        let before = guard.len();
        guard.retain(|(owner, _), _| *owner != enrollment_id);
        Ok(u64::try_from(before - guard.len()).unwrap_or(u64::MAX))
    }
}

#[async_trait]
impl EnrollmentRepository for InMemoryRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        let mut guard = lock(&self.enrollments)?;
        if guard.contains_key(&enrollment.id()) {
            return Err(StorageError::Conflict);
        }
        guard.insert(enrollment.id(), enrollment.clone());
        Ok(())
    }

    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Enrollment, StorageError> {
        let guard = lock(&self.enrollments)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn compare_and_swap_enrollment(
        &self,
        enrollment: &Enrollment,
        expected_version: u64,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.enrollments)?;
        let stored = guard
            .get_mut(&enrollment.id())
            .ok_or(StorageError::NotFound)?;
        if stored.version() != expected_version {
            return Err(StorageError::VersionConflict);
        }
        *stored = enrollment.clone();
        Ok(())
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_chapter(&self, chapter: &Chapter) -> Result<(), StorageError> {
        let mut guard = lock(&self.chapters)?;
        guard.insert(chapter.id, chapter.clone());
        Ok(())
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, StorageError> {
        let guard = lock(&self.chapters)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn chapters_for_course(&self, course_id: CourseId) -> Result<Vec<Chapter>, StorageError> {
        let guard = lock(&self.chapters)?;
        let mut chapters: Vec<Chapter> = guard
            .values()
            .filter(|c| c.course_id == course_id)
            .cloned()
            .collect();
        chapters.sort_by_key(|c| (c.order, c.id));
        Ok(chapters)
    }
}

/// Repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRecordStore>,
    pub enrollments: Arc<dyn EnrollmentRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    /// Share one repository value across all three roles.
    #[must_use]
    pub fn from_repository<R>(repo: R) -> Self
    where
        R: ProgressRecordStore + EnrollmentRepository + CatalogRepository + Clone + 'static,
    {
        let progress: Arc<dyn ProgressRecordStore> = Arc::new(repo.clone());
        let enrollments: Arc<dyn EnrollmentRepository> = Arc::new(repo.clone());
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo);
        Self {
            progress,
            enrollments,
            catalog,
        }
    }
}
