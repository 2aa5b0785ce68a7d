use course_core::model::{ChapterId, ChapterProgress, EnrollmentId, INITIAL_VERSION};

use super::{
    SqliteRepository,
    mapping::{chapter_id_i64, enrollment_id_i64, id_to_i64, map_progress_row, map_sqlx},
};
use crate::repository::{ProgressRecordStore, StorageError};

#[async_trait::async_trait]
impl ProgressRecordStore for SqliteRepository {
    async fn get(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
    ) -> Result<ChapterProgress, StorageError> {
        let row = sqlx::query(
            r"
            SELECT enrollment_id, chapter_id, video_watched, pdf_viewed, resource_opened,
                   completed, time_spent_minutes, completed_at, version
            FROM chapter_progress
            WHERE enrollment_id = ?1 AND chapter_id = ?2
            ",
        )
        .bind(enrollment_id_i64(enrollment_id)?)
        .bind(chapter_id_i64(chapter_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or(StorageError::NotFound)?;

        map_progress_row(&row)
    }

    async fn get_all(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Vec<ChapterProgress>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT enrollment_id, chapter_id, video_watched, pdf_viewed, resource_opened,
                   completed, time_spent_minutes, completed_at, version
            FROM chapter_progress
            WHERE enrollment_id = ?1
            ORDER BY chapter_id ASC
            ",
        )
        .bind(enrollment_id_i64(enrollment_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_progress_row(&row)?);
        }
        Ok(out)
    }

    async fn compare_and_swap(
        &self,
        record: &ChapterProgress,
        expected_version: u64,
    ) -> Result<(), StorageError> {
        let enrollment = enrollment_id_i64(record.enrollment_id())?;
        let chapter = chapter_id_i64(record.chapter_id())?;
        let minutes = id_to_i64("time_spent_minutes", record.time_spent_minutes())?;

        // A single conditional UPDATE: SQLite serializes writers, so only one of two
        // racing swaps can still see the expected version.
        let res = sqlx::query(
            r"
            UPDATE chapter_progress SET
                video_watched = ?3,
                pdf_viewed = ?4,
                resource_opened = ?5,
                completed = ?6,
                time_spent_minutes = ?7,
                completed_at = ?8,
                version = ?9
            WHERE enrollment_id = ?1 AND chapter_id = ?2 AND version = ?10
            ",
        )
        .bind(enrollment)
        .bind(chapter)
        .bind(record.video_watched())
        .bind(record.pdf_viewed())
        .bind(record.resource_opened())
        .bind(record.completed())
        .bind(minutes)
        .bind(record.completed_at())
        .bind(id_to_i64("version", record.version())?)
        .bind(id_to_i64("version", expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if res.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query(
            "SELECT 1 FROM chapter_progress WHERE enrollment_id = ?1 AND chapter_id = ?2",
        )
        .bind(enrollment)
        .bind(chapter)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        match exists {
            Some(_) => Err(StorageError::VersionConflict),
            None => Err(StorageError::NotFound),
        }
    }

    async fn create(
        &self,
        enrollment_id: EnrollmentId,
        chapter_id: ChapterId,
    ) -> Result<ChapterProgress, StorageError> {
        sqlx::query(
            r"
            INSERT INTO chapter_progress (enrollment_id, chapter_id, version)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(enrollment_id, chapter_id) DO NOTHING
            ",
        )
        .bind(enrollment_id_i64(enrollment_id)?)
        .bind(chapter_id_i64(chapter_id)?)
        .bind(id_to_i64("version", INITIAL_VERSION)?)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        self.get(enrollment_id, chapter_id).await
    }

    async fn purge_enrollment(&self, enrollment_id: EnrollmentId) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM chapter_progress WHERE enrollment_id = ?1")
            .bind(enrollment_id_i64(enrollment_id)?)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;
        Ok(res.rows_affected())
    }
}
