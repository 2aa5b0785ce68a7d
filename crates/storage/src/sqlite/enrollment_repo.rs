use course_core::model::{Enrollment, EnrollmentId};

use super::{
    SqliteRepository,
    mapping::{course_id_i64, enrollment_id_i64, id_to_i64, map_enrollment_row, map_sqlx},
};
use crate::repository::{EnrollmentRepository, StorageError};

#[async_trait::async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO enrollments (
                id, course_id, status, progress_percentage, enrolled_at, completed_at, version
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(enrollment_id_i64(enrollment.id())?)
        .bind(course_id_i64(enrollment.course_id())?)
        .bind(enrollment.status().as_str())
        .bind(i64::from(enrollment.progress_percentage()))
        .bind(enrollment.enrolled_at())
        .bind(enrollment.completed_at())
        .bind(id_to_i64("version", enrollment.version())?)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn get_enrollment(&self, id: EnrollmentId) -> Result<Enrollment, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, status, progress_percentage, enrolled_at, completed_at, version
            FROM enrollments
            WHERE id = ?1
            ",
        )
        .bind(enrollment_id_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or(StorageError::NotFound)?;

        map_enrollment_row(&row)
    }

    async fn compare_and_swap_enrollment(
        &self,
        enrollment: &Enrollment,
        expected_version: u64,
    ) -> Result<(), StorageError> {
        let id = enrollment_id_i64(enrollment.id())?;

        // course_id and enrolled_at never change after insert.
        let res = sqlx::query(
            r"
            UPDATE enrollments SET
                status = ?2,
                progress_percentage = ?3,
                completed_at = ?4,
                version = ?5
            WHERE id = ?1 AND version = ?6
            ",
        )
        .bind(id)
        .bind(enrollment.status().as_str())
        .bind(i64::from(enrollment.progress_percentage()))
        .bind(enrollment.completed_at())
        .bind(id_to_i64("version", enrollment.version())?)
        .bind(id_to_i64("version", expected_version)?)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        if res.rows_affected() == 1 {
            return Ok(());
        }

        let exists = sqlx::query("SELECT 1 FROM enrollments WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx)?;

        match exists {
            Some(_) => Err(StorageError::VersionConflict),
            None => Err(StorageError::NotFound),
        }
    }
}
