use course_core::model::{
    Chapter, ChapterId, ChapterProgress, ContentType, CourseId, Enrollment, EnrollmentId,
    EnrollmentStatus,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Domain validation failures while rehydrating a row.
fn domain<E: Into<course_core::Error>>(e: E) -> StorageError {
    StorageError::Serialization(e.into().to_string())
}

/// Classify driver errors: constraint hits become domain-level storage errors.
pub(crate) fn map_sqlx(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::RowNotFound => StorageError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StorageError::NotFound,
        other => StorageError::Connection(other.to_string()),
    }
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| ser(format_args!("{field} overflow")))
}

/// Reads an INTEGER column that holds an unsigned value.
fn get_u64(row: &SqliteRow, column: &'static str) -> Result<u64, StorageError> {
    let value: i64 = row.try_get(column).map_err(ser)?;
    u64::try_from(value).map_err(|_| ser(format_args!("{column} sign overflow")))
}

pub(crate) fn enrollment_id_i64(id: EnrollmentId) -> Result<i64, StorageError> {
    id_to_i64("enrollment_id", id.value())
}

pub(crate) fn chapter_id_i64(id: ChapterId) -> Result<i64, StorageError> {
    id_to_i64("chapter_id", id.value())
}

pub(crate) fn course_id_i64(id: CourseId) -> Result<i64, StorageError> {
    id_to_i64("course_id", id.value())
}

pub(crate) fn map_chapter_row(row: &SqliteRow) -> Result<Chapter, StorageError> {
    let content_type: String = row.try_get("content_type").map_err(ser)?;
    let position: i64 = row.try_get("position").map_err(ser)?;
    let order = u32::try_from(position)
        .map_err(|_| ser(format_args!("invalid position: {position}")))?;

    Ok(Chapter::new(
        ChapterId::new(get_u64(row, "id")?),
        CourseId::new(get_u64(row, "course_id")?),
        order,
        ContentType::parse(&content_type).map_err(domain)?,
        row.try_get("is_published").map_err(ser)?,
    ))
}

pub(crate) fn map_enrollment_row(row: &SqliteRow) -> Result<Enrollment, StorageError> {
    let status: String = row.try_get("status").map_err(ser)?;
    let stored: i64 = row.try_get("progress_percentage").map_err(ser)?;
    let percentage = u8::try_from(stored)
        .map_err(|_| ser(format_args!("invalid percentage: {stored}")))?;

    Enrollment::from_persisted(
        EnrollmentId::new(get_u64(row, "id")?),
        CourseId::new(get_u64(row, "course_id")?),
        EnrollmentStatus::parse(&status).map_err(domain)?,
        percentage,
        row.try_get("enrolled_at").map_err(ser)?,
        row.try_get("completed_at").map_err(ser)?,
        get_u64(row, "version")?,
    )
    .map_err(domain)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ChapterProgress, StorageError> {
    ChapterProgress::from_persisted(
        EnrollmentId::new(get_u64(row, "enrollment_id")?),
        ChapterId::new(get_u64(row, "chapter_id")?),
        row.try_get("video_watched").map_err(ser)?,
        row.try_get("pdf_viewed").map_err(ser)?,
        row.try_get("resource_opened").map_err(ser)?,
        row.try_get("completed").map_err(ser)?,
        get_u64(row, "time_spent_minutes")?,
        row.try_get("completed_at").map_err(ser)?,
        get_u64(row, "version")?,
    )
    .map_err(domain)
}
