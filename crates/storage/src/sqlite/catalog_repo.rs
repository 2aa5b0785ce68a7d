use course_core::model::{Chapter, ChapterId, CourseId};

use super::{
    SqliteRepository,
    mapping::{chapter_id_i64, course_id_i64, map_chapter_row, map_sqlx},
};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_chapter(&self, chapter: &Chapter) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO chapters (id, course_id, position, content_type, is_published)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                position = excluded.position,
                content_type = excluded.content_type,
                is_published = excluded.is_published
            ",
        )
        .bind(chapter_id_i64(chapter.id)?)
        .bind(course_id_i64(chapter.course_id)?)
        .bind(i64::from(chapter.order))
        .bind(chapter.content_type.as_str())
        .bind(chapter.is_published)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(())
    }

    async fn get_chapter(&self, id: ChapterId) -> Result<Chapter, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, course_id, position, content_type, is_published
            FROM chapters
            WHERE id = ?1
            ",
        )
        .bind(chapter_id_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?
        .ok_or(StorageError::NotFound)?;

        map_chapter_row(&row)
    }

    async fn chapters_for_course(&self, course_id: CourseId) -> Result<Vec<Chapter>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, position, content_type, is_published
            FROM chapters
            WHERE course_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(course_id_i64(course_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx)?;

        let mut chapters = Vec::with_capacity(rows.len());
        for row in rows {
            chapters.push(map_chapter_row(&row)?);
        }
        Ok(chapters)
    }
}
