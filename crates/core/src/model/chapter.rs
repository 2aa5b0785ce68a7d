use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ChapterId, CourseId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChapterError {
    #[error("unknown content type: {0}")]
    UnknownContentType(String),
}

/// Primary content component of a chapter.
///
/// Decides which engagement flag a progress record may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ContentType {
    Video,
    Pdf,
    ExternalResource,
}

impl ContentType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Pdf => "pdf",
            ContentType::ExternalResource => "externalResource",
        }
    }

    /// Parses the storage representation produced by [`ContentType::as_str`].
    ///
    /// # Errors
    ///
    /// Returns `ChapterError::UnknownContentType` for any other value.
    pub fn parse(raw: &str) -> Result<Self, ChapterError> {
        match raw {
            "video" => Ok(ContentType::Video),
            "pdf" => Ok(ContentType::Pdf),
            "externalResource" => Ok(ContentType::ExternalResource),
            other => Err(ChapterError::UnknownContentType(other.to_owned())),
        }
    }
}

/// Catalog view of a chapter. Read-only to the progress engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    pub course_id: CourseId,
    pub order: u32,
    pub content_type: ContentType,
    pub is_published: bool,
}

impl Chapter {
    #[must_use]
    pub fn new(
        id: ChapterId,
        course_id: CourseId,
        order: u32,
        content_type: ContentType,
        is_published: bool,
    ) -> Self {
        Self {
            id,
            course_id,
            order,
            content_type,
            is_published,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_storage_names_round_trip() {
        for kind in [
            ContentType::Video,
            ContentType::Pdf,
            ContentType::ExternalResource,
        ] {
            assert_eq!(ContentType::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(matches!(
            ContentType::parse("audio"),
            Err(ChapterError::UnknownContentType(_))
        ));
    }
}
