use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::chapter::ContentType;
use crate::model::ids::ChapterId;

/// Display-only engagement estimate for a single chapter: 0, 25, 50 or 100.
pub type EngagementQuantum = u8;

/// One published chapter as seen by the learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterProgressDetail {
    pub chapter_id: ChapterId,
    pub order: u32,
    pub content_type: ContentType,
    pub video_watched: bool,
    pub pdf_viewed: bool,
    pub resource_opened: bool,
    pub completed: bool,
    pub time_spent_minutes: u64,
    pub completed_at: Option<DateTime<Utc>>,
    pub engagement_quantum: EngagementQuantum,
}

/// Enrollment-level progress, always recomputed from progress records and the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentProgressSummary {
    pub total_chapters: u32,
    pub completed_chapters: u32,
    pub percentage: u8,
    /// Minutes spent on published chapters.
    pub time_spent_minutes: u64,
    /// Any record, published or not, is completed or has time logged.
    pub has_activity: bool,
    /// Published chapters in course order.
    pub chapters: Vec<ChapterProgressDetail>,
}

impl EnrollmentProgressSummary {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_chapters: 0,
            completed_chapters: 0,
            percentage: 0,
            time_spent_minutes: 0,
            has_activity: false,
            chapters: Vec::new(),
        }
    }

    /// Completion threshold: the rounded percentage reads 100 and the course has
    /// at least one published chapter.
    #[must_use]
    pub fn reaches_completion(&self) -> bool {
        self.total_chapters > 0 && self.percentage == 100
    }
}
