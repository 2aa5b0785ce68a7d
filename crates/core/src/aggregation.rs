//! Enrollment-level aggregation.
//!
//! [`summarize`] is a pure, order-independent function of the chapter roster and the
//! progress records of one enrollment. It is recomputed on every write instead of
//! maintaining counters.

use std::collections::HashMap;

use crate::model::{
    Chapter, ChapterId, ChapterProgress, ChapterProgressDetail, EngagementQuantum,
    EnrollmentProgressSummary,
};

pub const QUANTUM_NONE: EngagementQuantum = 0;
pub const QUANTUM_SINGLE_SIGNAL: EngagementQuantum = 25;
pub const QUANTUM_MULTI_SIGNAL: EngagementQuantum = 50;
pub const QUANTUM_COMPLETED: EngagementQuantum = 100;

/// Display quantum for one chapter; a missing record counts as untouched.
#[must_use]
pub fn engagement_quantum(record: Option<&ChapterProgress>) -> EngagementQuantum {
    match record {
        None => QUANTUM_NONE,
        Some(r) if r.completed() => QUANTUM_COMPLETED,
        Some(r) => match r.engagement_count() {
            0 => QUANTUM_NONE,
            1 => QUANTUM_SINGLE_SIGNAL,
            _ => QUANTUM_MULTI_SIGNAL,
        },
    }
}

/// `round(100 * completed / total)` with halves rounded up; 0 for an empty course.
#[must_use]
pub fn completion_percentage(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    let rounded = (200 * completed + total) / (2 * total);
    u8::try_from(rounded).unwrap_or(100)
}

/// Summarize one enrollment.
///
/// Only published chapters count toward the totals. Records for unpublished or unknown
/// chapters are kept out of the counts but still register as activity.
#[must_use]
pub fn summarize(chapters: &[Chapter], records: &[ChapterProgress]) -> EnrollmentProgressSummary {
    // Duplicate records for one chapter resolve to the highest version so input order
    // never matters.
    let mut by_chapter: HashMap<ChapterId, &ChapterProgress> = HashMap::new();
    for record in records {
        by_chapter
            .entry(record.chapter_id())
            .and_modify(|kept| {
                if record.version() > kept.version() {
                    *kept = record;
                }
            })
            .or_insert(record);
    }

    let mut published: Vec<&Chapter> = chapters.iter().filter(|c| c.is_published).collect();
    published.sort_by_key(|c| (c.order, c.id));

    let mut details = Vec::with_capacity(published.len());
    let mut completed_chapters = 0_u32;
    let mut time_spent_minutes = 0_u64;

    for chapter in &published {
        let record = by_chapter.get(&chapter.id).copied();
        let completed = record.is_some_and(ChapterProgress::completed);
        if completed {
            completed_chapters = completed_chapters.saturating_add(1);
        }
        let minutes = record.map_or(0, ChapterProgress::time_spent_minutes);
        time_spent_minutes = time_spent_minutes.saturating_add(minutes);

        details.push(ChapterProgressDetail {
            chapter_id: chapter.id,
            order: chapter.order,
            content_type: chapter.content_type,
            video_watched: record.is_some_and(ChapterProgress::video_watched),
            pdf_viewed: record.is_some_and(ChapterProgress::pdf_viewed),
            resource_opened: record.is_some_and(ChapterProgress::resource_opened),
            completed,
            time_spent_minutes: minutes,
            completed_at: record.and_then(ChapterProgress::completed_at),
            engagement_quantum: engagement_quantum(record),
        });
    }

    let total_chapters = u32::try_from(details.len()).unwrap_or(u32::MAX);

    EnrollmentProgressSummary {
        total_chapters,
        completed_chapters,
        percentage: completion_percentage(completed_chapters, total_chapters),
        time_spent_minutes,
        has_activity: by_chapter.values().any(|r| r.shows_activity()),
        chapters: details,
    }
}
