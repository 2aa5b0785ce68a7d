use anyhow::Context as _;
use course_core::model::{Chapter, ChapterId, ContentType, CourseId, Enrollment, EnrollmentId};
use services::Clock;
use storage::repository::{Storage, StorageError};

use crate::cli::SeedArgs;

const ROTATION: [ContentType; 3] = [
    ContentType::Video,
    ContentType::Pdf,
    ContentType::ExternalResource,
];

fn content_type_for(index: u32) -> ContentType {
    ROTATION[index as usize % ROTATION.len()]
}

/// Upsert the demo roster and enroll once. Rerunning keeps the existing enrollment
/// and its progress.
///
/// # Errors
///
/// Returns an error if chapter ids overflow or storage fails.
pub async fn run(storage: &Storage, args: &SeedArgs, clock: Clock) -> anyhow::Result<Enrollment> {
    let course_id = CourseId::new(args.course_id);

    for index in 0..args.chapters {
        let id = args
            .first_chapter_id
            .checked_add(u64::from(index))
            .context("chapter id overflow")?;
        let chapter = Chapter::new(
            ChapterId::new(id),
            course_id,
            index + 1,
            content_type_for(index),
            true,
        );
        storage
            .catalog
            .upsert_chapter(&chapter)
            .await
            .with_context(|| format!("upsert chapter {id}"))?;
    }

    let enrollment_id = EnrollmentId::new(args.enrollment_id);
    let enrollment = match storage.enrollments.get_enrollment(enrollment_id).await {
        Ok(existing) => existing,
        Err(StorageError::NotFound) => {
            let enrollment = Enrollment::new(enrollment_id, course_id, clock.now());
            storage
                .enrollments
                .insert_enrollment(&enrollment)
                .await
                .context("insert enrollment")?;
            enrollment
        }
        Err(err) => return Err(err).context("load enrollment"),
    };

    tracing::info!(
        course_id = %course_id,
        chapters = args.chapters,
        enrollment_id = %enrollment.id(),
        status = enrollment.status().as_str(),
        "seeded course"
    );
    Ok(enrollment)
}
