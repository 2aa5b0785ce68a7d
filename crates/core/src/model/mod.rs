mod chapter;
mod enrollment;
mod ids;
mod progress;
mod summary;

pub use ids::{ChapterId, CourseId, EnrollmentId, ParseIdError};

pub use chapter::{Chapter, ChapterError, ContentType};
pub use enrollment::{Enrollment, EnrollmentError, EnrollmentStatus};
pub use progress::{ChapterProgress, INITIAL_VERSION, ProgressError, ProgressEvent};
pub use summary::{ChapterProgressDetail, EngagementQuantum, EnrollmentProgressSummary};
