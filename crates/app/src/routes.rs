//! HTTP surface of the progress engine.
//!
//! Every progress route answers with the recomputed summary and the enrollment
//! status, so clients never need a second round trip after a write.

use std::time::Duration;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use course_core::model::{
    ChapterId, EnrollmentId, EnrollmentProgressSummary, EnrollmentStatus, ProgressEvent,
};
use services::{ChapterUpdate, DropOutcome, ProgressReport, ProgressService, ProgressServiceError};

#[derive(Clone)]
pub struct AppState {
    pub service: ProgressService,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok\n" }))
        .route("/enrollments/{enrollment_id}/progress", get(get_progress))
        .route("/enrollments/{enrollment_id}/drop", post(drop_enrollment))
        .route(
            "/enrollments/{enrollment_id}/chapters/{chapter_id}/progress",
            put(update_progress),
        )
        .route(
            "/enrollments/{enrollment_id}/chapters/{chapter_id}/complete",
            post(mark_completed),
        )
        .route(
            "/enrollments/{enrollment_id}/chapters/{chapter_id}/video-watched",
            post(mark_video_watched),
        )
        .route(
            "/enrollments/{enrollment_id}/chapters/{chapter_id}/pdf-viewed",
            post(mark_pdf_viewed),
        )
        .route(
            "/enrollments/{enrollment_id}/chapters/{chapter_id}/resource-opened",
            post(mark_resource_opened),
        )
        .route(
            "/enrollments/{enrollment_id}/chapters/{chapter_id}/time-spent",
            post(add_time_spent),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressResponse {
    pub enrollment_id: EnrollmentId,
    pub status: EnrollmentStatus,
    pub progress_percentage: u8,
    pub completed_at: Option<DateTime<Utc>>,
    pub summary: EnrollmentProgressSummary,
}

impl From<ProgressReport> for ProgressResponse {
    fn from(report: ProgressReport) -> Self {
        Self {
            enrollment_id: report.enrollment.id(),
            status: report.enrollment.status(),
            progress_percentage: report.enrollment.progress_percentage(),
            completed_at: report.enrollment.completed_at(),
            summary: report.summary,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DropResponse {
    pub enrollment_id: EnrollmentId,
    pub status: EnrollmentStatus,
    pub purged_records: u64,
}

impl From<DropOutcome> for DropResponse {
    fn from(outcome: DropOutcome) -> Self {
        Self {
            enrollment_id: outcome.enrollment.id(),
            status: outcome.enrollment.status(),
            purged_records: outcome.purged_records,
        }
    }
}

/// Generic update body. Absent and `false` fields both leave the record alone.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProgressRequest {
    pub video_watched: Option<bool>,
    pub pdf_viewed: Option<bool>,
    pub resource_opened: Option<bool>,
    pub completed: Option<bool>,
    pub time_spent_delta_minutes: Option<i64>,
}

impl From<UpdateProgressRequest> for ChapterUpdate {
    fn from(req: UpdateProgressRequest) -> Self {
        Self {
            video_watched: req.video_watched.unwrap_or(false),
            pdf_viewed: req.pdf_viewed.unwrap_or(false),
            resource_opened: req.resource_opened.unwrap_or(false),
            completed: req.completed.unwrap_or(false),
            time_spent_delta_minutes: req.time_spent_delta_minutes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimeSpentRequest {
    pub minutes: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct DropRequest {
    #[serde(default)]
    pub purge: bool,
}

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug)]
pub struct ApiError(ProgressServiceError);

impl From<ProgressServiceError> for ApiError {
    fn from(err: ProgressServiceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ProgressServiceError::NotFound => StatusCode::NOT_FOUND,
            ProgressServiceError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ProgressServiceError::Conflict { .. } => StatusCode::CONFLICT,
            ProgressServiceError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Path of every chapter-scoped route.
type ChapterPath = Path<(EnrollmentId, ChapterId)>;

//
// ─── HANDLERS ──────────────────────────────────────────────────────────────────
//

async fn get_progress(
    State(state): State<AppState>,
    Path(enrollment_id): Path<EnrollmentId>,
) -> ApiResult<ProgressResponse> {
    let report = state.service.get_summary(enrollment_id).await?;
    Ok(Json(report.into()))
}

async fn update_progress(
    State(state): State<AppState>,
    Path((enrollment_id, chapter_id)): ChapterPath,
    Json(body): Json<UpdateProgressRequest>,
) -> ApiResult<ProgressResponse> {
    let report = state
        .service
        .apply_update(enrollment_id, chapter_id, body.into())
        .await?;
    Ok(Json(report.into()))
}

async fn explicit(
    state: &AppState,
    (enrollment_id, chapter_id): (EnrollmentId, ChapterId),
    event: ProgressEvent,
) -> ApiResult<ProgressResponse> {
    let report = state
        .service
        .handle_explicit_event(enrollment_id, chapter_id, event)
        .await?;
    Ok(Json(report.into()))
}

async fn mark_completed(
    State(state): State<AppState>,
    Path(ids): ChapterPath,
) -> ApiResult<ProgressResponse> {
    explicit(&state, ids, ProgressEvent::MarkCompleted).await
}

async fn mark_video_watched(
    State(state): State<AppState>,
    Path(ids): ChapterPath,
) -> ApiResult<ProgressResponse> {
    explicit(&state, ids, ProgressEvent::MarkVideoWatched).await
}

async fn mark_pdf_viewed(
    State(state): State<AppState>,
    Path(ids): ChapterPath,
) -> ApiResult<ProgressResponse> {
    explicit(&state, ids, ProgressEvent::MarkPdfViewed).await
}

async fn mark_resource_opened(
    State(state): State<AppState>,
    Path(ids): ChapterPath,
) -> ApiResult<ProgressResponse> {
    explicit(&state, ids, ProgressEvent::MarkResourceOpened).await
}

async fn add_time_spent(
    State(state): State<AppState>,
    Path(ids): ChapterPath,
    Json(body): Json<TimeSpentRequest>,
) -> ApiResult<ProgressResponse> {
    explicit(&state, ids, ProgressEvent::AddTimeSpent(body.minutes)).await
}

async fn drop_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<EnrollmentId>,
    body: Option<Json<DropRequest>>,
) -> ApiResult<DropResponse> {
    let purge = body.is_some_and(|Json(req)| req.purge);
    let outcome = state.service.drop_enrollment(enrollment_id, purge).await?;
    Ok(Json(outcome.into()))
}
