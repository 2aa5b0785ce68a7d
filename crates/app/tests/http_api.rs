use std::time::Duration;

use app::cli::SeedArgs;
use app::routes::{AppState, router};
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use course_core::time::fixed_clock;
use serde_json::{Value, json};
use services::{ProgressService, ProgressServiceConfig};
use storage::repository::Storage;
use tower::ServiceExt as _;

/// Course 1 with chapters 1..=4 (video, pdf, resource, video) and enrollment 1.
async fn test_app() -> Router {
    let storage = Storage::in_memory();
    let args = SeedArgs {
        course_id: 1,
        chapters: 4,
        first_chapter_id: 1,
        enrollment_id: 1,
    };
    let clock = fixed_clock();
    app::seed::run(&storage, &args, clock).await.unwrap();

    let service = ProgressService::from_storage(clock, ProgressServiceConfig::default(), &storage);
    router(AppState { service }, Duration::from_secs(5))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let request = builder.body(body).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    send(app, Method::POST, uri, body).await
}

#[tokio::test]
async fn healthz_answers() {
    let app = test_app().await;
    let (status, _) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn fresh_enrollment_summary() {
    let app = test_app().await;
    let (status, body) = get(&app, "/enrollments/1/progress").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not-started");
    assert_eq!(body["summary"]["totalChapters"], 4);
    assert_eq!(body["summary"]["completedChapters"], 0);
    assert_eq!(body["summary"]["percentage"], 0);
    assert_eq!(body["summary"]["chapters"][2]["contentType"], "externalResource");
}

#[tokio::test]
async fn completing_chapters_moves_status() {
    let app = test_app().await;

    let (status, body) = post(&app, "/enrollments/1/chapters/1/complete", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in-progress");
    assert_eq!(body["progressPercentage"], 25);
    assert_eq!(body["summary"]["chapters"][0]["engagementQuantum"], 100);

    for chapter in 2..=4 {
        let uri = format!("/enrollments/1/chapters/{chapter}/complete");
        let (status, _) = post(&app, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (_, body) = get(&app, "/enrollments/1/progress").await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["summary"]["percentage"], 100);
    assert!(body["completedAt"].is_string());
}

#[tokio::test]
async fn explicit_mismatch_is_bad_request() {
    let app = test_app().await;

    let (status, body) = post(&app, "/enrollments/1/chapters/2/video-watched", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("pdf"));

    let (status, body) = post(&app, "/enrollments/1/chapters/2/pdf-viewed", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["chapters"][1]["pdfViewed"], true);
    assert_eq!(body["summary"]["chapters"][1]["engagementQuantum"], 25);

    let (status, body) = post(&app, "/enrollments/1/chapters/3/resource-opened", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["chapters"][2]["resourceOpened"], true);
}

#[tokio::test]
async fn time_spent_validates_delta() {
    let app = test_app().await;
    let uri = "/enrollments/1/chapters/4/time-spent";

    let (status, _) = post(&app, uri, Some(json!({ "minutes": -3 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post(&app, uri, Some(json!({ "minutes": 12 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "in-progress");
    assert_eq!(body["summary"]["timeSpentMinutes"], 12);
}

#[tokio::test]
async fn generic_put_ignores_mismatched_flags() {
    let app = test_app().await;
    let uri = "/enrollments/1/chapters/2/progress";

    let update = json!({ "videoWatched": true, "pdfViewed": true, "timeSpentDeltaMinutes": 3 });
    let (status, body) = send(&app, Method::PUT, uri, Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    let chapter = &body["summary"]["chapters"][1];
    assert_eq!(chapter["videoWatched"], false);
    assert_eq!(chapter["pdfViewed"], true);
    assert_eq!(chapter["timeSpentMinutes"], 3);

    let update = json!({ "completed": true, "timeSpentDeltaMinutes": -1 });
    let (status, _) = send(&app, Method::PUT, uri, Some(update)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = get(&app, "/enrollments/1/progress").await;
    assert_eq!(body["summary"]["completedChapters"], 0);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let app = test_app().await;

    let (status, body) = get(&app, "/enrollments/42/progress").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = post(&app, "/enrollments/1/chapters/99/complete", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn drop_blocks_further_events() {
    let app = test_app().await;
    post(&app, "/enrollments/1/chapters/1/complete", None).await;

    let (status, body) = post(&app, "/enrollments/1/drop", Some(json!({ "purge": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "dropped");
    assert_eq!(body["purgedRecords"], 1);

    let (status, _) = post(&app, "/enrollments/1/chapters/2/complete", None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    // No body means no purge; dropping again is fine.
    let (status, body) = post(&app, "/enrollments/1/drop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["purgedRecords"], 0);
}

#[tokio::test]
async fn completed_enrollment_cannot_be_dropped() {
    let app = test_app().await;
    for chapter in 1..=4 {
        let uri = format!("/enrollments/1/chapters/{chapter}/complete");
        post(&app, &uri, None).await;
    }

    let (status, body) = post(&app, "/enrollments/1/drop", None).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert!(body["error"].as_str().unwrap().contains("completed"));
}
