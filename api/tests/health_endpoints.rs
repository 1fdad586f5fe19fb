mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use quickcrm_api::app::{self, AppOptions};
use quickcrm_bootstrap::startup::BootstrapPhase;
use serde_json::Value;
use tower::ServiceExt;

async fn get(app: &Router, uri: &str) -> (StatusCode, axum::http::HeaderMap, Value) {
    let res = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, headers, json)
}

#[tokio::test]
async fn healthz_and_live_always_answer() {
    let (state, _phase) = common::offline_state();
    let app = app::build(state, AppOptions::default());

    let (status, headers, body) = get(&app, "/healthz").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(headers
        .get("etag")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|etag| etag.starts_with("W/\"")));
    assert_eq!(
        headers.get("referrer-policy").unwrap(),
        "strict-origin-when-cross-origin"
    );

    let (status, _, body) = get(&app, "/health/live").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "alive");
}

#[tokio::test]
async fn readiness_follows_bootstrap_phase() {
    let (state, phase) = common::offline_state();
    let app = app::build(state, AppOptions::default());

    let (status, _, body) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["phase"], "idle");

    phase.send_replace(BootstrapPhase::Seeding);
    let (status, _, body) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["phase"], "seeding");

    phase.send_replace(BootstrapPhase::Ready);
    let (status, _, body) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");

    phase.send_replace(BootstrapPhase::Terminal);
    let (status, _, _) = get(&app, "/health/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn health_reports_unreachable_database() {
    let (state, _phase) = common::offline_state();
    let app = app::build(state, AppOptions::default());

    let (status, _, body) = get(&app, "/health").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "Unhealthy");
    assert_eq!(body["bootstrap"], "idle");
    assert_eq!(body["checks"][0]["name"], "database");
}

#[tokio::test]
async fn api_docs_render_as_json() {
    let (state, _phase) = common::offline_state();
    let app = app::build(state, AppOptions::default());

    let (status, _, body) = get(&app, "/api-docs").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "QuickCRM API");
    assert!(body["paths"]["/health/ready"].is_object());
}

#[tokio::test]
async fn metrics_without_recorder_is_not_found() {
    let (state, _phase) = common::offline_state();
    let app = app::build(state, AppOptions::default());

    let (status, _, _) = get(&app, "/metrics").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
