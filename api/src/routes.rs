use std::time::Instant;

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use tracing::debug;

use crate::{
    state::AppState,
    util::{json_err, json_ok, json_with_status},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/health", get(health))
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
        .route("/metrics", get(metrics))
        .route("/api-docs", get(openapi_docs))
}

pub async fn healthz() -> Response {
    json_ok(&serde_json::json!({"status": "ok"}))
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: &'static str,
    pub status: &'static str,
    pub description: String,
    pub duration_ms: f64,
}

#[derive(Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub bootstrap: String,
    pub checks: Vec<HealthCheck>,
    pub total_duration_ms: f64,
}

pub async fn health(State(st): State<AppState>) -> Response {
    let started = Instant::now();
    let (healthy, description) = match st.store.can_connect().await {
        Ok(true) => (true, "Database connection is healthy".to_owned()),
        Ok(false) => (false, "Database connection failed".to_owned()),
        Err(err) => {
            debug!(error = %format!("{err:#}"), "health probe failed");
            (false, format!("Database connection failed: {err:#}"))
        }
    };
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    let status = if healthy { "Healthy" } else { "Unhealthy" };

    let report = HealthReport {
        status,
        bootstrap: st.bootstrap_phase().to_string(),
        checks: vec![HealthCheck {
            name: "database",
            status,
            description,
            duration_ms: elapsed_ms,
        }],
        total_duration_ms: elapsed_ms,
    };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    json_with_status(code, &report)
}

pub async fn live() -> Response {
    json_ok(&serde_json::json!({"status": "alive"}))
}

pub async fn ready(State(st): State<AppState>) -> Response {
    let phase = st.bootstrap_phase();
    if phase.is_ready() {
        json_ok(&serde_json::json!({"status": "ready"}))
    } else {
        json_with_status(
            StatusCode::SERVICE_UNAVAILABLE,
            &serde_json::json!({"status": "not_ready", "phase": phase.to_string()}),
        )
    }
}

pub async fn metrics(State(st): State<AppState>) -> Response {
    match &st.metrics {
        Some(handle) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => json_err(StatusCode::NOT_FOUND, "metrics disabled"),
    }
}

pub async fn openapi_docs() -> Response {
    let body = include_str!("../openapi.yaml");
    match serde_yaml::from_str::<serde_json::Value>(body) {
        Ok(doc) => json_ok(&doc),
        Err(err) => json_err(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("openapi document invalid: {err}"),
        ),
    }
}
