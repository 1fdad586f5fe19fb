use std::time::Duration;

use axum::{
    http::{HeaderName, HeaderValue},
    middleware::from_fn_with_state,
    Router,
};
use time::OffsetDateTime;
use tokio::{task::JoinHandle, time::interval};
use tokio_util::sync::CancellationToken;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::debug;

use crate::{
    middleware::{rate_limit, SECURITY_HEADERS},
    rate_limit::RateLimiter,
    routes,
    state::AppState,
};

pub const SWEEP_KEEP_WINDOWS: u32 = 3;

#[derive(Clone, Default)]
pub struct AppOptions {
    pub rate_limiter: Option<RateLimiter>,
    pub cors_origin: Option<HeaderValue>,
}

/// Assembles the service. Outermost first: trace, security headers,
/// compression, rate limiter, CORS, routes.
pub fn build(state: AppState, opts: AppOptions) -> Router {
    let mut app = routes::router().with_state(state);

    if let Some(origin) = opts.cors_origin {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    if let Some(limiter) = opts.rate_limiter {
        app = app.layer(from_fn_with_state(limiter, rate_limit));
    }
    app = app.layer(CompressionLayer::new());
    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::overriding(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    app.layer(TraceLayer::new_for_http())
}

pub fn spawn_sweeper(
    limiter: RateLimiter,
    every: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        // the first tick completes immediately
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let removed = limiter.sweep(OffsetDateTime::now_utc(), SWEEP_KEEP_WINDOWS);
                    debug!(removed, remaining = limiter.len(), "swept rate limit windows");
                }
            }
        }
    })
}
