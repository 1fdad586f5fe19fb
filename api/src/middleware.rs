use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{
        header::{HeaderName, CONTENT_TYPE, RETRY_AFTER},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use time::OffsetDateTime;
use tracing::warn;

use crate::rate_limit::{http_date, RateLimiter};

pub const REJECTION_BODY: &str = "Rate limit exceeded. Please try again later.";

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");
const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

pub const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
];

/// Derives the rate-limit key: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the peer address, then `"unknown"`.
pub fn client_key(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let header = |name: &HeaderName| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header(&X_FORWARDED_FOR) {
        let first = forwarded.split(',').next().unwrap_or_default().trim();
        if !first.is_empty() {
            return first.to_owned();
        }
    }
    if let Some(real_ip) = header(&X_REAL_IP) {
        return real_ip.to_owned();
    }
    match remote {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_owned(),
    }
}

pub async fn rate_limit(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = client_key(request.headers(), remote);
    let decision = limiter.admit(&key, OffsetDateTime::now_utc());
    let cfg = limiter.config();

    if !decision.is_admitted() {
        warn!(
            client = %key,
            request_count = decision.request_count,
            "rate limit exceeded"
        );
        crate::metrics::record_rejected();
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [
                (RETRY_AFTER, cfg.retry_after_secs().to_string()),
                (CONTENT_TYPE, "text/plain; charset=utf-8".to_owned()),
            ],
            REJECTION_BODY,
        )
            .into_response();
    }

    crate::metrics::record_admitted();
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(cfg.permit_limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining));
    if let Ok(reset) = HeaderValue::from_str(&http_date(decision.reset_at)) {
        headers.insert(X_RATELIMIT_RESET, reset);
    }
    response
}
