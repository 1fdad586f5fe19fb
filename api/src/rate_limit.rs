use std::sync::Arc;

use dashmap::DashMap;
use time::{macros::format_description, Duration, OffsetDateTime, PrimitiveDateTime, UtcOffset};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub permit_limit: u32,
    pub window_minutes: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            permit_limit: 100,
            window_minutes: 1,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::minutes(i64::from(self.window_minutes))
    }

    pub fn retry_after_secs(&self) -> u64 {
        u64::from(self.window_minutes) * 60
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClientWindowState {
    pub request_count: u32,
    pub window_start: OffsetDateTime,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Admit,
    Reject,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub verdict: Verdict,
    pub request_count: u32,
    pub remaining: u32,
    pub reset_at: OffsetDateTime,
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        self.verdict == Verdict::Admit
    }
}

// Clones share one client map.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    cfg: RateLimitConfig,
    window: Duration,
    clients: DashMap<String, ClientWindowState>,
}

impl RateLimiter {
    pub fn new(cfg: RateLimitConfig) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                cfg,
                window: cfg.window(),
                clients: DashMap::new(),
            }),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.inner.cfg
    }

    pub fn admit(&self, client_key: &str, now: OffsetDateTime) -> Decision {
        let state = {
            let mut entry = self
                .inner
                .clients
                .entry(client_key.to_owned())
                .or_insert(ClientWindowState {
                    request_count: 0,
                    window_start: now,
                });
            let state = entry.value_mut();
            if now - state.window_start > self.inner.window {
                state.request_count = 1;
                state.window_start = now;
            } else {
                state.request_count = state.request_count.saturating_add(1);
            }
            *state
        };

        let limit = self.inner.cfg.permit_limit;
        Decision {
            verdict: if state.request_count > limit {
                Verdict::Reject
            } else {
                Verdict::Admit
            },
            request_count: state.request_count,
            remaining: limit.saturating_sub(state.request_count),
            reset_at: state
                .window_start
                .checked_add(self.inner.window)
                .unwrap_or_else(|| PrimitiveDateTime::MAX.assume_utc()),
        }
    }

    pub fn get(&self, client_key: &str) -> Option<ClientWindowState> {
        self.inner.clients.get(client_key).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.inner.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.clients.is_empty()
    }

    /// Drops clients whose window started more than `keep_windows` window
    /// lengths before `now`. Returns the number removed.
    pub fn sweep(&self, now: OffsetDateTime, keep_windows: u32) -> usize {
        let horizon = self
            .inner
            .window
            .checked_mul(i32::try_from(keep_windows.max(1)).unwrap_or(i32::MAX))
            .unwrap_or(Duration::MAX);
        let before = self.inner.clients.len();
        self.inner
            .clients
            .retain(|_, state| now - state.window_start <= horizon);
        before.saturating_sub(self.inner.clients.len())
    }
}

/// Formats a timestamp as an IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date(at: OffsetDateTime) -> String {
    let fmt = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    at.to_offset(UtcOffset::UTC)
        .format(fmt)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}
