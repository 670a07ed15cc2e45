//! Per-client fixed-window rate limiting.
//!
//! Each client key owns a window `{count, started}`. A request either opens
//! a fresh window (first request, or the old one is at least `window` old) or
//! increments the current one; once the count passes `max_requests` the
//! request is rejected until the window ends.
//!
//! Fixed windows let up to `2 * max_requests` through around a window
//! boundary. That is accepted behaviour for this limiter.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::observability::metrics;
use crate::pipeline::Middleware;

pub const X_RATELIMIT_LIMIT: &str = "x-ratelimit-limit";
pub const X_RATELIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Key used when the peer address is unknown.
const UNKNOWN_CLIENT: &str = "unknown";

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    started: Instant,
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after: Duration },
}

/// Concurrency-safe fixed-window counter keyed by client.
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Check and record one request from `key` now.
    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    /// Check and record one request from `key` at `now`.
    ///
    /// The read-check-increment runs while holding the write guard of the
    /// key's shard, so concurrent callers for one key are serialised.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut entry = self
            .windows
            .entry(key.to_owned())
            .or_insert(Window { count: 0, started: now });

        let elapsed = now.saturating_duration_since(entry.started);
        if entry.count == 0 || elapsed >= self.window {
            *entry = Window { count: 1, started: now };
            return RateDecision::Allowed {
                remaining: self.max_requests.saturating_sub(1),
            };
        }

        entry.count = entry.count.saturating_add(1);
        if entry.count > self.max_requests {
            RateDecision::Limited {
                retry_after: self.window - elapsed,
            }
        } else {
            RateDecision::Allowed {
                remaining: self.max_requests - entry.count,
            }
        }
    }

    /// Drop windows that ended before `now`. Returns how many were removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, w| now.saturating_duration_since(w.started) < self.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked client keys.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Periodically sweep stale windows until the runtime shuts down.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.tick().await;
            loop {
                interval.tick().await;
                let Some(limiter) = limiter.upgrade() else {
                    break;
                };
                let removed = limiter.sweep(Instant::now());
                if removed > 0 {
                    tracing::debug!(removed, remaining = limiter.tracked_clients(), "Swept rate limit windows");
                }
            }
        })
    }
}

/// Client key for a request: the peer IP when known.
pub fn client_key(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Pipeline stage enforcing a [`RateLimiter`].
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Middleware for RateLimit {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn handle(&self, request: Request<Body>, next: Next) -> Response {
        let key = client_key(&request);

        match self.limiter.check(&key) {
            RateDecision::Allowed { remaining } => {
                let mut response = next.run(request).await;
                let headers = response.headers_mut();
                headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limiter.max_requests()));
                headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(remaining));
                response
            }
            RateDecision::Limited { retry_after } => {
                tracing::warn!(client = %key, retry_after = ?retry_after, "Rate limit exceeded");
                metrics::record_rate_limited();
                ApiError::RateLimited { retry_after }.into_response()
            }
        }
    }
}
