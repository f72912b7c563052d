//! Per-client rate limiting.
//!
//! # Responsibilities
//! - Token bucket per client IP
//! - Reject excess requests with 429 and `RATE_LIMITED`
//! - Advertise limit and remaining budget in `RateLimit-*` headers
//! - Evict buckets that have been idle long enough to be full again

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::RateLimitConfig;
use crate::http::response::ApiError;
use crate::observability::metrics;

static RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("ratelimit-limit");
static RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("ratelimit-remaining");

/// A simple token bucket.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    fn refill(&mut self, capacity: f64, refill_rate: f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

/// Token buckets keyed by client.
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    limit: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            limit: max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    fn capacity(&self) -> f64 {
        self.limit as f64
    }

    fn refill_rate(&self) -> f64 {
        self.capacity() / self.window.as_secs_f64()
    }

    pub fn check(&self, key: &str) -> Decision {
        let (capacity, rate) = (self.capacity(), self.refill_rate());
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(capacity));
        bucket.refill(capacity, rate);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Decision::Allowed {
                remaining: bucket.tokens.floor() as u32,
            }
        } else {
            let wait = (1.0 - bucket.tokens) / rate;
            Decision::Limited {
                retry_after_secs: wait.ceil().max(1.0) as u64,
            }
        }
    }

    /// Drop buckets that would be full by now. Returns how many were removed.
    pub fn evict_idle(&self) -> usize {
        let (capacity, rate) = (self.capacity(), self.refill_rate());
        let now = Instant::now();
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let before = buckets.len();
        buckets.retain(|_, bucket| {
            let elapsed = now.duration_since(bucket.last_update).as_secs_f64();
            bucket.tokens + elapsed * rate < capacity
        });
        before - buckets.len()
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().expect("rate limiter mutex poisoned").len()
    }

    /// Evict idle buckets once per window until shutdown.
    pub fn spawn_eviction(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.window);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.evict_idle();
                        if evicted > 0 {
                            tracing::debug!(evicted, "Evicted idle rate limit buckets");
                        }
                    }
                    _ = shutdown.recv() => break,
                }
            }
        })
    }
}

/// Middleware enforcing the per-IP limit.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match limiter.check(&key) {
        Decision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(limiter.limit()));
            headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from(remaining));
            response
        }
        Decision::Limited { retry_after_secs } => {
            tracing::warn!(client = %key, "Rate limit exceeded");
            metrics::record_rate_limited();
            let mut response = ApiError::rate_limited(retry_after_secs).into_response();
            let headers = response.headers_mut();
            headers.insert(RATELIMIT_LIMIT.clone(), HeaderValue::from(limiter.limit()));
            headers.insert(RATELIMIT_REMAINING.clone(), HeaderValue::from(0u32));
            response
        }
    }
}
