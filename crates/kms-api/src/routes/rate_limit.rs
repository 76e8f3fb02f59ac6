//! Per-IP token-bucket rate limiting, grounded on `citadel-api`'s
//! `RateLimiter`/`TokenBucket` and its interval-driven bucket eviction.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use tokio::sync::Mutex;

use crate::state::Shared;

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

/// A token bucket per remote IP, refilled continuously at `rps` up to
/// `burst`.
pub struct RateLimiter {
    buckets: Mutex<HashMap<IpAddr, TokenBucket>>,
    rps: f64,
    burst: u32,
}

impl RateLimiter {
    /// Build a limiter allowing `rps` requests/second per IP, bursting up
    /// to `burst`.
    #[must_use]
    pub fn new(rps: f64, burst: u32) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            rps,
            burst,
        }
    }

    async fn check(&self, ip: IpAddr) -> bool {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        let bucket = buckets.entry(ip).or_insert(TokenBucket {
            tokens: self.burst as f64,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rps).min(self.burst as f64);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drop buckets idle for more than five minutes, so long-running
    /// processes don't accumulate one entry per IP ever seen.
    pub async fn evict_idle(&self) {
        let mut buckets = self.buckets.lock().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| now.duration_since(bucket.last_refill).as_secs() < 300);
    }
}

pub async fn rate_limit_middleware(
    State(state): State<Shared>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    req: axum::extract::Request,
    next: Next,
) -> impl IntoResponse {
    if req.uri().path() == "/health" {
        return next.run(req).await.into_response();
    }

    if !state.rate_limiter.check(addr.ip()).await {
        tracing::warn!(ip = %addr.ip(), path = %req.uri().path(), "rate limit exceeded");
        return (StatusCode::TOO_MANY_REQUESTS, "rate limit exceeded").into_response();
    }

    next.run(req).await.into_response()
}
