//! Rate limiting middleware.
//!
//! Authenticated routes are limited per user; public entry points (login,
//! forgot-password, webhook) per client IP.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::CurrentUser;
use governor::{clock::DefaultClock, DefaultKeyedRateLimiter, Quota, RateLimiter};
use serde_json::json;
use std::num::NonZeroU32;
use uuid::Uuid;

use crate::app::AppState;
use crate::extractors::client_ip;

/// Keys above this count trigger a sweep of idle limiter entries.
const MAX_TRACKED_KEYS: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateKey {
    User(Uuid),
    Ip(String),
}

/// Keyed limiter shared across all requests.
pub struct RateLimiterState {
    limiter: DefaultKeyedRateLimiter<RateKey>,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    /// `None` when the limit is 0 (disabled).
    pub fn new(rate_limit_per_minute: u32) -> Option<Self> {
        let per_minute = NonZeroU32::new(rate_limit_per_minute)?;
        Some(Self {
            limiter: RateLimiter::keyed(Quota::per_minute(per_minute)),
            rate_limit_per_minute,
        })
    }

    pub fn limit(&self) -> u32 {
        self.rate_limit_per_minute
    }

    /// `Err(retry_after_secs)` when the key is over its quota.
    pub fn check(&self, key: &RateKey) -> Result<(), u64> {
        if self.limiter.len() > MAX_TRACKED_KEYS {
            self.limiter.retain_recent();
        }
        self.limiter.check_key(key).map_err(|not_until| {
            let wait_time = not_until.wait_time_from(governor::clock::Clock::now(
                &DefaultClock::default(),
            ));
            wait_time.as_secs().max(1)
        })
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("tracked_keys", &self.limiter.len())
            .finish()
    }
}

/// Per-user limit. Runs after `require_user_auth`, which stores the user.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = state.rate_limiter.as_ref() else {
        return next.run(req).await;
    };
    let Some(user) = req.extensions().get::<CurrentUser>() else {
        return next.run(req).await;
    };

    if let Err(retry_after) = limiter.check(&RateKey::User(user.id)) {
        tracing::warn!(user_id = %user.id, "Rate limit exceeded");
        return rate_limited_response(limiter.limit(), retry_after);
    }

    next.run(req).await
}

/// Per-IP limit for unauthenticated entry points.
pub async fn ip_rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(limiter) = state.ip_rate_limiter.as_ref() else {
        return next.run(req).await;
    };
    let ip = client_ip(req.headers(), req.extensions()).unwrap_or_else(|| "unknown".to_string());

    if let Err(retry_after) = limiter.check(&RateKey::Ip(ip.clone())) {
        tracing::warn!(client_ip = %ip, path = %req.uri().path(), "IP rate limit exceeded");
        return rate_limited_response(limiter.limit(), retry_after);
    }

    next.run(req).await
}

fn rate_limited_response(limit: u32, retry_after: u64) -> Response {
    let body = json!({
        "error": "rate_limited",
        "message": format!("Rate limit of {} requests/minute exceeded", limit),
        "retryAfter": retry_after
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}
