//! Per-client sliding-window rate limiting for the `/api` routes.

use crate::{errors::AppError, state::AppState};
use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::warn;

/// Remembers the request times of each client inside the current window.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: usize,
    hits: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self {
            window,
            max_requests,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Records a request from `key` and reports whether it is within the limit.
    /// Rejected requests are not recorded.
    pub fn allow(&self, key: &str) -> bool {
        self.allow_at(key, Instant::now())
    }

    fn allow_at(&self, key: &str, now: Instant) -> bool {
        let mut hits = match self.hits.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Forget clients whose whole log has aged out.
        hits.retain(|_, log| {
            log.back()
                .is_some_and(|last| now.duration_since(*last) < self.window)
        });

        let log = hits.entry(key.to_string()).or_default();
        while log
            .front()
            .is_some_and(|first| now.duration_since(*first) >= self.window)
        {
            log.pop_front();
        }
        if log.len() >= self.max_requests {
            return false;
        }
        log.push_back(now);
        true
    }
}

/// The peer address, or with `trust_proxy` the last `x-forwarded-for` hop.
/// Earlier hops come from the client and are ignored.
fn client_key(request: &Request, trust_proxy: bool) -> String {
    let forwarded = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .map(str::trim)
        .filter(|v| trust_proxy && !v.is_empty());
    if let Some(forwarded) = forwarded {
        return forwarded.to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

pub async fn rate_limit(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let key = client_key(&request, state.config.trust_proxy);
    if !state.rate_limiter.allow(&key) {
        warn!(client = %key, "Rate limit exceeded");
        return AppError::RateLimited.into_response();
    }
    next.run(request).await
}
