use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::errors::ApiError;
use crate::state::AppState;
use dnswatch_domain::DomainError;

const WINDOW_SECS: i64 = 60;
const MAX_REQUESTS_PER_WINDOW: u32 = 60;
const SWEEP_THRESHOLD: usize = 10_000;

struct Window {
    count: u32,
    reset_at: DateTime<Utc>,
    last_seen: DateTime<Utc>,
}

/// Per-IP sliding window: 60 requests per 60-second window, swept once the
/// map grows past 10,000 tracked IPs.
pub struct RateLimiter {
    windows: DashMap<IpAddr, Window>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { windows: DashMap::new() }
    }

    fn check(&self, ip: IpAddr, now: DateTime<Utc>) -> bool {
        let mut entry = self.windows.entry(ip).or_insert_with(|| Window {
            count: 0,
            reset_at: now + chrono::Duration::seconds(WINDOW_SECS),
            last_seen: now,
        });

        if now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + chrono::Duration::seconds(WINDOW_SECS);
        }

        entry.last_seen = now;
        entry.count += 1;
        let allowed = entry.count <= MAX_REQUESTS_PER_WINDOW;
        drop(entry);

        if self.windows.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }

        allowed
    }

    fn sweep(&self, now: DateTime<Utc>) {
        let cutoff = chrono::Duration::seconds(WINDOW_SECS * 10);
        self.windows.retain(|_, w| now.signed_duration_since(w.last_seen) < cutoff);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

pub async fn enforce_rate_limit(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let allowed = state.rate_limiter.check(addr.ip(), Utc::now());
    if !allowed {
        return Err(ApiError(DomainError::RateLimited));
    }
    Ok(next.run(request).await)
}
