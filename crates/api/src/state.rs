use std::sync::Arc;
use std::time::Instant;

use dnswatch_application::use_cases::{IntakeEmailRequestUseCase, QueryDnsStatusUseCase};

use crate::middleware::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<IntakeEmailRequestUseCase>,
    pub query: Arc<QueryDnsStatusUseCase>,
    pub checkdns_token: Option<Arc<str>>,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Arc<Instant>,
}
