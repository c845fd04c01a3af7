#[derive(Debug, Clone)]
pub struct ServiceLimits {
    pub checkdns_min_interval_secs: u64,
    pub max_active_jobs: usize,
    pub resume_startup_jitter_ms: u64,
    pub target_cooldown_secs: u64,
    pub result_json_max_bytes: usize,
    pub checkdns_token: Option<String>,
}
