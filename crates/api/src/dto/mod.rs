use serde::{Deserialize, Serialize};

/// `POST /request/email` body. Any key other than `target` is a `400`, so
/// unknown fields are rejected rather than silently ignored.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntakeRequestBody {
    pub target: String,
}

#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub id: i64,
    pub target: String,
    #[serde(rename = "type")]
    pub request_type: String,
    pub status: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

#[derive(Debug, Serialize)]
pub struct EndpointRemovedResponse {
    pub error: &'static str,
    pub message: &'static str,
}
