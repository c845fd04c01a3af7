use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current deployment accepts only `EMAIL`; `UI` is a retired alias kept so
/// historical rows still deserialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestType {
    Ui,
    Email,
}

impl RequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestType::Ui => "UI",
            RequestType::Email => "EMAIL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "UI" => Some(RequestType::Ui),
            "EMAIL" => Some(RequestType::Email),
            _ => None,
        }
    }
}

impl std::fmt::Display for RequestType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Active,
    Expired,
    Failed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Active => "ACTIVE",
            RequestStatus::Expired => "EXPIRED",
            RequestStatus::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RequestStatus::Pending),
            "ACTIVE" => Some(RequestStatus::Active),
            "EXPIRED" => Some(RequestStatus::Expired),
            "FAILED" => Some(RequestStatus::Failed),
            _ => None,
        }
    }

    /// Terminal states never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Active | RequestStatus::Expired | RequestStatus::Failed
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `dns_requests` row. Unique by `(target, request_type)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRequest {
    pub id: i64,
    pub target: Arc<str>,
    pub request_type: RequestType,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub activated_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub next_check_at: Option<DateTime<Utc>>,
    pub last_check_result_json: Option<Arc<str>>,
    pub fail_reason: Option<Arc<str>>,
    pub expires_at: DateTime<Utc>,
}

impl VerificationRequest {
    pub fn job_key(&self) -> String {
        format!("{}:{}", self.request_type.as_str(), self.target)
    }
}

pub fn job_key(request_type: RequestType, target: &str) -> String {
    format!("{}:{}", request_type.as_str(), target)
}
