use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dnswatch_domain::{DomainError, RequestType, VerificationRequest};

/// The two terminal transitions out of `PENDING`. Both are applied with a
/// `WHERE status = 'PENDING'` guard; rows affected tells the caller whether
/// it won the race against a concurrent tick or the immediate intake check.
#[derive(Debug, Clone)]
pub enum TerminalTransition {
    ToActive { activated_at: DateTime<Utc> },
    ToExpired { fail_reason: String },
}

/// Inputs for recording a completed validation cycle.
#[derive(Debug, Clone)]
pub struct CheckResultUpdate {
    pub now: DateTime<Utc>,
    pub next_check_at: DateTime<Utc>,
    pub result_json: String,
}

/// Persists `dns_requests` rows and exposes the conditional transitions the
/// scheduler relies on to avoid double promotion/expiry.
#[async_trait]
pub trait RequestStorePort: Send + Sync {
    /// Fails with [`DomainError::DuplicateRequest`] if `(target, type)`
    /// already has a row.
    async fn insert_request(
        &self,
        target: &str,
        request_type: RequestType,
        expires_at: DateTime<Utc>,
    ) -> Result<VerificationRequest, DomainError>;

    async fn find_by_target(&self, target: &str) -> Result<Vec<VerificationRequest>, DomainError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<VerificationRequest>, DomainError>;

    /// Rows with `status = 'PENDING'` and `expires_at > now`; used by the
    /// scheduler at boot to reconstruct jobs.
    async fn find_pending_not_expired(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<VerificationRequest>, DomainError>;

    async fn find_last_created_by_target_type(
        &self,
        target: &str,
        request_type: RequestType,
    ) -> Result<Option<VerificationRequest>, DomainError>;

    /// Unconditional write of the result of a completed validation pass;
    /// clears any previous `fail_reason`. Returns rows affected (0 if the
    /// row raced out of `PENDING` before this write landed, in which case
    /// the caller must stop the job).
    async fn update_check_result(
        &self,
        id: i64,
        update: CheckResultUpdate,
    ) -> Result<u64, DomainError>;

    /// Records a sanitized `fail_reason` without touching `status`; used
    /// when the validator itself failed to run (DNS/store errors), so the
    /// job keeps ticking.
    async fn record_fail_reason(
        &self,
        id: i64,
        now: DateTime<Utc>,
        next_check_at: DateTime<Utc>,
        fail_reason: &str,
    ) -> Result<u64, DomainError>;

    /// `UPDATE ... WHERE id = ? AND status = 'PENDING'`. Returns rows
    /// affected; 0 means the row had already left `PENDING`.
    async fn conditional_transition(
        &self,
        id: i64,
        transition: TerminalTransition,
    ) -> Result<u64, DomainError>;

    /// Inserts into the secondary `domain(name, active)` table on first
    /// promotion to `ACTIVE`. Duplicate-key is not an error.
    async fn mark_domain_active(&self, target: &str) -> Result<(), DomainError>;
}
