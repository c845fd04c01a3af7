use async_trait::async_trait;
use dnswatch_domain::{DomainError, RequestStatus, VerificationRequest};

/// Outbound email notifications. Both messages are sanitized (CRLF header
/// injection stripped, body capped) by the implementation before sending;
/// failures here are logged by the caller and never fail the request.
#[async_trait]
pub trait MailerPort: Send + Sync {
    async fn send_request_created(&self, request: &VerificationRequest) -> Result<(), DomainError>;

    async fn send_status_change(
        &self,
        request: &VerificationRequest,
        new_status: RequestStatus,
    ) -> Result<(), DomainError>;
}
