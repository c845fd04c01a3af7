use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, instrument};

use dnswatch_application::ports::MailerPort;
use dnswatch_domain::config::SmtpConfig;
use dnswatch_domain::{DomainError, RequestStatus, VerificationRequest};

/// Strips CR/LF so a target string can never inject extra headers into the
/// outbound message.
fn strip_header_injection(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

fn cap_body(body: String, max_len: usize) -> String {
    if body.len() <= max_len {
        body
    } else {
        let mut truncated: String = body.chars().take(max_len).collect();
        truncated.push_str("...(truncated)");
        truncated
    }
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    admin_to: String,
    body_max_length: usize,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> Result<Self, DomainError> {
        let builder = if cfg.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&cfg.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
        }
        .map_err(|e| DomainError::ConfigError(format!("invalid SMTP host: {e}")))?;

        let transport = builder
            .port(cfg.port)
            .credentials(Credentials::new(cfg.user.clone(), cfg.pass.clone()))
            .build();

        Ok(Self {
            transport,
            from: cfg.from.clone(),
            admin_to: cfg.admin_email_to.clone(),
            body_max_length: cfg.body_max_length,
        })
    }

    async fn send(&self, subject: &str, body: String) -> Result<(), DomainError> {
        let subject = strip_header_injection(subject);
        let body = cap_body(strip_header_injection(&body), self.body_max_length);

        let message = Message::builder()
            .from(self.from.parse().map_err(|e| DomainError::Internal(format!("invalid from address: {e}")))?)
            .to(self
                .admin_to
                .parse()
                .map_err(|e| DomainError::Internal(format!("invalid admin_to address: {e}")))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| DomainError::Internal(format!("failed to build message: {e}")))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| DomainError::Internal(format!("smtp send failed: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl MailerPort for SmtpMailer {
    #[instrument(skip(self, request))]
    async fn send_request_created(&self, request: &VerificationRequest) -> Result<(), DomainError> {
        let subject = format!("DNS verification request created: {}", request.target);
        let body = format!(
            "A new {} verification request was created for {} (id {}), expiring at {}.",
            request.request_type, request.target, request.id, request.expires_at
        );
        if let Err(e) = self.send(&subject, body).await {
            error!(error = %e, target = %request.target, "failed to send request-created email");
            return Err(e);
        }
        Ok(())
    }

    #[instrument(skip(self, request))]
    async fn send_status_change(
        &self,
        request: &VerificationRequest,
        new_status: RequestStatus,
    ) -> Result<(), DomainError> {
        let subject = format!("DNS verification {} -> {}", request.target, new_status);
        let body = format!(
            "{} verification for {} (id {}) transitioned to {}.",
            request.request_type, request.target, request.id, new_status
        );
        if let Err(e) = self.send(&subject, body).await {
            error!(error = %e, target = %request.target, "failed to send status-change email");
            return Err(e);
        }
        Ok(())
    }
}
