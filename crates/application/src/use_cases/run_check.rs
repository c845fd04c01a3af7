use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use dnswatch_domain::{DomainError, RequestStatus};

use crate::ports::{CheckResultUpdate, MailerPort, RequestStorePort, TerminalTransition};
use crate::sanitize::{build_result_payload, sanitize_value};
use crate::validation::ValidationEngine;

/// What a single validation pass did to the underlying row. The scheduler
/// uses this to decide whether to keep ticking a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunCheckOutcome {
    /// Promoted to `ACTIVE`; job should stop.
    Promoted,
    /// Transitioned to `EXPIRED`; job should stop.
    Expired,
    /// Row no longer exists, is no longer `PENDING`, or the conditional
    /// update raced; job should stop either way.
    Stopped,
    /// Still `PENDING`; job keeps ticking. `ok` reflects the last check.
    Continued { ok: bool },
}

/// Implements the per-tick validation contract shared by the intake
/// handler's immediate check and the job scheduler's recurring tick.
pub struct RunCheckUseCase {
    store: Arc<dyn RequestStorePort>,
    validation: Arc<ValidationEngine>,
    mailer: Arc<dyn MailerPort>,
    poll_interval_secs: u64,
    result_json_max_bytes: usize,
}

impl RunCheckUseCase {
    pub fn new(
        store: Arc<dyn RequestStorePort>,
        validation: Arc<ValidationEngine>,
        mailer: Arc<dyn MailerPort>,
        poll_interval_secs: u64,
        result_json_max_bytes: usize,
    ) -> Self {
        Self {
            store,
            validation,
            mailer,
            poll_interval_secs,
            result_json_max_bytes,
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, request_id: i64) -> Result<RunCheckOutcome, DomainError> {
        let Some(request) = self.store.find_by_id(request_id).await? else {
            return Ok(RunCheckOutcome::Stopped);
        };
        if request.status != RequestStatus::Pending {
            return Ok(RunCheckOutcome::Stopped);
        }

        let now = Utc::now();
        if request.expires_at <= now {
            let affected = self
                .store
                .conditional_transition(
                    request.id,
                    TerminalTransition::ToExpired {
                        fail_reason: "Request expired".to_string(),
                    },
                )
                .await?;
            if affected > 0 {
                info!(target = %request.target, id = request.id, "request expired");
                if let Err(e) = self
                    .mailer
                    .send_status_change(&request, RequestStatus::Expired)
                    .await
                {
                    error!(error = %e, "failed to send expiry notification");
                }
            }
            return Ok(RunCheckOutcome::Expired);
        }

        let next_check_at = now + chrono::Duration::seconds(self.poll_interval_secs as i64);

        let check = match self.validation.check(&request.target).await {
            Ok(check) => check,
            Err(e) => {
                let (reason, _) = sanitize_value(&e.to_string(), 500);
                warn!(target = %request.target, error = %reason, "validation pass failed");
                self.store
                    .record_fail_reason(request.id, now, next_check_at, &reason)
                    .await?;
                return Ok(RunCheckOutcome::Continued { ok: false });
            }
        };

        let result_json = build_result_payload(&check, self.result_json_max_bytes);
        let affected = self
            .store
            .update_check_result(
                request.id,
                CheckResultUpdate {
                    now,
                    next_check_at,
                    result_json,
                },
            )
            .await?;
        if affected == 0 {
            return Ok(RunCheckOutcome::Stopped);
        }

        if check.ok {
            let affected = self
                .store
                .conditional_transition(request.id, TerminalTransition::ToActive { activated_at: now })
                .await?;
            if affected > 0 {
                info!(target = %request.target, id = request.id, "request activated");
                let mut activated = request.clone();
                activated.status = RequestStatus::Active;
                activated.activated_at = Some(now);
                if let Err(e) = self.mailer.send_status_change(&activated, RequestStatus::Active).await {
                    error!(error = %e, "failed to send activation notification");
                }
                if let Err(e) = self.store.mark_domain_active(&request.target).await {
                    error!(error = %e, "failed to record domain as active");
                }
            }
            return Ok(RunCheckOutcome::Promoted);
        }

        Ok(RunCheckOutcome::Continued { ok: false })
    }
}
