use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, instrument};

use dnswatch_domain::{normalize_target, DomainError, RequestType, VerificationRequest};

use crate::ports::{JobSchedulerPort, MailerPort, RequestStorePort};
use crate::use_cases::run_check::{RunCheckOutcome, RunCheckUseCase};

#[derive(Debug, Clone)]
pub struct IntakeOutcome {
    pub request: VerificationRequest,
    pub promoted: bool,
}

/// `POST /request/email`: validate, enforce cooldown and job capacity,
/// insert the row, run an immediate check, and either promote inline or
/// start the background job.
pub struct IntakeEmailRequestUseCase {
    store: Arc<dyn RequestStorePort>,
    mailer: Arc<dyn MailerPort>,
    scheduler: Arc<dyn JobSchedulerPort>,
    run_check: Arc<RunCheckUseCase>,
    job_max_age_hours: u64,
    target_cooldown_secs: u64,
}

impl IntakeEmailRequestUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn RequestStorePort>,
        mailer: Arc<dyn MailerPort>,
        scheduler: Arc<dyn JobSchedulerPort>,
        run_check: Arc<RunCheckUseCase>,
        job_max_age_hours: u64,
        target_cooldown_secs: u64,
    ) -> Self {
        Self {
            store,
            mailer,
            scheduler,
            run_check,
            job_max_age_hours,
            target_cooldown_secs,
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, raw_target: &str) -> Result<IntakeOutcome, DomainError> {
        let target = normalize_target(raw_target)?;

        if self.scheduler.active_count() >= self.scheduler.max_active_jobs() {
            return Err(DomainError::ServerBusy);
        }

        let now = Utc::now();
        if let Some(last) = self
            .store
            .find_last_created_by_target_type(&target, RequestType::Email)
            .await?
        {
            let elapsed = now.signed_duration_since(last.created_at);
            if elapsed < chrono::Duration::seconds(self.target_cooldown_secs as i64) {
                return Err(DomainError::Cooldown);
            }
        }

        let expires_at = now + chrono::Duration::hours(self.job_max_age_hours as i64);
        let request = self
            .store
            .insert_request(&target, RequestType::Email, expires_at)
            .await?;

        if let Err(e) = self.mailer.send_request_created(&request).await {
            error!(error = %e, target = %target, "failed to send request-created notification");
        }

        match self.run_check.execute(request.id).await {
            Ok(RunCheckOutcome::Promoted) => {
                let refreshed = self.store.find_by_id(request.id).await?.unwrap_or(request);
                info!(target = %target, "immediate check passed, promoted to ACTIVE");
                Ok(IntakeOutcome {
                    request: refreshed,
                    promoted: true,
                })
            }
            Ok(_) => {
                self.scheduler.start_for_request(&request, Duration::ZERO).await;
                let refreshed = self.store.find_by_id(request.id).await?.unwrap_or(request);
                Ok(IntakeOutcome {
                    request: refreshed,
                    promoted: false,
                })
            }
            Err(e) => {
                error!(error = %e, target = %target, "immediate check failed, deferring to background job");
                self.scheduler.start_for_request(&request, Duration::ZERO).await;
                Ok(IntakeOutcome {
                    request,
                    promoted: false,
                })
            }
        }
    }
}
