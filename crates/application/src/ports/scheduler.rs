use std::time::Duration;

use async_trait::async_trait;
use dnswatch_domain::VerificationRequest;

/// The use-case-facing slice of the job scheduler. The scheduler itself
/// lives in the jobs crate (it owns the job map, queue, and semaphore);
/// this port exists so the application layer can admission-check and kick
/// off jobs without depending on that crate.
#[async_trait]
pub trait JobSchedulerPort: Send + Sync {
    /// Current number of started (not queued) jobs.
    fn active_count(&self) -> usize;

    fn max_active_jobs(&self) -> usize;

    /// No-op if a job for this request's key already exists; otherwise
    /// starts it immediately or enqueues it per the admission rule.
    async fn start_for_request(&self, request: &VerificationRequest, initial_delay: Duration);
}
