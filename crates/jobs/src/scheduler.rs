use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use dnswatch_application::ports::{JobSchedulerPort, RequestStorePort};
use dnswatch_application::use_cases::{RunCheckOutcome, RunCheckUseCase};
use dnswatch_domain::VerificationRequest;

struct QueuedJob {
    request_id: i64,
    key: String,
    initial_delay: Duration,
}

struct Inner {
    store: Arc<dyn RequestStorePort>,
    run_check: Arc<RunCheckUseCase>,
    jobs: DashMap<String, CancellationToken>,
    queue: Mutex<VecDeque<QueuedJob>>,
    queued_keys: Mutex<HashSet<String>>,
    active_count: AtomicUsize,
    // Single atomic admission gate: a permit must be acquired before a job
    // is spawned and counted, closing the check-then-act race a plain
    // `active_count.load() < max_active_jobs` comparison leaves open.
    admission: Arc<Semaphore>,
    max_active_jobs: usize,
    poll_interval_secs: u64,
    resume_startup_jitter_ms: u64,
    shutdown: CancellationToken,
}

/// Owns the in-memory job map: at most `max_active_jobs` tickers run at
/// once, everything past that waits in a FIFO queue until a slot frees up.
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn RequestStorePort>,
        run_check: Arc<RunCheckUseCase>,
        max_active_jobs: usize,
        poll_interval_secs: u64,
        resume_startup_jitter_ms: u64,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                run_check,
                jobs: DashMap::new(),
                queue: Mutex::new(VecDeque::new()),
                queued_keys: Mutex::new(HashSet::new()),
                active_count: AtomicUsize::new(0),
                admission: Arc::new(Semaphore::new(max_active_jobs)),
                max_active_jobs,
                poll_interval_secs,
                resume_startup_jitter_ms,
                shutdown,
            }),
        }
    }

    /// Reconstructs in-flight jobs at boot: every `PENDING` row that has
    /// not yet expired gets a fresh job, staggered by jitter so they don't
    /// all tick in lockstep.
    #[instrument(skip(self))]
    pub async fn resume(&self) {
        let now = chrono::Utc::now();
        let pending = match self.inner.store.find_pending_not_expired(now).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "failed to load pending requests at boot");
                return;
            }
        };

        let jitter_cap = self
            .inner
            .resume_startup_jitter_ms
            .min(self.inner.poll_interval_secs.saturating_mul(1000).saturating_sub(100));

        info!(count = pending.len(), "resuming pending requests");
        for request in pending {
            let jitter_ms = if jitter_cap == 0 { 0 } else { fastrand::u64(..=jitter_cap) };
            self.start_for_request(&request, Duration::from_millis(jitter_ms)).await;
        }
    }
}

impl Inner {
    /// Spawns a job task holding `permit` for its entire lifetime; the
    /// permit returns to the semaphore when the task ends, which is the
    /// only place `active_count` changes.
    fn spawn_job(
        self: &Arc<Self>,
        request_id: i64,
        key: String,
        initial_delay: Duration,
        permit: tokio::sync::OwnedSemaphorePermit,
    ) {
        let token = self.shutdown.child_token();
        self.jobs.insert(key.clone(), token.clone());
        self.active_count.fetch_add(1, Ordering::SeqCst);

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let _permit = permit;
            if !initial_delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(initial_delay) => {}
                    _ = token.cancelled() => {
                        inner.finish_job(&key);
                        return;
                    }
                }
            }

            loop {
                match inner.run_check.execute(request_id).await {
                    Ok(RunCheckOutcome::Continued { .. }) => {}
                    Ok(outcome) => {
                        info!(target = %key, outcome = outcome_label(&outcome), "job stopping");
                        break;
                    }
                    Err(e) => {
                        warn!(target = %key, error = %e, "job tick errored, will retry next interval");
                    }
                }

                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(inner.poll_interval_secs)) => {}
                    _ = token.cancelled() => break,
                }
            }

            inner.finish_job(&key);
        });
    }

    fn finish_job(self: &Arc<Self>, key: &str) {
        self.jobs.remove(key);
        self.active_count.fetch_sub(1, Ordering::SeqCst);
        self.drain_queue();
    }

    fn drain_queue(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let Ok(permit) = Arc::clone(&inner.admission).try_acquire_owned() else {
                return;
            };
            let next = {
                let mut queue = inner.queue.lock().await;
                queue.pop_front()
            };
            match next {
                Some(job) => {
                    inner.queued_keys.lock().await.remove(&job.key);
                    inner.spawn_job(job.request_id, job.key, job.initial_delay, permit);
                }
                None => drop(permit),
            }
        });
    }
}

fn outcome_label(outcome: &RunCheckOutcome) -> &'static str {
    match outcome {
        RunCheckOutcome::Promoted => "Promoted",
        RunCheckOutcome::Expired => "Expired",
        RunCheckOutcome::Stopped => "Stopped",
        RunCheckOutcome::Continued { .. } => "Continued",
    }
}

#[async_trait]
impl JobSchedulerPort for Scheduler {
    fn active_count(&self) -> usize {
        self.inner.active_count.load(Ordering::SeqCst)
    }

    fn max_active_jobs(&self) -> usize {
        self.inner.max_active_jobs
    }

    #[instrument(skip(self, request))]
    async fn start_for_request(&self, request: &VerificationRequest, initial_delay: Duration) {
        let key = request.job_key();
        if self.inner.jobs.contains_key(&key) {
            return;
        }

        if let Ok(permit) = Arc::clone(&self.inner.admission).try_acquire_owned() {
            self.inner.spawn_job(request.id, key, initial_delay, permit);
            return;
        }

        let mut queued_keys = self.inner.queued_keys.lock().await;
        if queued_keys.insert(key.clone()) {
            self.inner.queue.lock().await.push_back(QueuedJob {
                request_id: request.id,
                key,
                initial_delay,
            });
        }
    }
}
