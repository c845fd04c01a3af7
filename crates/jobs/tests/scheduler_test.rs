use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use dnswatch_application::ports::{
    CheckResultUpdate, ChainWalkOutcome, DnsResolverPort, MailerPort, MxRecord, RequestStorePort,
    TerminalTransition,
};
use dnswatch_application::use_cases::RunCheckUseCase;
use dnswatch_application::ValidationEngine;
use dnswatch_domain::config::{CnameExpectation, DnsConfig, EmailExpectation};
use dnswatch_domain::{DomainError, RequestStatus, RequestType, VerificationRequest};
use dnswatch_jobs::Scheduler;

struct FakeStore {
    rows: Mutex<HashMap<i64, VerificationRequest>>,
    next_id: Mutex<i64>,
}

impl FakeStore {
    fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            next_id: Mutex::new(1),
        }
    }

    async fn seed(&self, target: &str, request_type: RequestType, expires_at: DateTime<Utc>) -> VerificationRequest {
        let mut next_id = self.next_id.lock().await;
        let id = *next_id;
        *next_id += 1;
        let now = Utc::now();
        let request = VerificationRequest {
            id,
            target: target.into(),
            request_type,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
            activated_at: None,
            last_checked_at: None,
            next_check_at: None,
            last_check_result_json: None,
            fail_reason: None,
            expires_at,
        };
        self.rows.lock().await.insert(id, request.clone());
        request
    }
}

#[async_trait]
impl RequestStorePort for FakeStore {
    async fn insert_request(
        &self,
        _target: &str,
        _request_type: RequestType,
        _expires_at: DateTime<Utc>,
    ) -> Result<VerificationRequest, DomainError> {
        unimplemented!("not exercised in scheduler tests")
    }

    async fn find_by_target(&self, target: &str) -> Result<Vec<VerificationRequest>, DomainError> {
        Ok(self.rows.lock().await.values().filter(|r| &*r.target == target).cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<VerificationRequest>, DomainError> {
        Ok(self.rows.lock().await.get(&id).cloned())
    }

    async fn find_pending_not_expired(&self, now: DateTime<Utc>) -> Result<Vec<VerificationRequest>, DomainError> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|r| r.status == RequestStatus::Pending && r.expires_at > now)
            .cloned()
            .collect())
    }

    async fn find_last_created_by_target_type(
        &self,
        _target: &str,
        _request_type: RequestType,
    ) -> Result<Option<VerificationRequest>, DomainError> {
        Ok(None)
    }

    async fn update_check_result(&self, id: i64, update: CheckResultUpdate) -> Result<u64, DomainError> {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.get_mut(&id) {
            if row.status != RequestStatus::Pending {
                return Ok(0);
            }
            row.updated_at = update.now;
            row.last_checked_at = Some(update.now);
            row.next_check_at = Some(update.next_check_at);
            row.last_check_result_json = Some(update.result_json.into());
            row.fail_reason = None;
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn record_fail_reason(
        &self,
        id: i64,
        now: DateTime<Utc>,
        next_check_at: DateTime<Utc>,
        fail_reason: &str,
    ) -> Result<u64, DomainError> {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.get_mut(&id) {
            if row.status != RequestStatus::Pending {
                return Ok(0);
            }
            row.updated_at = now;
            row.last_checked_at = Some(now);
            row.next_check_at = Some(next_check_at);
            row.fail_reason = Some(fail_reason.into());
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn conditional_transition(&self, id: i64, transition: TerminalTransition) -> Result<u64, DomainError> {
        let mut rows = self.rows.lock().await;
        if let Some(row) = rows.get_mut(&id) {
            if row.status != RequestStatus::Pending {
                return Ok(0);
            }
            match transition {
                TerminalTransition::ToActive { activated_at } => {
                    row.status = RequestStatus::Active;
                    row.activated_at = Some(activated_at);
                }
                TerminalTransition::ToExpired { fail_reason } => {
                    row.status = RequestStatus::Expired;
                    row.fail_reason = Some(fail_reason.into());
                }
            }
            Ok(1)
        } else {
            Ok(0)
        }
    }

    async fn mark_domain_active(&self, _target: &str) -> Result<(), DomainError> {
        Ok(())
    }
}

struct FakeMailer;

#[async_trait]
impl MailerPort for FakeMailer {
    async fn send_request_created(&self, _request: &VerificationRequest) -> Result<(), DomainError> {
        Ok(())
    }

    async fn send_status_change(&self, _request: &VerificationRequest, _new_status: RequestStatus) -> Result<(), DomainError> {
        Ok(())
    }
}

/// Always reports every record present and matching; used for the
/// promotion scenario.
struct AlwaysPassingResolver;

#[async_trait]
impl DnsResolverPort for AlwaysPassingResolver {
    async fn resolve_cname(&self, _host: &str) -> Result<Vec<String>, DomainError> {
        Ok(vec!["expected.example.com".to_string()])
    }

    async fn resolve_mx(&self, _host: &str) -> Result<Vec<MxRecord>, DomainError> {
        Ok(vec![MxRecord {
            exchange: "mx.example.com".to_string(),
            priority: 10,
        }])
    }

    async fn resolve_txt(&self, _host: &str) -> Result<Vec<String>, DomainError> {
        Ok(vec!["v=spf1 include:_spf.example.com ~all".to_string()])
    }

    async fn resolve_a4(&self, _host: &str) -> Result<Vec<IpAddr>, DomainError> {
        Ok(Vec::new())
    }

    async fn resolve_a6(&self, _host: &str) -> Result<Vec<IpAddr>, DomainError> {
        Ok(Vec::new())
    }

    async fn cname_chain_to_authorized_ip(
        &self,
        _start_host: &str,
        _authorized_ips: &[IpAddr],
        _max_depth: u32,
    ) -> Result<ChainWalkOutcome, DomainError> {
        unimplemented!("direct CNAME mode only in these tests")
    }
}

/// Never reports a matching record; used for the expiry scenario where the
/// job should keep ticking until the row's TTL elapses.
struct NeverPassingResolver;

#[async_trait]
impl DnsResolverPort for NeverPassingResolver {
    async fn resolve_cname(&self, _host: &str) -> Result<Vec<String>, DomainError> {
        Ok(Vec::new())
    }

    async fn resolve_mx(&self, _host: &str) -> Result<Vec<MxRecord>, DomainError> {
        Ok(Vec::new())
    }

    async fn resolve_txt(&self, _host: &str) -> Result<Vec<String>, DomainError> {
        Ok(Vec::new())
    }

    async fn resolve_a4(&self, _host: &str) -> Result<Vec<IpAddr>, DomainError> {
        Ok(Vec::new())
    }

    async fn resolve_a6(&self, _host: &str) -> Result<Vec<IpAddr>, DomainError> {
        Ok(Vec::new())
    }

    async fn cname_chain_to_authorized_ip(
        &self,
        _start_host: &str,
        _authorized_ips: &[IpAddr],
        _max_depth: u32,
    ) -> Result<ChainWalkOutcome, DomainError> {
        unimplemented!("direct CNAME mode only in these tests")
    }
}

fn email_expectation() -> EmailExpectation {
    EmailExpectation {
        mx_expected_host: "mx.example.com".to_string(),
        mx_expected_priority: 10,
        dkim_selector: "selector1".to_string(),
        dkim_cname_expected: "selector1.dkim.example.com".to_string(),
        spf_expected: "v=spf1 include:_spf.example.com ~all".to_string(),
        dmarc_expected: "v=DMARC1; p=reject;".to_string(),
    }
}

fn dns_config() -> DnsConfig {
    DnsConfig {
        servers: vec!["1.1.1.1".parse().unwrap()],
        poll_interval_secs: 1,
        job_max_age_hours: 24,
        timeout_ms: 2000,
        max_records: 20,
        max_txt_records: 20,
        max_txt_length: 2000,
        max_host_length: 253,
    }
}

fn cname_expectation() -> CnameExpectation {
    CnameExpectation {
        expected: "expected.example.com".to_string(),
        authorized_ips: Vec::new(),
        max_chain_depth: 5,
    }
}

#[tokio::test(start_paused = true)]
async fn promotes_request_once_all_records_match() {
    let concrete_store = FakeStore::new();
    let request = concrete_store
        .seed("good.example.com", RequestType::Email, Utc::now() + chrono::Duration::hours(1))
        .await;
    let store: Arc<dyn RequestStorePort> = Arc::new(concrete_store);

    let resolver: Arc<dyn DnsResolverPort> = Arc::new(AlwaysPassingResolver);
    let validation = Arc::new(ValidationEngine::new(resolver, cname_expectation(), email_expectation(), dns_config()));
    let mailer: Arc<dyn MailerPort> = Arc::new(FakeMailer);
    let run_check = Arc::new(RunCheckUseCase::new(store.clone(), validation, mailer, 1, 65536));

    let scheduler = Scheduler::new(store.clone(), run_check, 10, 1, 0, CancellationToken::new());
    dnswatch_application::ports::JobSchedulerPort::start_for_request(&scheduler, &request, Duration::ZERO).await;

    tokio::time::sleep(Duration::from_secs(3)).await;

    let row = store.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(row.status, RequestStatus::Active);
}

#[tokio::test(start_paused = true)]
async fn expires_request_once_ttl_elapses() {
    let concrete_store = FakeStore::new();
    let request = concrete_store
        .seed("bad.example.com", RequestType::Email, Utc::now() + chrono::Duration::seconds(2))
        .await;
    let store: Arc<dyn RequestStorePort> = Arc::new(concrete_store);

    let resolver: Arc<dyn DnsResolverPort> = Arc::new(NeverPassingResolver);
    let validation = Arc::new(ValidationEngine::new(resolver, cname_expectation(), email_expectation(), dns_config()));
    let mailer: Arc<dyn MailerPort> = Arc::new(FakeMailer);
    let run_check = Arc::new(RunCheckUseCase::new(store.clone(), validation, mailer, 1, 65536));

    let scheduler = Scheduler::new(store.clone(), run_check, 10, 1, 0, CancellationToken::new());
    dnswatch_application::ports::JobSchedulerPort::start_for_request(&scheduler, &request, Duration::ZERO).await;

    tokio::time::sleep(Duration::from_secs(4)).await;

    let row = store.find_by_id(request.id).await.unwrap().unwrap();
    assert_eq!(row.status, RequestStatus::Expired);
}
