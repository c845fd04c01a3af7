use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use dnswatch_domain::check_result::{
    MISSING_KEY_CNAME, MISSING_KEY_DKIM, MISSING_KEY_DMARC, MISSING_KEY_MX, MISSING_KEY_SPF,
};
use dnswatch_domain::config::{CnameExpectation, EmailExpectation};
use dnswatch_domain::{job_key, CheckResult, DomainError, MissingEntry, RequestType, VerificationRequest};

use crate::debounce::ReadOnlyDebounce;
use crate::ports::RequestStorePort;
use crate::validation::ValidationEngine;

#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub status: String,
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub next_check_at: Option<DateTime<Utc>>,
    pub missing: Vec<MissingEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub has_ui: bool,
    pub has_email: bool,
    pub overall_status: String,
    pub expires_at_min: Option<DateTime<Utc>>,
    pub last_checked_at_max: Option<DateTime<Utc>>,
    pub next_check_at_min: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckDnsStatus {
    pub target: String,
    pub normalized_target: String,
    pub summary: StatusSummary,
    pub ui: Option<RowView>,
    pub email: Option<RowView>,
}

/// `GET /api/checkdns/:target`: serves a target's current state without
/// ever creating a request or job. May opportunistically run a single
/// read-only, debounced DNS check when no persisted result is available.
pub struct QueryDnsStatusUseCase {
    store: Arc<dyn RequestStorePort>,
    validation: Arc<ValidationEngine>,
    debounce: Arc<ReadOnlyDebounce>,
    cname: CnameExpectation,
    email: EmailExpectation,
    min_interval_secs: u64,
}

impl QueryDnsStatusUseCase {
    pub fn new(
        store: Arc<dyn RequestStorePort>,
        validation: Arc<ValidationEngine>,
        debounce: Arc<ReadOnlyDebounce>,
        cname: CnameExpectation,
        email: EmailExpectation,
        min_interval_secs: u64,
    ) -> Self {
        Self {
            store,
            validation,
            debounce,
            cname,
            email,
            min_interval_secs,
        }
    }

    pub async fn execute(&self, target: &str) -> Result<CheckDnsStatus, DomainError> {
        let rows = self.store.find_by_target(target).await?;
        if rows.is_empty() {
            return Err(DomainError::NotFound(target.to_string()));
        }

        let ui_row = rows.iter().find(|r| r.request_type == RequestType::Ui).cloned();
        let email_row = rows.iter().find(|r| r.request_type == RequestType::Email).cloned();
        let primary_is_email = email_row.is_some();

        let now = Utc::now();

        let email_view = match &email_row {
            Some(row) => Some(self.row_view(row, target, primary_is_email, now).await),
            None => None,
        };
        let ui_view = match &ui_row {
            Some(row) => Some(self.row_view(row, target, !primary_is_email, now).await),
            None => None,
        };

        let summary = self.summarize(&ui_row, &email_row);

        Ok(CheckDnsStatus {
            target: target.to_string(),
            normalized_target: target.to_string(),
            summary,
            ui: ui_view,
            email: email_view,
        })
    }

    async fn row_view(
        &self,
        row: &VerificationRequest,
        target: &str,
        allow_live_check: bool,
        now: DateTime<Utc>,
    ) -> RowView {
        let missing = self.missing_for_row(row, target, allow_live_check, now).await;
        RowView {
            status: row.status.as_str().to_string(),
            id: row.id,
            created_at: row.created_at,
            expires_at: row.expires_at,
            last_checked_at: row.last_checked_at,
            next_check_at: row.next_check_at,
            missing,
        }
    }

    async fn missing_for_row(
        &self,
        row: &VerificationRequest,
        target: &str,
        allow_live_check: bool,
        now: DateTime<Utc>,
    ) -> Vec<MissingEntry> {
        if let Some(json) = &row.last_check_result_json {
            if let Ok(result) = serde_json::from_str::<CheckResult>(json) {
                return self.fill_gaps(result.missing, target);
            }
        }

        if allow_live_check {
            let debounced_ok = row
                .last_checked_at
                .map(|last| now.signed_duration_since(last) >= chrono::Duration::seconds(self.min_interval_secs as i64))
                .unwrap_or(true);
            let key = job_key(row.request_type, target);
            if debounced_ok && self.debounce.try_acquire(&key, now, self.min_interval_secs) {
                match self.validation.check(target).await {
                    Ok(result) => return self.fill_gaps(result.missing, target),
                    Err(e) => warn!(target = %target, error = %e, "read-only live check failed, falling back"),
                }
            }
        }

        self.synthetic_fallback(target)
    }

    /// Ensures exactly one entry for CNAME, MX, SPF, DMARC (DKIM optional)
    /// in that order, filling any key the parsed payload omitted with the
    /// synthetic fallback entry for that key.
    fn fill_gaps(&self, missing: Vec<MissingEntry>, target: &str) -> Vec<MissingEntry> {
        let fallback = self.synthetic_fallback(target);
        let mut ordered = Vec::with_capacity(fallback.len());
        for template in &fallback {
            if let Some(found) = missing.iter().find(|m| m.key == template.key) {
                ordered.push(found.clone());
            } else {
                ordered.push(template.clone());
            }
        }
        ordered
    }

    fn synthetic_fallback(&self, target: &str) -> Vec<MissingEntry> {
        let dmarc_name = dnswatch_domain::config::dmarc_name(target);
        let dkim_name = self.email.dkim_name(target);

        let cname_expected = if self.cname.uses_authorized_ip_mode() {
            self.cname
                .authorized_ips
                .iter()
                .map(|ip| ip.to_string())
                .collect::<Vec<_>>()
                .join(",")
        } else {
            self.cname.expected.clone()
        };

        vec![
            MissingEntry {
                key: MISSING_KEY_CNAME.to_string(),
                record_type: "CNAME".to_string(),
                name: target.to_string(),
                expected: cname_expected,
                found: Vec::new(),
                ok: false,
                found_truncated: false,
                expected_ips: None,
                found_ips: None,
                chain_reason: None,
            },
            MissingEntry {
                key: MISSING_KEY_MX.to_string(),
                record_type: "MX".to_string(),
                name: target.to_string(),
                expected: format!("{} {}", self.email.mx_expected_priority, self.email.mx_expected_host),
                found: Vec::new(),
                ok: false,
                found_truncated: false,
                expected_ips: None,
                found_ips: None,
                chain_reason: None,
            },
            MissingEntry {
                key: MISSING_KEY_SPF.to_string(),
                record_type: "TXT".to_string(),
                name: target.to_string(),
                expected: self.email.spf_expected.clone(),
                found: Vec::new(),
                ok: false,
                found_truncated: false,
                expected_ips: None,
                found_ips: None,
                chain_reason: None,
            },
            MissingEntry {
                key: MISSING_KEY_DMARC.to_string(),
                record_type: "TXT".to_string(),
                name: dmarc_name,
                expected: self.email.dmarc_expected.clone(),
                found: Vec::new(),
                ok: false,
                found_truncated: false,
                expected_ips: None,
                found_ips: None,
                chain_reason: None,
            },
            MissingEntry {
                key: MISSING_KEY_DKIM.to_string(),
                record_type: "CNAME".to_string(),
                name: dkim_name,
                expected: self.email.dkim_cname_expected.clone(),
                found: Vec::new(),
                ok: false,
                found_truncated: false,
                expected_ips: None,
                found_ips: None,
                chain_reason: None,
            },
        ]
    }

    fn summarize(
        &self,
        ui_row: &Option<VerificationRequest>,
        email_row: &Option<VerificationRequest>,
    ) -> StatusSummary {
        let rows: Vec<&VerificationRequest> = [ui_row, email_row].into_iter().flatten().collect();

        let overall_status = match (ui_row, email_row) {
            (None, None) => "NONE".to_string(),
            (Some(r), None) | (None, Some(r)) => r.status.as_str().to_string(),
            (Some(a), Some(b)) if a.status == b.status => a.status.as_str().to_string(),
            _ => "MIXED".to_string(),
        };

        StatusSummary {
            has_ui: ui_row.is_some(),
            has_email: email_row.is_some(),
            overall_status,
            expires_at_min: rows.iter().map(|r| r.expires_at).min(),
            last_checked_at_max: rows.iter().filter_map(|r| r.last_checked_at).max(),
            next_check_at_min: rows.iter().filter_map(|r| r.next_check_at).min(),
        }
    }
}
