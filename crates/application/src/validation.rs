use std::sync::Arc;

use dnswatch_domain::check_result::{
    MISSING_KEY_CNAME, MISSING_KEY_DKIM, MISSING_KEY_DMARC, MISSING_KEY_MX, MISSING_KEY_SPF,
};
use dnswatch_domain::config::{CnameExpectation, DnsConfig, EmailExpectation};
use dnswatch_domain::{CheckResult, DomainError, MissingEntry, Snapshot};

use crate::ports::DnsResolverPort;
use crate::sanitize::{build_snapshot_entry, normalize_for_compare};

/// Lowercase + strip trailing dot, no further validation. CNAME/MX rdata is
/// compared this way; it is not re-run through the target grammar.
fn normalize_host(s: &str) -> String {
    let trimmed = s.trim().to_ascii_lowercase();
    trimmed.strip_suffix('.').map(str::to_string).unwrap_or(trimmed)
}

pub struct ValidationEngine {
    resolver: Arc<dyn DnsResolverPort>,
    cname: CnameExpectation,
    email: EmailExpectation,
    dns: DnsConfig,
}

impl ValidationEngine {
    pub fn new(
        resolver: Arc<dyn DnsResolverPort>,
        cname: CnameExpectation,
        email: EmailExpectation,
        dns: DnsConfig,
    ) -> Self {
        Self {
            resolver,
            cname,
            email,
            dns,
        }
    }

    /// Resolves and compares the five checks for a normalized `apex`
    /// target, producing a verdict plus a sanitized snapshot of everything
    /// resolved.
    pub async fn check(&self, apex: &str) -> Result<CheckResult, DomainError> {
        let dmarc_name = dnswatch_domain::config::dmarc_name(apex);
        let dkim_name = self.email.dkim_name(apex);

        let (cname_records, dkim_cname_records, mx_records, spf_records, dmarc_records) = tokio::try_join!(
            self.resolver.resolve_cname(apex),
            self.resolver.resolve_cname(&dkim_name),
            self.resolver.resolve_mx(apex),
            self.resolver.resolve_txt(apex),
            self.resolver.resolve_txt(&dmarc_name),
        )?;

        let mut missing = Vec::with_capacity(5);
        let mut snapshot = Snapshot::default();

        let (cname_ok, cname_entry, cname_snapshot) = self
            .check_cname(apex, &cname_records)
            .await?;
        missing.push(cname_entry);
        snapshot.cname = Some(cname_snapshot);

        let mx_ok = mx_records
            .iter()
            .any(|r| r.priority == self.email.mx_expected_priority && normalize_host(&r.exchange) == normalize_host(&self.email.mx_expected_host));
        let mx_values: Vec<String> = mx_records
            .iter()
            .map(|r| format!("{} {}", r.priority, r.exchange))
            .collect();
        missing.push(MissingEntry {
            key: MISSING_KEY_MX.to_string(),
            record_type: "MX".to_string(),
            name: apex.to_string(),
            expected: format!("{} {}", self.email.mx_expected_priority, self.email.mx_expected_host),
            found: mx_values.clone(),
            ok: mx_ok,
            found_truncated: false,
            expected_ips: None,
            found_ips: None,
            chain_reason: None,
        });
        snapshot.mx = Some(build_snapshot_entry(&mx_values, self.dns.max_records, self.dns.max_host_length));

        let spf_expected_norm = normalize_for_compare(&self.email.spf_expected);
        let spf_ok = spf_records.iter().any(|r| normalize_for_compare(r) == spf_expected_norm);
        missing.push(MissingEntry {
            key: MISSING_KEY_SPF.to_string(),
            record_type: "TXT".to_string(),
            name: apex.to_string(),
            expected: self.email.spf_expected.clone(),
            found: spf_records.clone(),
            ok: spf_ok,
            found_truncated: false,
            expected_ips: None,
            found_ips: None,
            chain_reason: None,
        });
        snapshot.spf = Some(build_snapshot_entry(&spf_records, self.dns.max_txt_records, self.dns.max_txt_length));

        let dmarc_expected_norm = normalize_for_compare(&self.email.dmarc_expected);
        let dmarc_ok = dmarc_records.iter().any(|r| normalize_for_compare(r) == dmarc_expected_norm);
        missing.push(MissingEntry {
            key: MISSING_KEY_DMARC.to_string(),
            record_type: "TXT".to_string(),
            name: dmarc_name.clone(),
            expected: self.email.dmarc_expected.clone(),
            found: dmarc_records.clone(),
            ok: dmarc_ok,
            found_truncated: false,
            expected_ips: None,
            found_ips: None,
            chain_reason: None,
        });
        snapshot.dmarc = Some(build_snapshot_entry(&dmarc_records, self.dns.max_txt_records, self.dns.max_txt_length));

        let dkim_expected_norm = normalize_host(&self.email.dkim_cname_expected);
        let dkim_ok = dkim_cname_records.iter().any(|r| normalize_host(r) == dkim_expected_norm);
        missing.push(MissingEntry {
            key: MISSING_KEY_DKIM.to_string(),
            record_type: "CNAME".to_string(),
            name: dkim_name,
            expected: self.email.dkim_cname_expected.clone(),
            found: dkim_cname_records.clone(),
            ok: dkim_ok,
            found_truncated: false,
            expected_ips: None,
            found_ips: None,
            chain_reason: None,
        });
        snapshot.dkim_cname = Some(build_snapshot_entry(&dkim_cname_records, self.dns.max_records, self.dns.max_host_length));

        let ok = cname_ok && mx_ok && spf_ok && dmarc_ok && dkim_ok;

        Ok(CheckResult { ok, missing, snapshot })
    }

    async fn check_cname(
        &self,
        apex: &str,
        cname_records: &[String],
    ) -> Result<(bool, MissingEntry, dnswatch_domain::SnapshotEntry), DomainError> {
        let cname_snapshot = build_snapshot_entry(cname_records, self.dns.max_records, self.dns.max_host_length);

        if self.cname.uses_authorized_ip_mode() {
            let outcome = self
                .resolver
                .cname_chain_to_authorized_ip(apex, &self.cname.authorized_ips, self.cname.max_chain_depth)
                .await?;
            let entry = MissingEntry {
                key: MISSING_KEY_CNAME.to_string(),
                record_type: "CNAME".to_string(),
                name: apex.to_string(),
                expected: self
                    .cname
                    .authorized_ips
                    .iter()
                    .map(|ip| ip.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
                found: cname_records.to_vec(),
                ok: outcome.ok,
                found_truncated: false,
                expected_ips: Some(self.cname.authorized_ips.iter().map(|ip| ip.to_string()).collect()),
                found_ips: Some(outcome.resolved_ips.iter().map(|ip| ip.to_string()).collect()),
                chain_reason: Some(outcome.reason.as_str().to_string()),
            };
            Ok((outcome.ok, entry, cname_snapshot))
        } else {
            let expected_norm = normalize_host(&self.cname.expected);
            let ok = cname_records.iter().any(|r| normalize_host(r) == expected_norm);
            let entry = MissingEntry {
                key: MISSING_KEY_CNAME.to_string(),
                record_type: "CNAME".to_string(),
                name: apex.to_string(),
                expected: self.cname.expected.clone(),
                found: cname_records.to_vec(),
                ok,
                found_truncated: false,
                expected_ips: None,
                found_ips: None,
                chain_reason: None,
            };
            Ok((ok, entry, cname_snapshot))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::IpAddr;

    use async_trait::async_trait;

    use super::*;
    use crate::ports::ChainWalkOutcome;

    struct FixtureResolver {
        cname: Vec<String>,
        dkim_cname: Vec<String>,
        mx: Vec<MxRecord>,
        txt: Vec<String>,
        chain_outcome: Option<ChainWalkOutcome>,
    }

    impl FixtureResolver {
        fn passing() -> Self {
            Self {
                cname: vec!["expected.example.com".to_string()],
                dkim_cname: vec!["selector1.dkim.example.com".to_string()],
                mx: vec![MxRecord {
                    exchange: "mx.example.com".to_string(),
                    priority: 10,
                }],
                txt: vec![
                    "v=spf1 include:_spf.example.com ~all".to_string(),
                    "v=DMARC1; p=reject;".to_string(),
                ],
                chain_outcome: None,
            }
        }
    }

    #[async_trait]
    impl DnsResolverPort for FixtureResolver {
        async fn resolve_cname(&self, host: &str) -> Result<Vec<String>, DomainError> {
            if host.starts_with("selector1") {
                Ok(self.dkim_cname.clone())
            } else {
                Ok(self.cname.clone())
            }
        }
        async fn resolve_mx(&self, _host: &str) -> Result<Vec<MxRecord>, DomainError> {
            Ok(self.mx.clone())
        }
        async fn resolve_txt(&self, _host: &str) -> Result<Vec<String>, DomainError> {
            Ok(self.txt.clone())
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
            Ok(self.chain_outcome.clone().expect("chain_outcome not configured for this test"))
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
            servers: Vec::new(),
            poll_interval_secs: 300,
            job_max_age_hours: 24,
            timeout_ms: 2000,
            max_records: 20,
            max_txt_records: 20,
            max_txt_length: 2000,
            max_host_length: 253,
        }
    }

    fn direct_cname_expectation() -> CnameExpectation {
        CnameExpectation {
            expected: "expected.example.com".to_string(),
            authorized_ips: Vec::new(),
            max_chain_depth: 5,
        }
    }

    #[tokio::test]
    async fn all_five_checks_pass_with_matching_records() {
        let engine = ValidationEngine::new(
            Arc::new(FixtureResolver::passing()),
            direct_cname_expectation(),
            email_expectation(),
            dns_config(),
        );
        let result = engine.check("example.com").await.unwrap();
        assert!(result.ok);
        assert!(result.missing.iter().all(|m| m.ok));
    }

    #[tokio::test]
    async fn cname_mismatch_fails_only_the_cname_check() {
        let mut resolver = FixtureResolver::passing();
        resolver.cname = vec!["wrong.example.com".to_string()];
        let engine = ValidationEngine::new(Arc::new(resolver), direct_cname_expectation(), email_expectation(), dns_config());

        let result = engine.check("example.com").await.unwrap();
        assert!(!result.ok);
        let cname_entry = result.missing.iter().find(|m| m.key == "CNAME").unwrap();
        assert!(!cname_entry.ok);
        let mx_entry = result.missing.iter().find(|m| m.key == "MX").unwrap();
        assert!(mx_entry.ok);
    }

    #[tokio::test]
    async fn authorized_ip_mode_defers_to_chain_walk_outcome() {
        let mut resolver = FixtureResolver::passing();
        resolver.chain_outcome = Some(ChainWalkOutcome {
            ok: true,
            reason: ChainReason::AuthorizedIpMatch,
            chain: vec!["example.com".to_string(), "cdn.example.net".to_string()],
            resolved_ips: vec!["203.0.113.10".parse().unwrap()],
        });
        let cname = CnameExpectation {
            expected: "expected.example.com".to_string(),
            authorized_ips: vec!["203.0.113.10".parse().unwrap()],
            max_chain_depth: 5,
        };
        let engine = ValidationEngine::new(Arc::new(resolver), cname, email_expectation(), dns_config());

        let result = engine.check("example.com").await.unwrap();
        let cname_entry = result.missing.iter().find(|m| m.key == "CNAME").unwrap();
        assert!(cname_entry.ok);
        assert_eq!(cname_entry.chain_reason.as_deref(), Some("authorized_ip_match"));
    }

    #[tokio::test]
    async fn mx_priority_mismatch_fails_even_with_matching_exchange() {
        let mut resolver = FixtureResolver::passing();
        resolver.mx = vec![MxRecord {
            exchange: "mx.example.com".to_string(),
            priority: 20,
        }];
        let engine = ValidationEngine::new(Arc::new(resolver), direct_cname_expectation(), email_expectation(), dns_config());

        let result = engine.check("example.com").await.unwrap();
        assert!(!result.ok);
        let mx_entry = result.missing.iter().find(|m| m.key == "MX").unwrap();
        assert!(!mx_entry.ok);
    }

    #[tokio::test]
    async fn spf_and_dmarc_compare_after_whitespace_and_case_normalization() {
        let mut resolver = FixtureResolver::passing();
        resolver.txt = vec![
            "V=SPF1  Include:_spf.example.com   ~ALL".to_string(),
            "v=DMARC1;  P=REJECT;".to_string(),
        ];
        let engine = ValidationEngine::new(Arc::new(resolver), direct_cname_expectation(), email_expectation(), dns_config());

        let result = engine.check("example.com").await.unwrap();
        let spf_entry = result.missing.iter().find(|m| m.key == "SPF").unwrap();
        let dmarc_entry = result.missing.iter().find(|m| m.key == "DMARC").unwrap();
        assert!(spf_entry.ok);
        assert!(dmarc_entry.ok);
    }
}
