use std::net::IpAddr;

use async_trait::async_trait;
use dnswatch_domain::DomainError;

/// One `MX` record: target exchange host and its preference value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxRecord {
    pub exchange: String,
    pub priority: u16,
}

/// Why a CNAME-chain-to-authorized-IP walk succeeded or failed, in the
/// priority order failures are reported: `max_chain_depth_reached` beats
/// `cname_loop_detected` beats `authorized_ip_not_found`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainReason {
    DirectIpMatch,
    AuthorizedIpMatch,
    MaxChainDepthReached,
    CnameLoopDetected,
    AuthorizedIpNotFound,
}

impl ChainReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainReason::DirectIpMatch => "direct_ip_match",
            ChainReason::AuthorizedIpMatch => "authorized_ip_match",
            ChainReason::MaxChainDepthReached => "max_chain_depth_reached",
            ChainReason::CnameLoopDetected => "cname_loop_detected",
            ChainReason::AuthorizedIpNotFound => "authorized_ip_not_found",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChainWalkOutcome {
    pub ok: bool,
    pub reason: ChainReason,
    pub chain: Vec<String>,
    pub resolved_ips: Vec<IpAddr>,
}

/// Typed, timeout-bounded, NXDOMAIN-tolerant DNS resolution.
///
/// NXDOMAIN/NODATA resolve to an empty `Vec` (success, not an error).
/// A timeout surfaces as [`DomainError::DnsTimeout`]; anything else
/// propagates as [`DomainError::DnsResolutionFailed`].
#[async_trait]
pub trait DnsResolverPort: Send + Sync {
    async fn resolve_cname(&self, host: &str) -> Result<Vec<String>, DomainError>;
    async fn resolve_mx(&self, host: &str) -> Result<Vec<MxRecord>, DomainError>;
    async fn resolve_txt(&self, host: &str) -> Result<Vec<String>, DomainError>;
    async fn resolve_a4(&self, host: &str) -> Result<Vec<IpAddr>, DomainError>;
    async fn resolve_a6(&self, host: &str) -> Result<Vec<IpAddr>, DomainError>;

    /// Breadth-first CNAME walk from `start_host` to an authorized IP.
    /// Only meaningful when `authorized_ips` is non-empty; callers gate on
    /// that before invoking it.
    async fn cname_chain_to_authorized_ip(
        &self,
        start_host: &str,
        authorized_ips: &[IpAddr],
        max_depth: u32,
    ) -> Result<ChainWalkOutcome, DomainError>;
}
