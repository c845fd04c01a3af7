use std::collections::{HashSet, VecDeque};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::proto::rr::RecordType;
use hickory_resolver::{ResolveError, TokioResolver};
use tracing::instrument;

use dnswatch_application::ports::{ChainReason, ChainWalkOutcome, DnsResolverPort, MxRecord};
use dnswatch_domain::DomainError;

/// Client-side DNS resolution backed by `hickory-resolver`, configured
/// against the operator-supplied `DNS_SERVERS` rather than the host's
/// system resolver.
pub struct HickoryResolverFacade {
    resolver: TokioResolver,
}

impl HickoryResolverFacade {
    pub fn new(servers: &[IpAddr], timeout_ms: u64) -> Self {
        let mut resolver_config = ResolverConfig::new();
        for ip in servers {
            let socket_addr = SocketAddr::new(*ip, 53);
            resolver_config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Udp));
            resolver_config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Tcp));
        }

        let mut opts = ResolverOpts::default();
        opts.timeout = Duration::from_millis(timeout_ms);
        opts.attempts = 1;

        let resolver = TokioResolver::builder_with_config(resolver_config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();

        Self { resolver }
    }

    fn classify_error(host: &str, err: ResolveError) -> DomainError {
        let text = err.to_string();
        if text.to_ascii_lowercase().contains("timed out") || text.to_ascii_lowercase().contains("timeout") {
            DomainError::DnsTimeout(host.to_string())
        } else {
            DomainError::DnsResolutionFailed(format!("{host}: {err}"))
        }
    }

    /// NXDOMAIN/NODATA resolve to an empty list; anything else propagates.
    fn is_not_found(err: &ResolveError) -> bool {
        err.to_string().to_ascii_lowercase().contains("no records found")
    }
}

#[async_trait]
impl DnsResolverPort for HickoryResolverFacade {
    #[instrument(skip(self))]
    async fn resolve_cname(&self, host: &str) -> Result<Vec<String>, DomainError> {
        match self.resolver.lookup(normalize_host(host), RecordType::CNAME).await {
            Ok(lookup) => Ok(lookup
                .record_iter()
                .filter_map(|r| r.data().as_cname().map(|c| normalize_host(&c.0.to_utf8())))
                .collect()),
            Err(e) if Self::is_not_found(&e) => Ok(Vec::new()),
            Err(e) => Err(Self::classify_error(host, e)),
        }
    }

    #[instrument(skip(self))]
    async fn resolve_mx(&self, host: &str) -> Result<Vec<MxRecord>, DomainError> {
        match self.resolver.mx_lookup(normalize_host(host)).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|mx| MxRecord {
                    exchange: normalize_host(&mx.exchange().to_utf8()),
                    priority: mx.preference(),
                })
                .collect()),
            Err(e) if Self::is_not_found(&e) => Ok(Vec::new()),
            Err(e) => Err(Self::classify_error(host, e)),
        }
    }

    #[instrument(skip(self))]
    async fn resolve_txt(&self, host: &str) -> Result<Vec<String>, DomainError> {
        match self.resolver.txt_lookup(normalize_host(host)).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|txt| {
                    txt.iter()
                        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                        .collect::<String>()
                })
                .collect()),
            Err(e) if Self::is_not_found(&e) => Ok(Vec::new()),
            Err(e) => Err(Self::classify_error(host, e)),
        }
    }

    #[instrument(skip(self))]
    async fn resolve_a4(&self, host: &str) -> Result<Vec<IpAddr>, DomainError> {
        match self.resolver.lookup(normalize_host(host), RecordType::A).await {
            Ok(lookup) => Ok(lookup.record_iter().filter_map(|r| r.data().as_a().map(|a| IpAddr::V4(a.0))).collect()),
            Err(e) if Self::is_not_found(&e) => Ok(Vec::new()),
            Err(e) => Err(Self::classify_error(host, e)),
        }
    }

    #[instrument(skip(self))]
    async fn resolve_a6(&self, host: &str) -> Result<Vec<IpAddr>, DomainError> {
        match self.resolver.lookup(normalize_host(host), RecordType::AAAA).await {
            Ok(lookup) => Ok(lookup.record_iter().filter_map(|r| r.data().as_aaaa().map(|a| IpAddr::V6(a.0))).collect()),
            Err(e) if Self::is_not_found(&e) => Ok(Vec::new()),
            Err(e) => Err(Self::classify_error(host, e)),
        }
    }

    #[instrument(skip(self))]
    async fn cname_chain_to_authorized_ip(
        &self,
        start_host: &str,
        authorized_ips: &[IpAddr],
        max_depth: u32,
    ) -> Result<ChainWalkOutcome, DomainError> {
        let authorized: HashSet<IpAddr> = authorized_ips.iter().copied().collect();
        let mut visited: HashSet<String> = HashSet::new();
        let mut chain: Vec<String> = Vec::new();
        let mut resolved_ips: Vec<IpAddr> = Vec::new();
        let mut saw_cname = false;
        let mut loop_detected = false;

        let mut frontier: VecDeque<String> = VecDeque::new();
        frontier.push_back(normalize_host(start_host));
        let mut depth = 0u32;

        loop {
            if frontier.is_empty() {
                break;
            }
            if depth >= max_depth {
                return Ok(ChainWalkOutcome {
                    ok: false,
                    reason: ChainReason::MaxChainDepthReached,
                    chain,
                    resolved_ips,
                });
            }

            let mut next_frontier: VecDeque<String> = VecDeque::new();
            for host in frontier.drain(..) {
                if visited.contains(&host) {
                    loop_detected = true;
                    continue;
                }
                visited.insert(host.clone());
                chain.push(host.clone());

                let cnames = self.resolve_cname(&host).await?;
                if !cnames.is_empty() {
                    saw_cname = true;
                    for target in cnames {
                        next_frontier.push_back(target);
                    }
                    continue;
                }

                let (v4, v6) = tokio::try_join!(self.resolve_a4(&host), self.resolve_a6(&host))?;
                for ip in v4.into_iter().chain(v6) {
                    resolved_ips.push(ip);
                    if authorized.contains(&ip) {
                        return Ok(ChainWalkOutcome {
                            ok: true,
                            reason: if saw_cname {
                                ChainReason::AuthorizedIpMatch
                            } else {
                                ChainReason::DirectIpMatch
                            },
                            chain,
                            resolved_ips,
                        });
                    }
                }
            }

            frontier = next_frontier;
            depth += 1;
        }

        if loop_detected {
            return Ok(ChainWalkOutcome {
                ok: false,
                reason: ChainReason::CnameLoopDetected,
                chain,
                resolved_ips,
            });
        }

        Ok(ChainWalkOutcome {
            ok: false,
            reason: ChainReason::AuthorizedIpNotFound,
            chain,
            resolved_ips,
        })
    }
}

fn normalize_host(host: &str) -> String {
    let lowered = host.trim().to_ascii_lowercase();
    lowered.strip_suffix('.').map(str::to_string).unwrap_or(lowered)
}
