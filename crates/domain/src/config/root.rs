use std::net::IpAddr;
use std::str::FromStr;

use super::database::DatabaseConfig;
use super::dns::{CnameExpectation, DnsConfig};
use super::email::{EmailExpectation, SmtpConfig};
use super::errors::ConfigError;
use super::limits::ServiceLimits;
use super::server::ServerConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub dns: DnsConfig,
    pub cname: CnameExpectation,
    pub email: EmailExpectation,
    pub smtp: SmtpConfig,
    pub limits: ServiceLimits,
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub host: Option<String>,
}

impl Config {
    /// Loads every setting from its documented environment variable, then
    /// applies CLI overrides on top.
    pub fn from_env(overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = Self {
            server: ServerConfig {
                host: env_string("HOST")?,
                port: env_parse("PORT")?,
            },
            database: DatabaseConfig {
                host: env_string("DB_HOST")?,
                user: env_string("DB_USER")?,
                pass: env_string("DB_PASS")?,
                name: env_string("DB_NAME")?,
                port: env_parse("DB_PORT")?,
                pool_connection_limit: env_parse("DB_POOL_CONNECTION_LIMIT")?,
                pool_acquire_timeout_ms: env_parse("DB_POOL_ACQUIRE_TIMEOUT_MS")?,
                pool_connect_timeout_ms: env_parse("DB_POOL_CONNECT_TIMEOUT_MS")?,
                query_retry_count: env_parse("DB_QUERY_RETRY_COUNT")?,
                query_retry_delay_ms: env_parse("DB_QUERY_RETRY_DELAY_MS")?,
            },
            dns: DnsConfig {
                servers: env_ip_list("DNS_SERVERS")?,
                poll_interval_secs: env_parse("DNS_POLL_INTERVAL_SECONDS")?,
                job_max_age_hours: env_parse("DNS_JOB_MAX_AGE_HOURS")?,
                timeout_ms: env_parse("DNS_TIMEOUT_MS")?,
                max_records: env_parse("DNS_MAX_RECORDS")?,
                max_txt_records: env_parse("DNS_MAX_TXT_RECORDS")?,
                max_txt_length: env_parse("DNS_MAX_TXT_LENGTH")?,
                max_host_length: env_parse("DNS_MAX_HOST_LENGTH")?,
            },
            cname: CnameExpectation {
                expected: env_string("UI_CNAME_EXPECTED")?,
                authorized_ips: env_ip_list_optional("UI_CNAME_AUTHORIZED_IPS")?,
                max_chain_depth: env_parse("UI_CNAME_MAX_CHAIN_DEPTH")?,
            },
            email: EmailExpectation {
                mx_expected_host: env_string("EMAIL_MX_EXPECTED_HOST")?,
                mx_expected_priority: env_parse("EMAIL_MX_EXPECTED_PRIORITY")?,
                dkim_selector: env_string("EMAIL_DKIM_SELECTOR")?,
                dkim_cname_expected: env_string("EMAIL_DKIM_CNAME_EXPECTED")?,
                spf_expected: env_string("EMAIL_SPF_EXPECTED")?,
                dmarc_expected: env_string("EMAIL_DMARC_EXPECTED")?,
            },
            smtp: SmtpConfig {
                host: env_string("SMTP_HOST")?,
                port: env_parse("SMTP_PORT")?,
                secure: env_parse("SMTP_SECURE")?,
                user: env_string("SMTP_USER")?,
                pass: env_string("SMTP_PASS")?,
                from: env_string("SMTP_FROM")?,
                admin_email_to: env_string("ADMIN_EMAIL_TO")?,
                body_max_length: env_parse("EMAIL_BODY_MAX_LENGTH")?,
            },
            limits: ServiceLimits {
                checkdns_min_interval_secs: env_parse("CHECKDNS_MIN_INTERVAL_SECONDS")?,
                max_active_jobs: env_parse("MAX_ACTIVE_JOBS")?,
                resume_startup_jitter_ms: env_parse("RESUME_STARTUP_JITTER_MS")?,
                target_cooldown_secs: env_parse("TARGET_COOLDOWN_SECONDS")?,
                result_json_max_bytes: env_parse("RESULT_JSON_MAX_BYTES")?,
                checkdns_token: std::env::var("CHECKDNS_TOKEN").ok().filter(|v| !v.is_empty()),
            },
        };

        if let Some(port) = overrides.port {
            config.server.port = port;
        }
        if let Some(host) = overrides.host {
            config.server.host = host;
        }

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server port cannot be 0".into()));
        }
        if self.limits.max_active_jobs == 0 {
            return Err(ConfigError::Validation(
                "MAX_ACTIVE_JOBS must be at least 1".into(),
            ));
        }
        if self.dns.poll_interval_secs == 0 {
            return Err(ConfigError::Validation(
                "DNS_POLL_INTERVAL_SECONDS must be at least 1".into(),
            ));
        }
        if self.dns.job_max_age_hours == 0 {
            return Err(ConfigError::Validation(
                "DNS_JOB_MAX_AGE_HOURS must be at least 1".into(),
            ));
        }
        if self.cname.max_chain_depth == 0 {
            return Err(ConfigError::Validation(
                "UI_CNAME_MAX_CHAIN_DEPTH must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Job capacity can never exceed the store's connection pool; callers
    /// clamp at startup with this value.
    pub fn effective_max_active_jobs(&self) -> usize {
        self.limits
            .max_active_jobs
            .min(self.database.pool_connection_limit as usize)
    }
}

fn env_string(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn env_parse<T>(name: &str) -> Result<T, ConfigError>
where
    T: FromStr,
{
    let raw = env_string(name)?;
    raw.parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(name.to_string(), raw))
}

fn env_ip_list(name: &str) -> Result<Vec<IpAddr>, ConfigError> {
    let raw = env_string(name)?;
    parse_ip_csv(name, &raw)
}

fn env_ip_list_optional(name: &str) -> Result<Vec<IpAddr>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_ip_csv(name, &raw),
        _ => Ok(Vec::new()),
    }
}

fn parse_ip_csv(name: &str, raw: &str) -> Result<Vec<IpAddr>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            IpAddr::from_str(s).map_err(|_| ConfigError::InvalidValue(name.to_string(), s.to_string()))
        })
        .collect()
}
