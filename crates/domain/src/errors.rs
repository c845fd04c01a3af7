use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("invalid target domain: {0}")]
    InvalidTarget(String),

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("unsupported content type")]
    UnsupportedContentType,

    #[error("Duplicate request for {0} {1}")]
    DuplicateRequest(&'static str, String),

    #[error("target is in cooldown window")]
    Cooldown,

    #[error("rate limited")]
    RateLimited,

    #[error("server busy")]
    ServerBusy,

    #[error("request not found: {0}")]
    NotFound(String),

    #[error("endpoint removed")]
    EndpointRemoved,

    #[error("invalid api key")]
    InvalidApiKey,

    #[error("dns lookup timed out: {0}")]
    DnsTimeout(String),

    #[error("dns resolution failed: {0}")]
    DnsResolutionFailed(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// True for errors whose Display text is already sanitized and safe to
    /// return to a client verbatim.
    pub fn is_client_safe(&self) -> bool {
        matches!(
            self,
            DomainError::InvalidTarget(_)
                | DomainError::InvalidBody(_)
                | DomainError::UnsupportedContentType
                | DomainError::DuplicateRequest(_, _)
                | DomainError::Cooldown
                | DomainError::RateLimited
                | DomainError::ServerBusy
                | DomainError::NotFound(_)
                | DomainError::EndpointRemoved
                | DomainError::InvalidApiKey
        )
    }
}
