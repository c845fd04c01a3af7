//! Domain layer: the `dns_requests` entity, the DNS check-result shape,
//! configuration, and the pure target-normalization grammar. No I/O.
pub mod check_result;
pub mod config;
pub mod errors;
pub mod normalize;
pub mod request;

pub use check_result::{CheckResult, MissingEntry, Snapshot, SnapshotEntry};
pub use config::Config;
pub use errors::DomainError;
pub use normalize::normalize_target;
pub use request::{job_key, RequestStatus, RequestType, VerificationRequest};
