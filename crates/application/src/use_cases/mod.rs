pub mod intake_email_request;
pub mod query_dns_status;
pub mod run_check;

pub use intake_email_request::{IntakeEmailRequestUseCase, IntakeOutcome};
pub use query_dns_status::{CheckDnsStatus, QueryDnsStatusUseCase, RowView, StatusSummary};
pub use run_check::{RunCheckOutcome, RunCheckUseCase};
