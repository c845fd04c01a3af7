pub mod dns_resolver;
pub mod mailer;
pub mod request_store;
pub mod scheduler;

pub use dns_resolver::{ChainReason, ChainWalkOutcome, DnsResolverPort, MxRecord};
pub use mailer::MailerPort;
pub use request_store::{CheckResultUpdate, RequestStorePort, TerminalTransition};
pub use scheduler::JobSchedulerPort;
