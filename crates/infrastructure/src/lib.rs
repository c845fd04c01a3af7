//! Infrastructure layer: SQLite-backed request store, the `hickory-resolver`
//! DNS facade, and the SMTP mailer. Implements the ports the application
//! layer declares; no business rules live here.
pub mod db;
pub mod dns;
pub mod mail;

pub use db::{create_pool, SqliteRequestStore};
pub use dns::HickoryResolverFacade;
pub use mail::SmtpMailer;
