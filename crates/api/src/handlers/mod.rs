pub mod checkdns;
pub mod health;
pub mod intake;

pub use checkdns::checkdns;
pub use health::healthz;
pub use intake::{create_email_request, create_ui_request_removed};
