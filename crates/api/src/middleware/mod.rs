pub mod content_type;
pub mod rate_limit;

pub use content_type::require_json_content_type;
pub use rate_limit::{enforce_rate_limit, RateLimiter};
