//! HTTP surface: axum handlers, DTOs, and edge middleware (content-type
//! gating, per-IP rate limiting). Talks only to application use cases.
pub mod dto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use errors::ApiError;
pub use routes::create_api_routes;
pub use state::AppState;
