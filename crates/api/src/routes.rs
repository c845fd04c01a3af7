use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::{enforce_rate_limit, require_json_content_type};
use crate::state::AppState;

pub fn create_api_routes(state: AppState) -> Router {
    Router::new()
        .route("/request/email", post(handlers::create_email_request))
        .route("/request/ui", post(handlers::create_ui_request_removed))
        .route("/api/checkdns/{target}", get(handlers::checkdns))
        .route("/healthz", get(handlers::healthz))
        .layer(middleware::from_fn(require_json_content_type))
        .layer(middleware::from_fn_with_state(state.clone(), enforce_rate_limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
