use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use dnswatch_domain::DomainError;

pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DomainError::InvalidTarget(_) | DomainError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            DomainError::UnsupportedContentType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            DomainError::DuplicateRequest(_, _) => StatusCode::CONFLICT,
            DomainError::Cooldown => StatusCode::TOO_MANY_REQUESTS,
            DomainError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            DomainError::ServerBusy => StatusCode::SERVICE_UNAVAILABLE,
            DomainError::NotFound(_) => StatusCode::NOT_FOUND,
            DomainError::EndpointRemoved => StatusCode::GONE,
            DomainError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = if status.is_server_error() {
            "internal_error".to_string()
        } else {
            sanitize_client_message(&self.0.to_string())
        };

        (status, Json(json!({ "error": error }))).into_response()
    }
}

fn sanitize_client_message(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !c.is_control()).collect();
    stripped.chars().take(500).collect()
}
