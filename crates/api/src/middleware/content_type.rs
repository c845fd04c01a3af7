use axum::extract::Request;
use axum::http::Method;
use axum::middleware::Next;
use axum::response::Response;

use crate::errors::ApiError;
use dnswatch_domain::DomainError;

/// `POST /request/*` without `Content-Type: application/json` is `415`,
/// except `/request/ui`, which is retired and always `410` regardless of
/// how the caller shaped the request.
pub async fn require_json_content_type(request: Request, next: Next) -> Result<Response, ApiError> {
    let path = request.uri().path();
    let needs_check = request.method() == Method::POST && path.starts_with("/request") && path != "/request/ui";

    if needs_check {
        let is_json = request
            .headers()
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or("").trim().eq_ignore_ascii_case("application/json"))
            .unwrap_or(false);

        if !is_json {
            return Err(ApiError(DomainError::UnsupportedContentType));
        }
    }

    Ok(next.run(request).await)
}
