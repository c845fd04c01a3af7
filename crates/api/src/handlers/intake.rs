use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use tracing::instrument;

use crate::dto::{IntakeRequestBody, IntakeResponse};
use crate::errors::ApiError;
use crate::state::AppState;

#[instrument(skip(state))]
pub async fn create_email_request(
    State(state): State<AppState>,
    Json(body): Json<IntakeRequestBody>,
) -> Result<(StatusCode, Json<IntakeResponse>), ApiError> {
    let outcome = state.intake.execute(&body.target).await?;

    let status_code = if outcome.promoted { StatusCode::OK } else { StatusCode::ACCEPTED };

    Ok((
        status_code,
        Json(IntakeResponse {
            id: outcome.request.id,
            target: outcome.request.target.to_string(),
            request_type: outcome.request.request_type.as_str().to_string(),
            status: outcome.request.status.as_str().to_string(),
            expires_at: outcome.request.expires_at,
        }),
    ))
}

/// `POST /request/ui`: the endpoint is retired, always `410`.
pub async fn create_ui_request_removed() -> ApiError {
    ApiError(dnswatch_domain::DomainError::EndpointRemoved)
}
