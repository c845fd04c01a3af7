use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use tracing::instrument;

use dnswatch_application::use_cases::CheckDnsStatus;
use dnswatch_domain::{normalize_target, DomainError};

use crate::errors::ApiError;
use crate::state::AppState;

fn timing_safe_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[instrument(skip(state, headers))]
pub async fn checkdns(
    State(state): State<AppState>,
    Path(target): Path<String>,
    headers: HeaderMap,
) -> Result<Json<CheckDnsStatus>, ApiError> {
    if let Some(expected) = &state.checkdns_token {
        let provided = headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !timing_safe_eq(provided.as_bytes(), expected.as_bytes()) {
            return Err(ApiError(DomainError::InvalidApiKey));
        }
    }

    let normalized = normalize_target(&target)?;
    let status = state.query.execute(&normalized).await?;
    Ok(Json(status))
}
