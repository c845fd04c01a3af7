use axum::extract::State;
use axum::Json;

use crate::dto::HealthResponse;
use crate::state::AppState;

pub async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}
