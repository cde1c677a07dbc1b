use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub pending_count: usize,
    pub remote_printing_enabled: bool,
}

/// GET /health: liveness plus queue depth.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        pending_count: state.queue.pending_count().await,
        remote_printing_enabled: state.remote_printing(),
    })
}
