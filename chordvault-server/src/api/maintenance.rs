//! Maintenance endpoints

use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ExpireResponse {
    pub removed: u64,
}

/// POST /maintenance/expire
///
/// Runs the expiry sweep now instead of waiting for the next start.
pub async fn expire(State(state): State<AppState>) -> Json<ExpireResponse> {
    let removed = state.orchestrator.sweep_expired().await;
    Json(ExpireResponse { removed })
}

pub fn maintenance_routes() -> Router<AppState> {
    Router::new().route("/maintenance/expire", post(expire))
}
