use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use njinn_worker::QueueStats;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Job queue occupancy.
    pub queue: QueueStats,
}

/// GET /health -- returns service and queue health.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.queue.is_closed() {
        "shutting_down"
    } else {
        "ok"
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        queue: state.queue.stats(),
    })
}

/// Mount health check routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
