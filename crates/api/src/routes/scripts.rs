//! Route definitions for script endpoints.

use axum::routing::post;
use axum::Router;

use crate::handlers::scripts;
use crate::state::AppState;

/// `POST /saveScript -> save_script`
pub fn router() -> Router<AppState> {
    Router::new().route("/saveScript", post(scripts::save_script))
}

/// `POST /executeScript -> execute_script`
pub fn blocking_router() -> Router<AppState> {
    Router::new().route("/executeScript", post(scripts::execute_script))
}
