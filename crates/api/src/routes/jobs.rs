use axum::routing::post;
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// `POST /queueJobs -> queue_jobs`
pub fn router() -> Router<AppState> {
    Router::new().route("/queueJobs", post(jobs::queue_jobs))
}
