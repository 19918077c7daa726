pub mod health;
pub mod jobs;
pub mod packages;
pub mod scripts;

use axum::Router;

use crate::state::AppState;

/// Control-plane routes that answer promptly.
///
/// ```text
/// POST /saveScript        save (or replace) a script
/// POST /queueJobs         enqueue background jobs
/// POST /inspectPackages   report installed vs latest package versions
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(scripts::router())
        .merge(jobs::router())
        .merge(packages::router())
}

/// Control-plane routes that hold the request open until the work is done.
///
/// ```text
/// POST /executeScript     run a script and return its result
/// POST /installPackages   reconcile third-party packages
/// ```
pub fn blocking_routes() -> Router<AppState> {
    Router::new()
        .merge(scripts::blocking_router())
        .merge(packages::blocking_router())
}
