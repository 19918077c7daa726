use axum::routing::post;
use axum::Router;

use crate::handlers::packages;
use crate::state::AppState;

/// `POST /inspectPackages -> inspect_packages`
pub fn router() -> Router<AppState> {
    Router::new().route("/inspectPackages", post(packages::inspect_packages))
}

/// `POST /installPackages -> install_packages`
pub fn blocking_router() -> Router<AppState> {
    Router::new().route("/installPackages", post(packages::install_packages))
}
