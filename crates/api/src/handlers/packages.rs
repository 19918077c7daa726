//! Handler for third-party package installation.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use njinn_core::packages::reconciler::{InstalledPackage, PackageAction, RequestedPackage};

use crate::error::AppResult;
use crate::state::AppState;

/// POST /installPackages
///
/// Blocks until every requested package is installed or already
/// satisfied. The first failure aborts the request with a 500.
pub async fn install_packages(
    State(state): State<AppState>,
    payload: Result<Json<Vec<RequestedPackage>>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(requested) = payload?;

    let actions = state.reconciler.reconcile(&requested).await?;
    let installed = actions
        .iter()
        .filter(|a| matches!(a, PackageAction::Installed { .. }))
        .count();
    tracing::info!(
        requested = requested.len(),
        installed,
        skipped = actions.len() - installed,
        "Packages reconciled",
    );

    Ok(StatusCode::OK)
}

/// POST /inspectPackages
///
/// Reports which requested packages are installed, with their installed and
/// latest versions. Installs nothing.
pub async fn inspect_packages(
    State(state): State<AppState>,
    payload: Result<Json<Vec<RequestedPackage>>, JsonRejection>,
) -> AppResult<Json<Vec<InstalledPackage>>> {
    let Json(requested) = payload?;
    let snapshot = state.reconciler.inspect(&requested).await?;
    Ok(Json(snapshot))
}
