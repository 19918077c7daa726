//! Handlers for saving and synchronously executing scripts.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use njinn_core::error::CoreError;

use crate::error::AppResult;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Body of `POST /saveScript`.
#[derive(Debug, Deserialize)]
pub struct SaveScriptRequest {
    /// Script name; also the file name in the scripts directory.
    #[serde(default)]
    pub id: String,
    /// Script source.
    #[serde(default)]
    pub script: String,
}

/// Body of `POST /executeScript`.
#[derive(Debug, Deserialize)]
pub struct ExecuteScriptRequest {
    #[serde(default)]
    pub id: String,
    /// Passed to the script's exported function; `null` when omitted.
    #[serde(default)]
    pub context: Value,
}

fn require_id(id: &str) -> Result<(), CoreError> {
    if id.is_empty() {
        return Err(CoreError::Validation("id is required".to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /saveScript
///
/// Persist the script and invalidate any cached version. Responds with an
/// empty 200 once later executions are guaranteed to see the new source.
pub async fn save_script(
    State(state): State<AppState>,
    payload: Result<Json<SaveScriptRequest>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(input) = payload?;
    require_id(&input.id)?;

    state.engine.registry().save(&input.id, &input.script).await?;
    Ok(StatusCode::OK)
}

/// POST /executeScript
///
/// Run the script to completion and return its result as the JSON body.
pub async fn execute_script(
    State(state): State<AppState>,
    payload: Result<Json<ExecuteScriptRequest>, JsonRejection>,
) -> AppResult<Json<Value>> {
    let Json(input) = payload?;
    require_id(&input.id)?;

    let result = state.engine.execute(&input.id, input.context).await?;
    Ok(Json(result))
}
