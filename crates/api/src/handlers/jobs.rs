//! Handler for enqueueing background jobs.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use njinn_core::job::{Job, Webhook};

use crate::error::AppResult;
use crate::state::AppState;

/// One element of the `POST /queueJobs` body.
#[derive(Debug, Deserialize)]
pub struct QueueJobRequest {
    /// Echoed in every status event; also the script name unless `script`
    /// is given.
    #[serde(default)]
    pub id: String,
    /// Name of the script to run.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
    pub webhook: Webhook,
}

/// POST /queueJobs
///
/// Validates every job first; if any is invalid nothing is enqueued.
/// Responds with an empty 200 without waiting for execution.
pub async fn queue_jobs(
    State(state): State<AppState>,
    payload: Result<Json<Vec<QueueJobRequest>>, JsonRejection>,
) -> AppResult<StatusCode> {
    let Json(requests) = payload?;

    let jobs = requests
        .into_iter()
        .map(|r| Job::new(r.id, r.script, r.context, r.webhook))
        .collect::<Result<Vec<_>, _>>()?;

    let count = jobs.len();
    for job in jobs {
        state.queue.enqueue(job)?;
    }
    tracing::info!(count, "Jobs enqueued");

    Ok(StatusCode::OK)
}
