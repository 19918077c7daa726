use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use njinn_core::error::CoreError;
use njinn_core::packages::reconciler::InstallError;
use njinn_core::scripting::engine::ExecutionError;
use njinn_worker::QueueError;

/// Application-level error type for HTTP handlers.
///
/// Wraps the domain errors of the core and worker crates and adds
/// HTTP-specific variants. Implements [`IntoResponse`] to produce consistent
/// `{error, code}` JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `njinn_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A script could not be run.
    #[error(transparent)]
    Execution(#[from] ExecutionError),

    /// Dependency reconciliation failed.
    #[error(transparent)]
    Install(#[from] InstallError),

    /// The job queue no longer accepts work.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// An internal error with a human-readable message.
    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

fn internal(detail: &dyn std::fmt::Display) -> (StatusCode, &'static str, String) {
    tracing::error!(error = %detail, "Internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut script = None;

        let (status, code, message) = match &self {
            // --- CoreError variants ---
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::Io(err) => internal(err),
                CoreError::Internal(msg) => internal(msg),
            },

            // --- Script execution ---
            AppError::Execution(err) => {
                script = Some(err.script_name().to_string());
                match err {
                    ExecutionError::NotFound { .. } => {
                        (StatusCode::NOT_FOUND, "NOT_FOUND", err.to_string())
                    }
                    ExecutionError::Load {
                        source: CoreError::Validation(msg),
                        ..
                    } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
                    ExecutionError::Load { .. } => internal(err),
                    ExecutionError::Failed { .. } => {
                        tracing::warn!(error = %err, "Script execution failed");
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "EXECUTION_ERROR",
                            err.to_string(),
                        )
                    }
                }
            }

            // --- Dependency reconciliation ---
            AppError::Install(err) => match err {
                InstallError::InvalidPackage(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                other => {
                    tracing::error!(error = %other, "Package installation failed");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INSTALL_ERROR",
                        other.to_string(),
                    )
                }
            },

            // --- Queue ---
            AppError::Queue(err) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                err.to_string(),
            ),

            // --- HTTP-specific errors ---
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => internal(msg),
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let Some(script) = script {
            body["script"] = json!(script);
        }

        (status, axum::Json(body)).into_response()
    }
}
