//! Execution engine: load a script by name and run it.
//!
//! Shared by the synchronous `executeScript` path and the job queue. The
//! engine adds no limits of its own; a script runs until its runtime
//! reports a result or a failure.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use super::executor::ScriptError;
use super::registry::ScriptRegistry;
use crate::error::CoreError;

/// Failure of one script execution, always attributed to the script name.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// No source was ever saved under this name.
    #[error("Script '{name}' not found")]
    NotFound { name: String },

    /// The script could not be loaded (invalid name, unreadable source).
    #[error("Failed to load script '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: CoreError,
    },

    /// The script was loaded but its execution failed.
    #[error("Script '{name}' failed: {source}")]
    Failed {
        name: String,
        #[source]
        source: ScriptError,
    },
}

impl ExecutionError {
    pub fn script_name(&self) -> &str {
        match self {
            Self::NotFound { name } | Self::Load { name, .. } | Self::Failed { name, .. } => name,
        }
    }
}

/// Runs scripts from a [`ScriptRegistry`].
pub struct ExecutionEngine {
    registry: Arc<ScriptRegistry>,
}

impl ExecutionEngine {
    pub fn new(registry: Arc<ScriptRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<ScriptRegistry> {
        &self.registry
    }

    /// Load the current version of `name` and invoke it with `context`.
    pub async fn execute(&self, name: &str, context: Value) -> Result<Value, ExecutionError> {
        let executable = self.registry.load(name).await.map_err(|e| match e {
            CoreError::NotFound { .. } => ExecutionError::NotFound {
                name: name.to_string(),
            },
            other => ExecutionError::Load {
                name: name.to_string(),
                source: other,
            },
        })?;

        let start = Instant::now();
        let outcome = executable.invoke(context).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(result) => {
                tracing::debug!(
                    script = name,
                    generation = executable.generation(),
                    duration_ms,
                    "Script execution succeeded",
                );
                Ok(result)
            }
            Err(e) => {
                tracing::debug!(
                    script = name,
                    generation = executable.generation(),
                    duration_ms,
                    error = %e,
                    "Script execution failed",
                );
                Err(ExecutionError::Failed {
                    name: name.to_string(),
                    source: e,
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;
    use crate::scripting::testing::{DirectiveRuntime, MemoryStore};

    fn engine() -> ExecutionEngine {
        let registry = ScriptRegistry::new(MemoryStore::shared(), DirectiveRuntime::shared());
        ExecutionEngine::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn returns_script_result() {
        let engine = engine();
        engine
            .registry()
            .save("abc.js", r#"{"return": 123}"#)
            .await
            .expect("save");

        let result = engine.execute("abc.js", Value::Null).await.expect("execute");
        assert_eq!(result, json!(123));
    }

    #[tokio::test]
    async fn passes_context_through() {
        let engine = engine();
        engine
            .registry()
            .save("echo.js", r#"{"echo": true}"#)
            .await
            .expect("save");

        let result = engine
            .execute("echo.js", json!({"user": 7}))
            .await
            .expect("execute");
        assert_eq!(result["user"], 7);
    }

    #[tokio::test]
    async fn unknown_script_is_not_found() {
        let err = engine().execute("nope.js", Value::Null).await.unwrap_err();
        assert_matches!(err, ExecutionError::NotFound { ref name } if name == "nope.js");
        assert_eq!(err.to_string(), "Script 'nope.js' not found");
    }

    #[tokio::test]
    async fn invalid_name_is_load_error() {
        let err = engine().execute("../x", Value::Null).await.unwrap_err();
        assert_matches!(
            err,
            ExecutionError::Load {
                source: CoreError::Validation(_),
                ..
            }
        );
    }

    #[tokio::test]
    async fn raised_error_is_wrapped_with_name() {
        let engine = engine();
        engine
            .registry()
            .save("bad.js", r#"{"throw": "123"}"#)
            .await
            .expect("save");

        let err = engine.execute("bad.js", Value::Null).await.unwrap_err();
        assert_eq!(err.script_name(), "bad.js");
        assert_eq!(err.to_string(), "Script 'bad.js' failed: 123");
        assert_matches!(
            err,
            ExecutionError::Failed {
                source: ScriptError::Raised { .. },
                ..
            }
        );
    }
}
