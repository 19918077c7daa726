//! Node.js script runtime.
//!
//! Every invocation spawns a fresh `node` process running the embedded
//! runner (`runner.js`). The runner receives the script source and context
//! as JSON on stdin, compiles the source as a CommonJS module rooted in the
//! scripts directory (so packages installed there resolve), calls the
//! exported function and prints a result envelope as its last stdout line.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::process::Command;

use super::executor::{ScriptError, ScriptRuntime};
use super::subprocess::{self, ProcessOutput};

/// Source of the runner passed to `node -e`.
const RUNNER_JS: &str = include_str!("runner.js");

/// Runtime that evaluates scripts with the Node.js interpreter.
#[derive(Debug, Clone)]
pub struct NodeRuntime {
    /// Interpreter binary (`node` on `PATH` by default).
    node_bin: String,
    /// Working directory of the child; also the module root for scripts.
    scripts_dir: PathBuf,
}

impl NodeRuntime {
    /// A relative `scripts_dir` is resolved against the current directory
    /// once, here, so module filenames and sibling `require`s do not depend
    /// on the child's working directory.
    pub fn new(node_bin: impl Into<String>, scripts_dir: impl Into<PathBuf>) -> Self {
        let scripts_dir = scripts_dir.into();
        let scripts_dir = std::path::absolute(&scripts_dir).unwrap_or(scripts_dir);
        Self {
            node_bin: node_bin.into(),
            scripts_dir,
        }
    }
}

#[derive(Serialize)]
struct RunnerRequest<'a> {
    name: &'a str,
    filename: String,
    source: &'a str,
    context: Value,
}

/// Result envelope printed by the runner.
#[derive(Debug, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
enum RunnerEnvelope {
    Ok {
        #[serde(default)]
        result: Value,
    },
    Error {
        message: String,
        #[serde(default)]
        stack: Option<String>,
    },
}

#[async_trait]
impl ScriptRuntime for NodeRuntime {
    async fn invoke(&self, name: &str, source: &str, context: Value) -> Result<Value, ScriptError> {
        let request = RunnerRequest {
            name,
            filename: self.scripts_dir.join(name).to_string_lossy().into_owned(),
            source,
            context,
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| ScriptError::Protocol(e.to_string()))?;

        let mut cmd = Command::new(&self.node_bin);
        cmd.arg("-e").arg(RUNNER_JS).current_dir(&self.scripts_dir);

        let output = subprocess::run_command(&mut cmd, payload).await?;
        tracing::debug!(
            script = name,
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
            "Node runner finished",
        );
        parse_output(output)
    }
}

/// Interpret the runner's captured output.
///
/// The envelope is the last non-empty stdout line; anything a script wrote
/// to stdout directly precedes it and is ignored.
fn parse_output(output: ProcessOutput) -> Result<Value, ScriptError> {
    let last_line = output
        .stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty());

    let envelope = match last_line.map(serde_json::from_str::<RunnerEnvelope>) {
        Some(Ok(envelope)) => envelope,
        Some(Err(_)) | None if output.exit_code != 0 => {
            return Err(ScriptError::Crashed {
                exit_code: output.exit_code,
                stderr: output.stderr,
            });
        }
        Some(Err(e)) => return Err(ScriptError::Protocol(e.to_string())),
        None => {
            return Err(ScriptError::Protocol(
                "runner exited without a result".to_string(),
            ))
        }
    };

    match envelope {
        RunnerEnvelope::Ok { result } => Ok(result),
        RunnerEnvelope::Error { message, stack } => Err(ScriptError::Raised { message, stack }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
