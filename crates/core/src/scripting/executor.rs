//! Script runtime interface and shared error type.
//!
//! Defines [`ScriptRuntime`], the seam between the registry (which owns
//! script sources) and whatever process actually evaluates them, along
//! with [`ScriptError`].

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

/// Errors raised while running a single script invocation.
#[derive(Debug)]
pub enum ScriptError {
    /// The script's own code raised an error.
    Raised {
        /// Message of the raised error.
        message: String,
        /// Stack trace reported by the runtime, if any.
        stack: Option<String>,
    },
    /// The runtime process exited without reporting a result.
    Crashed {
        /// Process exit code (`-1` if killed by signal).
        exit_code: i32,
        /// Captured stderr output.
        stderr: String,
    },
    /// The runtime reported something that does not follow the result protocol.
    Protocol(String),
    /// An I/O error occurred while spawning or communicating with the process.
    IoError(std::io::Error),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raised { message, .. } => write!(f, "{message}"),
            Self::Crashed { exit_code, stderr } => {
                write!(f, "Runtime exited with code {exit_code}: {stderr}")
            }
            Self::Protocol(detail) => write!(f, "Malformed runtime output: {detail}"),
            Self::IoError(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for ScriptError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            _ => None,
        }
    }
}

/// Evaluates script source with a JSON context and returns a JSON result.
///
/// Implementations must not share mutable state between invocations: every
/// call sees only the `source` it was handed, so a registry can swap sources
/// while older invocations are still running.
#[async_trait]
pub trait ScriptRuntime: Send + Sync {
    /// Run `source` (registered under `name`) with `context`.
    async fn invoke(&self, name: &str, source: &str, context: Value) -> Result<Value, ScriptError>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
