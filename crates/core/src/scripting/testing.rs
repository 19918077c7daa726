//! In-process doubles for the script seams.
//!
//! Compiled for this crate's own tests and, through the `test-util` feature,
//! for the worker and API test suites.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::executor::{ScriptError, ScriptRuntime};
use super::store::ScriptStore;
use crate::error::CoreError;

/// In-memory [`ScriptStore`] that counts reads.
#[derive(Default)]
pub struct MemoryStore {
    pub files: RwLock<HashMap<String, String>>,
    pub reads: AtomicUsize,
}

impl MemoryStore {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl ScriptStore for MemoryStore {
    async fn write(&self, name: &str, source: &str) -> Result<(), CoreError> {
        self.files
            .write()
            .await
            .insert(name.to_string(), source.to_string());
        Ok(())
    }

    async fn read(&self, name: &str) -> Result<Option<String>, CoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.files.read().await.get(name).cloned())
    }
}

/// Runtime treating the script source as a JSON directive:
///
/// - `{"return": v}` returns `v`
/// - `{"throw": "msg"}` raises `msg`
/// - `{"echo": true}` returns the context
/// - `"sleep_ms": n` alongside any of the above waits first
///
/// Anything else raises a syntax error. Records the context of every
/// invocation and the peak number of concurrent invocations.
#[derive(Default)]
pub struct DirectiveRuntime {
    running: AtomicUsize,
    peak: AtomicUsize,
    contexts: Mutex<Vec<Value>>,
}

impl DirectiveRuntime {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Highest number of invocations seen running at once.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Contexts in invocation order.
    pub fn contexts(&self) -> Vec<Value> {
        self.contexts
            .lock()
            .map(|contexts| contexts.clone())
            .unwrap_or_default()
    }

    async fn interpret(source: &str, context: Value) -> Result<Value, ScriptError> {
        let directive: Value = serde_json::from_str(source).map_err(|e| ScriptError::Raised {
            message: format!("SyntaxError: {e}"),
            stack: None,
        })?;
        if let Some(ms) = directive.get("sleep_ms").and_then(Value::as_u64) {
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
        if let Some(value) = directive.get("return") {
            return Ok(value.clone());
        }
        if let Some(message) = directive.get("throw").and_then(Value::as_str) {
            return Err(ScriptError::Raised {
                message: message.to_string(),
                stack: Some(format!("Error: {message}\n    at script")),
            });
        }
        if directive.get("echo").is_some() {
            return Ok(context);
        }
        Err(ScriptError::Raised {
            message: "SyntaxError: unknown directive".to_string(),
            stack: None,
        })
    }
}

#[async_trait]
impl ScriptRuntime for DirectiveRuntime {
    async fn invoke(&self, _name: &str, source: &str, context: Value) -> Result<Value, ScriptError> {
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.push(context.clone());
        }
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let outcome = Self::interpret(source, context).await;

        self.running.fetch_sub(1, Ordering::SeqCst);
        outcome
    }
}
