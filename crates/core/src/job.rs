//! Job descriptors for asynchronous script execution.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::scripting::store::validate_script_name;

/// Caller-supplied destination for job status events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
    pub url: String,
    /// Extra request headers sent with every event.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Webhook {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// One request to run a script in the background.
///
/// `id` is chosen by the caller and is echoed in every status event; it
/// need not be unique. `script` names the script to run and defaults to
/// `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub script: String,
    pub context: Value,
    pub webhook: Webhook,
}

impl Job {
    /// Build a job, validating the id, target script and webhook URL.
    pub fn new(
        id: impl Into<String>,
        script: Option<String>,
        context: Option<Value>,
        webhook: Webhook,
    ) -> Result<Self, CoreError> {
        let id = id.into();
        if id.is_empty() {
            return Err(CoreError::Validation("Job id is required".to_string()));
        }
        let script = script.unwrap_or_else(|| id.clone());
        validate_script_name(&script)?;

        let url = webhook.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::Validation(format!(
                "Webhook url for job '{id}' must be an http(s) URL"
            )));
        }

        Ok(Self {
            id,
            script,
            context: context.unwrap_or(Value::Null),
            webhook,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
