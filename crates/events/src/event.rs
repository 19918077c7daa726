//! Job status event payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use njinn_core::lifecycle::Transition;

/// Status reported to a job's webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookStatus {
    Loading,
    Success,
    Fail,
}

/// One status event as POSTed to the webhook.
///
/// `result` is present only on `success`; a script that returned nothing
/// reports `"result": null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    pub status: WebhookStatus,
    /// Fractional milliseconds since the Unix epoch.
    pub timestamp: f64,
}

impl WebhookEvent {
    pub fn loading(id: impl Into<String>, timestamp: f64) -> Self {
        Self {
            id: id.into(),
            result: None,
            status: WebhookStatus::Loading,
            timestamp,
        }
    }

    pub fn success(id: impl Into<String>, result: Value, timestamp: f64) -> Self {
        Self {
            id: id.into(),
            result: Some(result),
            status: WebhookStatus::Success,
            timestamp,
        }
    }

    pub fn fail(id: impl Into<String>, timestamp: f64) -> Self {
        Self {
            id: id.into(),
            result: None,
            status: WebhookStatus::Fail,
            timestamp,
        }
    }

    /// The event announcing a lifecycle transition of job `id`.
    pub fn for_transition(id: impl Into<String>, transition: Transition, timestamp: f64) -> Self {
        match transition {
            Transition::Activated => Self::loading(id, timestamp),
            Transition::Completed(result) => Self::success(id, result, timestamp),
            Transition::Failed => Self::fail(id, timestamp),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
