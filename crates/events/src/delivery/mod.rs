//! External delivery of job status events.

pub mod webhook;

use async_trait::async_trait;

use njinn_core::job::Webhook;

use crate::event::WebhookEvent;
use webhook::WebhookError;

/// Sends one status event to a job's webhook.
///
/// Implementations make a single attempt. Callers log failures; a failed
/// delivery never changes the job's state.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, webhook: &Webhook, event: &WebhookEvent) -> Result<(), WebhookError>;
}
