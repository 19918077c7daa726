//! Per-job status reporter.
//!
//! One reporter task per job drains that job's event channel and delivers
//! each event before taking the next, so a webhook always observes a job's
//! events in the order they were emitted. Delivery failures are logged and
//! never fed back into the job.

use std::sync::Arc;

use tokio::sync::mpsc;

use njinn_core::job::Webhook;
use njinn_events::{StatusNotifier, WebhookEvent};

/// Deliver every event from `events` to `webhook`, in order, until the
/// sending side is dropped.
pub(crate) async fn run(
    notifier: Arc<dyn StatusNotifier>,
    webhook: Webhook,
    mut events: mpsc::UnboundedReceiver<WebhookEvent>,
) {
    while let Some(event) = events.recv().await {
        match notifier.notify(&webhook, &event).await {
            Ok(()) => {
                tracing::debug!(status = ?event.status, "Status event delivered");
            }
            Err(e) => {
                tracing::warn!(
                    status = ?event.status,
                    url = %webhook.url,
                    error = %e,
                    "Status event delivery failed",
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use njinn_events::{WebhookError, WebhookStatus};

    use super::*;

    /// Notifier whose first delivery is slow and fails.
    #[derive(Default)]
    struct FlakyNotifier {
        delivered: Mutex<Vec<WebhookStatus>>,
    }

    #[async_trait]
    impl StatusNotifier for FlakyNotifier {
        async fn notify(&self, _webhook: &Webhook, event: &WebhookEvent) -> Result<(), WebhookError> {
            let first = self.delivered.lock().unwrap().is_empty();
            if first {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            self.delivered.lock().unwrap().push(event.status);
            if first {
                return Err(WebhookError::HttpStatus(503));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn delivers_in_emission_order_despite_slow_failure() {
        let notifier = Arc::new(FlakyNotifier::default());
        let (tx, rx) = mpsc::unbounded_channel();

        tx.send(WebhookEvent::loading("a", 1.0)).expect("send");
        tx.send(WebhookEvent::success("a", json!(1), 2.0)).expect("send");
        drop(tx);

        run(
            Arc::clone(&notifier) as Arc<dyn StatusNotifier>,
            Webhook::new("http://localhost/hook"),
            rx,
        )
        .await;

        assert_eq!(
            *notifier.delivered.lock().unwrap(),
            vec![WebhookStatus::Loading, WebhookStatus::Success]
        );
    }
}
