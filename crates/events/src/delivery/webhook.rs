//! Webhook delivery over HTTP.
//!
//! [`WebhookDelivery`] POSTs a JSON-encoded [`WebhookEvent`] to the job's
//! webhook URL with the webhook's headers. Each event gets exactly one
//! attempt; there is no retry.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use njinn_core::job::Webhook;

use super::StatusNotifier;
use crate::event::WebhookEvent;

/// Default HTTP request timeout for a single delivery.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for webhook delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The remote server returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    /// A configured header name or value is not valid HTTP.
    #[error("Invalid webhook header '{0}'")]
    InvalidHeader(String),
}

// ---------------------------------------------------------------------------
// WebhookDelivery
// ---------------------------------------------------------------------------

/// HTTP client settings for webhook delivery.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Skip TLS certificate validation toward webhook endpoints.
    pub accept_invalid_certs: bool,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            accept_invalid_certs: true,
        }
    }
}

/// Delivers job status events to webhook endpoints.
pub struct WebhookDelivery {
    client: reqwest::Client,
}

impl WebhookDelivery {
    /// Create a delivery service with a client built from `config`.
    pub fn new(config: &WebhookConfig) -> Result<Self, WebhookError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;
        Ok(Self { client })
    }

    /// Deliver `event` to `webhook` in a single attempt.
    pub async fn deliver(&self, webhook: &Webhook, event: &WebhookEvent) -> Result<(), WebhookError> {
        let headers = header_map(webhook)?;
        let response = self
            .client
            .post(&webhook.url)
            .headers(headers)
            .json(event)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(WebhookError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl StatusNotifier for WebhookDelivery {
    async fn notify(&self, webhook: &Webhook, event: &WebhookEvent) -> Result<(), WebhookError> {
        self.deliver(webhook, event).await
    }
}

fn header_map(webhook: &Webhook) -> Result<HeaderMap, WebhookError> {
    let mut headers = HeaderMap::with_capacity(webhook.headers.len());
    for (name, value) in &webhook.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| WebhookError::InvalidHeader(name.clone()))?;
        let header_value =
            HeaderValue::from_str(value).map_err(|_| WebhookError::InvalidHeader(name.clone()))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
