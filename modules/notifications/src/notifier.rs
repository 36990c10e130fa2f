//! Outbound delivery channels
//!
//! The channel is a trait seam so the service swaps between structured-log
//! delivery (dev/test) and webhook delivery (production) by configuration,
//! the same way the bus swaps between in-memory and NATS.

use async_trait::async_trait;
use serde::Serialize;

/// A rendered notification ready for delivery
#[derive(Debug, Clone, Serialize)]
pub struct NotificationMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Delivery failure. Channels being unreachable is transient by assumption;
/// the processor retries with backoff and dead-letters on exhaustion.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("channel unreachable: {0}")]
    Unreachable(String),

    #[error("channel rejected message: {0}")]
    Rejected(String),
}

/// One way of getting a notification to a recipient
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Channel name recorded alongside each sent notification
    fn name(&self) -> &'static str;

    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError>;
}

/// Structured-log delivery for development and tests
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        tracing::info!(
            recipient = %message.recipient,
            subject = %message.subject,
            body = %message.body,
            "Delivering notification"
        );
        Ok(())
    }
}

/// Webhook delivery: POSTs the rendered message as JSON
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| DeliveryError::Unreachable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Rejected(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
