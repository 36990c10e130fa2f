//! # EventBus Abstraction
//!
//! Platform-level abstraction for event-driven messaging between the
//! document services (producer, audit, notifications).
//!
//! The bus delivers messages **at least once**; consumers own deduplication.
//! Everything above this crate treats the transport as an external
//! collaborator reachable only through the [`EventBus`] trait, which allows a
//! config-driven swap between NATS (production) and an in-memory bus
//! (dev/test) without touching consumer code.
//!
//! ## Implementations
//!
//! - **NatsBus**: production implementation over `async-nats`
//! - **InMemoryBus**: broadcast-channel implementation for tests and local dev
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_bus::{EventBus, InMemoryBus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
//!
//! let payload = serde_json::to_vec(&serde_json::json!({
//!     "event_id": "7f1c6f2e-0000-0000-0000-000000000000",
//!     "event_type": "DocumentUploaded"
//! }))?;
//! bus.publish("docs.events.document.uploaded", payload).await?;
//!
//! let mut stream = bus.subscribe("docs.events.document.>").await?;
//! while let Some(msg) = futures::StreamExt::next(&mut stream).await {
//!     println!("{} bytes on {}", msg.payload.len(), msg.subject);
//! }
//! # Ok(())
//! # }
//! ```

pub mod consumer_retry;
mod envelope;
mod inmemory_bus;
mod nats_bus;

pub use envelope::{validate_envelope_fields, EventEnvelope};
pub use inmemory_bus::InMemoryBus;
pub use nats_bus::NatsBus;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

/// Header key carrying the transport-assigned message id.
///
/// Used only for observability and audit enrichment, never for idempotency
/// decisions (those key on the envelope's `event_id`).
pub const MESSAGE_ID_HEADER: &str = "message-id";

/// A message received from the event bus
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The subject this message was published to
    pub subject: String,
    /// The serialized envelope (raw bytes)
    pub payload: Vec<u8>,
    /// Optional transport headers (e.g. [`MESSAGE_ID_HEADER`])
    pub headers: Option<std::collections::HashMap<String, String>>,
    /// Optional reply-to subject (request-response patterns)
    pub reply_to: Option<String>,
}

impl BusMessage {
    /// Create a new bus message
    pub fn new(subject: String, payload: Vec<u8>) -> Self {
        Self {
            subject,
            payload,
            headers: None,
            reply_to: None,
        }
    }

    /// Attach transport headers
    pub fn with_headers(mut self, headers: std::collections::HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }

    /// Attach a reply-to subject
    pub fn with_reply_to(mut self, reply_to: String) -> Self {
        self.reply_to = Some(reply_to);
        self
    }

    /// The transport message id header, if the producer set one
    pub fn message_id(&self) -> Option<&str> {
        self.headers
            .as_ref()
            .and_then(|h| h.get(MESSAGE_ID_HEADER))
            .map(String::as_str)
    }
}

/// Errors that can occur when using the event bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("failed to subscribe to subject: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("invalid subject pattern: {0}")]
    InvalidSubject(String),
}

/// Result type for event bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Core publish-subscribe abstraction.
///
/// Delivery is at-least-once: a subscriber may see the same envelope more
/// than once (redelivery, multiple instances). Subjects use NATS token
/// syntax; `*` matches one token and `>` matches one or more trailing tokens.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a serialized envelope to a subject
    /// (e.g. "docs.events.document.uploaded").
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Subscribe to messages matching a subject pattern
    /// (e.g. "docs.events.document.>").
    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>>;
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}
