//! # Event Envelope
//!
//! Wire representation of one domain event, shared by every producer and
//! consumer on the platform.
//!
//! ## Envelope Fields
//!
//! - `event_id`: unique identifier, assigned once at creation — the
//!   idempotency key. Processing identity is this field alone.
//! - `event_type`: wire tag from the closed document-event enumeration
//! - `aggregate_id`: the document this event concerns (not unique across
//!   events)
//! - `occurred_at`: when the producer created the event (not receipt time)
//! - `correlation_id`: links related events; observability only
//! - `payload`: event-specific data, owned by the envelope
//!
//! Envelopes are constructed only through [`EventEnvelope::new`], which
//! stamps `event_id` and `occurred_at`. The payload is moved into the
//! envelope, so no caller-held handle can mutate it after construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard event envelope for all document lifecycle events.
///
/// # Type Parameter
///
/// * `T` - The event-specific payload type
///
/// # Examples
///
/// ```rust
/// use event_bus::EventEnvelope;
/// use serde::{Deserialize, Serialize};
/// use uuid::Uuid;
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct DocumentUploaded {
///     owner: String,
///     file_name: String,
/// }
///
/// let envelope = EventEnvelope::new(
///     "DocumentUploaded",
///     Uuid::new_v4(),
///     DocumentUploaded {
///         owner: "ops@example.com".to_string(),
///         file_name: "report.pdf".to_string(),
///     },
/// )
/// .with_correlation_id(Some("corr-456".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Unique event identifier (idempotency key)
    pub event_id: Uuid,

    /// Wire tag from the closed event-type enumeration
    pub event_type: String,

    /// The document (aggregate) this event concerns
    pub aggregate_id: Uuid,

    /// When the producer created the event
    pub occurred_at: DateTime<Utc>,

    /// Links related events in one business flow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Event-specific payload
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    /// Create a new envelope with a fresh `event_id` and `occurred_at`.
    ///
    /// The payload is moved in; the caller keeps no alias to it.
    pub fn new(event_type: impl Into<String>, aggregate_id: Uuid, payload: T) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            aggregate_id,
            occurred_at: Utc::now(),
            correlation_id: None,
            payload,
        }
    }

    /// Create an envelope with an explicit `event_id` (useful for testing
    /// redelivery, where the same id must appear twice on the wire).
    pub fn with_event_id(
        event_id: Uuid,
        event_type: impl Into<String>,
        aggregate_id: Uuid,
        payload: T,
    ) -> Self {
        Self {
            event_id,
            event_type: event_type.into(),
            aggregate_id,
            occurred_at: Utc::now(),
            correlation_id: None,
            payload,
        }
    }

    /// Set the correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }
}

// Identity is the event_id alone: two envelopes carrying the same id are the
// same event, whatever their payloads claim.
impl<T> PartialEq for EventEnvelope<T> {
    fn eq(&self, other: &Self) -> bool {
        self.event_id == other.event_id
    }
}

impl<T> Eq for EventEnvelope<T> {}

impl<T> std::hash::Hash for EventEnvelope<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.event_id.hash(state);
    }
}

/// Validate a raw JSON envelope before any processing.
///
/// # Validation Rules
///
/// - `event_id`: present and a valid UUID
/// - `event_type`: present and non-empty
/// - `aggregate_id`: present and a valid UUID
/// - `occurred_at`: present
///
/// # Errors
///
/// Returns a descriptive error string if validation fails. A failure here is
/// permanent (malformed input), not retryable.
pub fn validate_envelope_fields(envelope: &serde_json::Value) -> Result<(), String> {
    let event_id = envelope
        .get("event_id")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid event_id")?;

    Uuid::parse_str(event_id).map_err(|_| format!("event_id is not a valid UUID: {event_id}"))?;

    let event_type = envelope
        .get("event_type")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid event_type")?;

    if event_type.is_empty() {
        return Err("event_type cannot be empty".to_string());
    }

    let aggregate_id = envelope
        .get("aggregate_id")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid aggregate_id")?;

    Uuid::parse_str(aggregate_id)
        .map_err(|_| format!("aggregate_id is not a valid UUID: {aggregate_id}"))?;

    envelope
        .get("occurred_at")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid occurred_at")?;

    // correlation_id is optional
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_envelope_creation() {
        let aggregate_id = Uuid::new_v4();
        let envelope = EventEnvelope::new(
            "DocumentUploaded",
            aggregate_id,
            json!({"file_name": "report.pdf"}),
        );

        assert_eq!(envelope.event_type, "DocumentUploaded");
        assert_eq!(envelope.aggregate_id, aggregate_id);
        assert!(envelope.correlation_id.is_none());
    }

    #[test]
    fn test_factory_stamps_unique_event_ids() {
        let aggregate_id = Uuid::new_v4();
        let a = EventEnvelope::new("DocumentUploaded", aggregate_id, json!({}));
        let b = EventEnvelope::new("DocumentUploaded", aggregate_id, json!({}));

        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn test_equality_is_event_id_only() {
        let id = Uuid::new_v4();
        let a = EventEnvelope::with_event_id(id, "DocumentUploaded", Uuid::new_v4(), json!({"a": 1}));
        let b = EventEnvelope::with_event_id(id, "DocumentValidated", Uuid::new_v4(), json!({"b": 2}));

        // Same event_id: same event, despite differing everything else
        assert_eq!(a, b);

        let c = EventEnvelope::new("DocumentUploaded", a.aggregate_id, json!({"a": 1}));
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_serde_round_trip() {
        let envelope = EventEnvelope::new(
            "DocumentEnriched",
            Uuid::new_v4(),
            json!({"classification": "invoice"}),
        )
        .with_correlation_id(Some("corr-1".to_string()));

        let bytes = serde_json::to_vec(&envelope).unwrap();
        let back: EventEnvelope<serde_json::Value> = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(back.event_id, envelope.event_id);
        assert_eq!(back.event_type, envelope.event_type);
        assert_eq!(back.aggregate_id, envelope.aggregate_id);
        assert_eq!(back.occurred_at, envelope.occurred_at);
        assert_eq!(back.correlation_id, envelope.correlation_id);
        assert_eq!(back.payload, envelope.payload);
    }

    #[test]
    fn test_validate_envelope_fields_valid() {
        let envelope = json!({
            "event_id": "550e8400-e29b-41d4-a716-446655440000",
            "event_type": "DocumentUploaded",
            "aggregate_id": "650e8400-e29b-41d4-a716-446655440000",
            "occurred_at": "2026-01-01T00:00:00Z",
            "payload": {}
        });

        assert!(validate_envelope_fields(&envelope).is_ok());
    }

    #[test]
    fn test_validate_envelope_fields_missing_event_id() {
        let envelope = json!({
            "event_type": "DocumentUploaded",
            "aggregate_id": "650e8400-e29b-41d4-a716-446655440000",
            "occurred_at": "2026-01-01T00:00:00Z"
        });

        assert!(validate_envelope_fields(&envelope).is_err());
    }

    #[test]
    fn test_validate_envelope_fields_bad_uuid() {
        let envelope = json!({
            "event_id": "not-a-uuid",
            "event_type": "DocumentUploaded",
            "aggregate_id": "650e8400-e29b-41d4-a716-446655440000",
            "occurred_at": "2026-01-01T00:00:00Z"
        });

        assert!(validate_envelope_fields(&envelope).is_err());
    }

    #[test]
    fn test_validate_envelope_fields_empty_event_type() {
        let envelope = json!({
            "event_id": "550e8400-e29b-41d4-a716-446655440000",
            "event_type": "",
            "aggregate_id": "650e8400-e29b-41d4-a716-446655440000",
            "occurred_at": "2026-01-01T00:00:00Z"
        });

        assert!(validate_envelope_fields(&envelope).is_err());
    }
}
