//! Received-envelope intake: parse, validate, stamp transport metadata

use chrono::{DateTime, Utc};
use event_bus::{validate_envelope_fields, BusMessage};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// A malformed wire envelope.
///
/// Permanent by definition: redelivering the same bytes cannot fix them, so
/// callers route these to the dead-letter path instead of retrying.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed envelope on {subject}: {reason}")]
pub struct MalformedEnvelope {
    pub subject: String,
    pub reason: String,
}

/// One envelope as received from the transport, validated and ready for
/// processing.
///
/// Carries the producer-side envelope fields plus receipt-side metadata:
/// `received_at` (stamped here, at intake) and the transport `message_id`
/// header. Transport metadata feeds observability and audit enrichment only;
/// idempotency decisions key on `event_id` alone.
#[derive(Debug, Clone)]
pub struct ReceivedEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub correlation_id: Option<String>,
    /// Raw event-specific payload; deserialize with [`Self::payload_as`]
    pub payload: serde_json::Value,
    /// Subject the message arrived on
    pub subject: String,
    /// Transport receipt time (not producer creation time)
    pub received_at: DateTime<Utc>,
    /// Transport-assigned message id header, if present
    pub message_id: Option<String>,
}

impl ReceivedEnvelope {
    /// Parse and validate a bus message into a `ReceivedEnvelope`.
    ///
    /// # Errors
    ///
    /// [`MalformedEnvelope`] when the payload is not JSON, a required field
    /// is missing, or an id fails to parse.
    pub fn from_message(msg: &BusMessage) -> Result<Self, MalformedEnvelope> {
        let malformed = |reason: String| MalformedEnvelope {
            subject: msg.subject.clone(),
            reason,
        };

        let raw: serde_json::Value = serde_json::from_slice(&msg.payload)
            .map_err(|e| malformed(format!("not valid JSON: {e}")))?;

        validate_envelope_fields(&raw).map_err(malformed)?;

        // validate_envelope_fields guarantees presence and UUID validity
        let event_id = raw
            .get("event_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| malformed("missing event_id".to_string()))?;

        let aggregate_id = raw
            .get("aggregate_id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| malformed("missing aggregate_id".to_string()))?;

        let event_type = raw
            .get("event_type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| malformed("missing event_type".to_string()))?
            .to_string();

        let occurred_at = raw
            .get("occurred_at")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| malformed("occurred_at is not an RFC 3339 timestamp".to_string()))?;

        let correlation_id = raw
            .get("correlation_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        let payload = raw.get("payload").cloned().unwrap_or(serde_json::Value::Null);

        Ok(Self {
            event_id,
            event_type,
            aggregate_id,
            occurred_at,
            correlation_id,
            payload,
            subject: msg.subject.clone(),
            received_at: Utc::now(),
            message_id: msg.message_id().map(|s| s.to_string()),
        })
    }

    /// Deserialize the payload into a typed contract struct.
    ///
    /// A mismatch is malformed input (permanent), not a transient failure.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, MalformedEnvelope> {
        serde_json::from_value(self.payload.clone()).map_err(|e| MalformedEnvelope {
            subject: self.subject.clone(),
            reason: format!("payload does not match {}: {e}", std::any::type_name::<T>()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use event_bus::{EventEnvelope, MESSAGE_ID_HEADER};
    use serde_json::json;
    use std::collections::HashMap;

    fn message_for(envelope: &EventEnvelope<serde_json::Value>) -> BusMessage {
        BusMessage::new(
            "docs.events.document.uploaded".to_string(),
            serde_json::to_vec(envelope).unwrap(),
        )
    }

    #[test]
    fn test_round_trip_from_wire() {
        let envelope = EventEnvelope::new(
            "DocumentUploaded",
            Uuid::new_v4(),
            json!({"owner": "ops@example.com", "file_name": "report.pdf"}),
        )
        .with_correlation_id(Some("corr-9".to_string()));

        let received = ReceivedEnvelope::from_message(&message_for(&envelope)).unwrap();

        assert_eq!(received.event_id, envelope.event_id);
        assert_eq!(received.event_type, "DocumentUploaded");
        assert_eq!(received.aggregate_id, envelope.aggregate_id);
        assert_eq!(received.correlation_id, Some("corr-9".to_string()));
        assert_eq!(received.payload["file_name"], "report.pdf");
        assert!(received.received_at >= envelope.occurred_at);
    }

    #[test]
    fn test_message_id_header_is_captured() {
        let envelope =
            EventEnvelope::new("DocumentUploaded", Uuid::new_v4(), json!({}));
        let mut headers = HashMap::new();
        headers.insert(MESSAGE_ID_HEADER.to_string(), "msg-42".to_string());
        let msg = message_for(&envelope).with_headers(headers);

        let received = ReceivedEnvelope::from_message(&msg).unwrap();
        assert_eq!(received.message_id.as_deref(), Some("msg-42"));
    }

    #[test]
    fn test_garbage_bytes_are_malformed() {
        let msg = BusMessage::new("docs.events.document.uploaded".to_string(), b"not json".to_vec());
        let err = ReceivedEnvelope::from_message(&msg).unwrap_err();
        assert!(err.reason.contains("not valid JSON"));
        assert_eq!(err.subject, "docs.events.document.uploaded");
    }

    #[test]
    fn test_missing_event_id_is_malformed() {
        let msg = BusMessage::new(
            "docs.events.document.uploaded".to_string(),
            serde_json::to_vec(&json!({
                "event_type": "DocumentUploaded",
                "aggregate_id": Uuid::new_v4(),
                "occurred_at": "2026-01-01T00:00:00Z"
            }))
            .unwrap(),
        );

        assert!(ReceivedEnvelope::from_message(&msg).is_err());
    }

    #[test]
    fn test_payload_as_mismatch_is_malformed() {
        #[derive(serde::Deserialize)]
        struct Expected {
            #[allow(dead_code)]
            file_name: String,
        }

        let envelope =
            EventEnvelope::new("DocumentUploaded", Uuid::new_v4(), json!({"other": 1}));
        let received = ReceivedEnvelope::from_message(&message_for(&envelope)).unwrap();

        assert!(received.payload_as::<Expected>().is_err());
    }
}
