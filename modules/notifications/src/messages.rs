//! Message rendering: one notification per document lifecycle event

use document_contracts::{
    DocumentEnrichedV1, DocumentEventKind, DocumentRejectedV1, DocumentUploadedV1,
    DocumentValidatedV1,
};
use event_consumer::ReceivedEnvelope;

use crate::notifier::NotificationMessage;

/// The payload cannot be turned into a notification. Permanent: the same
/// bytes will fail the same way on redelivery.
#[derive(Debug, thiserror::Error)]
#[error("cannot build notification: {0}")]
pub struct BuildError(pub String);

/// Render the notification for one envelope.
///
/// Returns `None` for event types outside the closed enumeration this
/// consumer knows: the event is still claimed (so redelivery stays quiet),
/// but nobody is notified about something we cannot describe.
pub fn build_message(envelope: &ReceivedEnvelope) -> Result<Option<NotificationMessage>, BuildError> {
    let kind = match envelope.event_type.parse::<DocumentEventKind>() {
        Ok(kind) => kind,
        Err(_) => return Ok(None),
    };

    let message = match kind {
        DocumentEventKind::DocumentUploaded => {
            let p: DocumentUploadedV1 = payload(envelope)?;
            NotificationMessage {
                recipient: p.owner,
                subject: format!("Document received: {}", p.file_name),
                body: format!(
                    "Your document {} ({}, {} bytes) was received and queued for validation.",
                    p.file_name, p.content_type, p.size_bytes
                ),
            }
        }
        DocumentEventKind::DocumentValidated => {
            let p: DocumentValidatedV1 = payload(envelope)?;
            NotificationMessage {
                recipient: p.owner,
                subject: "Document validated".to_string(),
                body: format!("Your document passed validation ({}).", p.validator),
            }
        }
        DocumentEventKind::DocumentRejected => {
            let p: DocumentRejectedV1 = payload(envelope)?;
            let detail = p
                .reason_message
                .map(|m| format!(": {}", m))
                .unwrap_or_default();
            NotificationMessage {
                recipient: p.owner,
                subject: format!("Document rejected ({})", p.reason_code),
                body: format!(
                    "Your document was rejected with code {}{}.",
                    p.reason_code, detail
                ),
            }
        }
        DocumentEventKind::DocumentEnriched => {
            let p: DocumentEnrichedV1 = payload(envelope)?;
            NotificationMessage {
                recipient: p.owner,
                subject: format!("Document classified as {}", p.classification),
                body: format!(
                    "Your document was classified as {} with {} extracted metadata fields.",
                    p.classification,
                    p.extracted_metadata.len()
                ),
            }
        }
    };

    Ok(Some(message))
}

fn payload<T: serde::de::DeserializeOwned>(envelope: &ReceivedEnvelope) -> Result<T, BuildError> {
    envelope.payload_as::<T>().map_err(|e| BuildError(e.reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn envelope(event_type: &str, payload: serde_json::Value) -> ReceivedEnvelope {
        ReceivedEnvelope {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            aggregate_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            correlation_id: None,
            payload,
            subject: "docs.events.document.test".to_string(),
            received_at: Utc::now(),
            message_id: None,
        }
    }

    #[test]
    fn test_uploaded_message_targets_owner() {
        let msg = build_message(&envelope(
            "DocumentUploaded",
            json!({
                "owner": "ops@example.com",
                "file_name": "report.pdf",
                "content_type": "application/pdf",
                "size_bytes": 2048
            }),
        ))
        .unwrap()
        .expect("message built");

        assert_eq!(msg.recipient, "ops@example.com");
        assert_eq!(msg.subject, "Document received: report.pdf");
        assert!(msg.body.contains("2048 bytes"));
    }

    #[test]
    fn test_rejected_message_includes_reason() {
        let msg = build_message(&envelope(
            "DocumentRejected",
            json!({
                "owner": "ops@example.com",
                "reason_code": "INVALID_FORMAT",
                "reason_message": "unsupported file type"
            }),
        ))
        .unwrap()
        .expect("message built");

        assert_eq!(msg.subject, "Document rejected (INVALID_FORMAT)");
        assert!(msg.body.contains("unsupported file type"));
    }

    #[test]
    fn test_enriched_message_summarizes_classification() {
        let msg = build_message(&envelope(
            "DocumentEnriched",
            json!({
                "owner": "ops@example.com",
                "classification": "invoice",
                "extracted_metadata": {"vendor": "Acme"}
            }),
        ))
        .unwrap()
        .expect("message built");

        assert_eq!(msg.subject, "Document classified as invoice");
        assert!(msg.body.contains("1 extracted metadata fields"));
    }

    #[test]
    fn test_unknown_event_type_builds_nothing() {
        let result = build_message(&envelope("DocumentArchived", json!({}))).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_missing_owner_is_an_error() {
        let result = build_message(&envelope(
            "DocumentValidated",
            json!({"validator": "schema-check"}),
        ));
        assert!(result.is_err());
    }
}
