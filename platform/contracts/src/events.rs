//! Document event kinds and versioned payloads

use event_bus::EventEnvelope;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

/// The closed, append-only enumeration of document event types.
///
/// Wire names are the variant names; they never change once shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentEventKind {
    DocumentUploaded,
    DocumentValidated,
    DocumentRejected,
    DocumentEnriched,
}

impl DocumentEventKind {
    /// All kinds, in lifecycle order. Append only.
    pub const ALL: [DocumentEventKind; 4] = [
        DocumentEventKind::DocumentUploaded,
        DocumentEventKind::DocumentValidated,
        DocumentEventKind::DocumentRejected,
        DocumentEventKind::DocumentEnriched,
    ];

    /// The stable wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentEventKind::DocumentUploaded => "DocumentUploaded",
            DocumentEventKind::DocumentValidated => "DocumentValidated",
            DocumentEventKind::DocumentRejected => "DocumentRejected",
            DocumentEventKind::DocumentEnriched => "DocumentEnriched",
        }
    }

    /// The bus subject this kind is published on
    pub fn subject(&self) -> &'static str {
        match self {
            DocumentEventKind::DocumentUploaded => crate::subjects::DOCUMENT_UPLOADED,
            DocumentEventKind::DocumentValidated => crate::subjects::DOCUMENT_VALIDATED,
            DocumentEventKind::DocumentRejected => crate::subjects::DOCUMENT_REJECTED,
            DocumentEventKind::DocumentEnriched => crate::subjects::DOCUMENT_ENRICHED,
        }
    }
}

impl std::fmt::Display for DocumentEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for event-type tags outside the closed enumeration
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown document event kind: {0}")]
pub struct UnknownEventKind(pub String);

impl FromStr for DocumentEventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DocumentUploaded" => Ok(DocumentEventKind::DocumentUploaded),
            "DocumentValidated" => Ok(DocumentEventKind::DocumentValidated),
            "DocumentRejected" => Ok(DocumentEventKind::DocumentRejected),
            "DocumentEnriched" => Ok(DocumentEventKind::DocumentEnriched),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// A versioned document event payload.
///
/// Implementors know their own kind, so producers build envelopes without
/// ever writing a wire tag by hand.
pub trait DocumentEvent: Serialize + Sized {
    const KIND: DocumentEventKind;

    /// Wrap this payload in a fresh envelope for the given document.
    ///
    /// The payload moves into the envelope; the caller keeps no handle to it.
    fn into_envelope(self, aggregate_id: Uuid) -> EventEnvelope<Self> {
        EventEnvelope::new(Self::KIND.as_str(), aggregate_id, self)
    }
}

/// Payload for DocumentUploaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentUploadedV1 {
    /// Document owner; the notification recipient
    pub owner: String,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}

impl DocumentEvent for DocumentUploadedV1 {
    const KIND: DocumentEventKind = DocumentEventKind::DocumentUploaded;
}

/// Payload for DocumentValidated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentValidatedV1 {
    pub owner: String,
    /// Which validator accepted the document (e.g. "schema-check")
    pub validator: String,
}

impl DocumentEvent for DocumentValidatedV1 {
    const KIND: DocumentEventKind = DocumentEventKind::DocumentValidated;
}

/// Payload for DocumentRejected
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRejectedV1 {
    pub owner: String,
    pub reason_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason_message: Option<String>,
}

impl DocumentEvent for DocumentRejectedV1 {
    const KIND: DocumentEventKind = DocumentEventKind::DocumentRejected;
}

/// Payload for DocumentEnriched
///
/// Produced by the enrichment service; the classification logic itself is
/// upstream and opaque to consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentEnrichedV1 {
    pub owner: String,
    pub classification: String,
    pub extracted_metadata: HashMap<String, String>,
}

impl DocumentEvent for DocumentEnrichedV1 {
    const KIND: DocumentEventKind = DocumentEventKind::DocumentEnriched;
}
