//! Timeline reconstruction: audit rows rendered as human-readable history

use document_contracts::{
    DocumentEnrichedV1, DocumentEventKind, DocumentRejectedV1, DocumentUploadedV1,
    DocumentValidatedV1,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repos::audit_repo::{self, AuditRecord};

/// The full timeline for one document: one description per audited event,
/// oldest first (receipt order, producer timestamp as tie-break).
///
/// An unknown aggregate yields an empty timeline, not an error.
pub async fn timeline_for(pool: &PgPool, aggregate_id: Uuid) -> Result<Vec<String>, sqlx::Error> {
    let records = audit_repo::records_for_aggregate(pool, aggregate_id).await?;
    Ok(records.iter().map(describe).collect())
}

/// Render one audit record as a human-readable event description.
///
/// Unknown event types (a newer producer than this consumer) still render,
/// with a generic line — the trail never drops what it stored.
pub fn describe(record: &AuditRecord) -> String {
    match record.event_type.parse::<DocumentEventKind>() {
        Ok(DocumentEventKind::DocumentUploaded) => {
            match serde_json::from_value::<DocumentUploadedV1>(record.payload.clone()) {
                Ok(p) => format!(
                    "Document uploaded: {} ({}, {} bytes)",
                    p.file_name, p.content_type, p.size_bytes
                ),
                Err(_) => generic(record),
            }
        }
        Ok(DocumentEventKind::DocumentValidated) => {
            match serde_json::from_value::<DocumentValidatedV1>(record.payload.clone()) {
                Ok(p) => format!("Document validated by {}", p.validator),
                Err(_) => generic(record),
            }
        }
        Ok(DocumentEventKind::DocumentRejected) => {
            match serde_json::from_value::<DocumentRejectedV1>(record.payload.clone()) {
                Ok(p) => match p.reason_message {
                    Some(msg) => format!("Document rejected: {} ({})", p.reason_code, msg),
                    None => format!("Document rejected: {}", p.reason_code),
                },
                Err(_) => generic(record),
            }
        }
        Ok(DocumentEventKind::DocumentEnriched) => {
            match serde_json::from_value::<DocumentEnrichedV1>(record.payload.clone()) {
                Ok(p) => format!(
                    "Document classified as {} ({} metadata fields extracted)",
                    p.classification,
                    p.extracted_metadata.len()
                ),
                Err(_) => generic(record),
            }
        }
        Err(_) => generic(record),
    }
}

fn generic(record: &AuditRecord) -> String {
    format!("{} event received", record.event_type)
}
