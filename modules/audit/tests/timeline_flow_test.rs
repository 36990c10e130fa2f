//! Timeline reconstruction over the full consumer path
//!
//! Submits a document lifecycle (uploaded → validated → enriched) and
//! verifies the reconstructed timeline, both through direct processing and
//! end-to-end over the in-memory bus.
//!
//! Run with: cargo test --package audit-rs --test timeline_flow_test -- --ignored

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use audit_rs::effect::AuditEffect;
use audit_rs::repos::audit_repo;
use audit_rs::start_document_events_consumer;
use audit_rs::timeline;
use document_contracts::{
    DocumentEnrichedV1, DocumentEvent, DocumentEventKind, DocumentUploadedV1, DocumentValidatedV1,
};
use event_bus::{EventBus, InMemoryBus};
use event_consumer::EventProcessor;
use serial_test::serial;
use tokio::time::sleep;
use uuid::Uuid;

use common::{bus_message, cleanup_aggregate, get_test_pool};

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_lifecycle_timeline_in_receipt_order() {
    let pool = get_test_pool().await;
    let aggregate_id = Uuid::new_v4();
    cleanup_aggregate(&pool, aggregate_id).await;

    let processor = EventProcessor::new(pool.clone());
    let effect = AuditEffect;

    let uploaded = DocumentUploadedV1 {
        owner: "ops@example.com".to_string(),
        file_name: "invoice-042.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        size_bytes: 2048,
    }
    .into_envelope(aggregate_id);

    let validated = DocumentValidatedV1 {
        owner: "ops@example.com".to_string(),
        validator: "schema-check".to_string(),
    }
    .into_envelope(aggregate_id);

    let mut metadata = HashMap::new();
    metadata.insert("vendor".to_string(), "Acme".to_string());
    let enriched = DocumentEnrichedV1 {
        owner: "ops@example.com".to_string(),
        classification: "invoice".to_string(),
        extracted_metadata: metadata,
    }
    .into_envelope(aggregate_id);

    for (envelope_bytes, subject) in [
        (
            serde_json::to_vec(&uploaded).unwrap(),
            DocumentEventKind::DocumentUploaded.subject(),
        ),
        (
            serde_json::to_vec(&validated).unwrap(),
            DocumentEventKind::DocumentValidated.subject(),
        ),
        (
            serde_json::to_vec(&enriched).unwrap(),
            DocumentEventKind::DocumentEnriched.subject(),
        ),
    ] {
        let msg = event_bus::BusMessage::new(subject.to_string(), envelope_bytes);
        processor.process_message(&msg, &effect).await.unwrap();
    }

    let descriptions = timeline::timeline_for(&pool, aggregate_id).await.unwrap();

    assert_eq!(descriptions.len(), 3);
    assert_eq!(
        descriptions[0],
        "Document uploaded: invoice-042.pdf (application/pdf, 2048 bytes)"
    );
    assert_eq!(descriptions[1], "Document validated by schema-check");
    assert_eq!(
        descriptions[2],
        "Document classified as invoice (1 metadata fields extracted)"
    );

    cleanup_aggregate(&pool, aggregate_id).await;
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_unknown_aggregate_has_empty_timeline() {
    let pool = get_test_pool().await;

    let descriptions = timeline::timeline_for(&pool, Uuid::new_v4()).await.unwrap();
    assert!(descriptions.is_empty());
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_lookup_by_event_id() {
    let pool = get_test_pool().await;
    let aggregate_id = Uuid::new_v4();
    cleanup_aggregate(&pool, aggregate_id).await;

    let envelope = DocumentValidatedV1 {
        owner: "ops@example.com".to_string(),
        validator: "schema-check".to_string(),
    }
    .into_envelope(aggregate_id);

    let processor = EventProcessor::new(pool.clone());
    let msg = bus_message(&envelope, DocumentEventKind::DocumentValidated.subject());
    processor.process_message(&msg, &AuditEffect).await.unwrap();

    let found = audit_repo::lookup(&pool, envelope.event_id)
        .await
        .unwrap()
        .expect("record exists");
    assert_eq!(found.event_type, "DocumentValidated");
    assert_eq!(found.aggregate_id, aggregate_id);

    let missing = audit_repo::lookup(&pool, Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());

    cleanup_aggregate(&pool, aggregate_id).await;
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_end_to_end_over_inmemory_bus() {
    let pool = get_test_pool().await;
    let aggregate_id = Uuid::new_v4();
    cleanup_aggregate(&pool, aggregate_id).await;

    let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
    start_document_events_consumer(bus.clone(), pool.clone()).await;

    // Give the consumer time to subscribe
    sleep(Duration::from_millis(300)).await;

    let envelope = DocumentUploadedV1 {
        owner: "ops@example.com".to_string(),
        file_name: "scan.png".to_string(),
        content_type: "image/png".to_string(),
        size_bytes: 512,
    }
    .into_envelope(aggregate_id);

    let subject = DocumentEventKind::DocumentUploaded.subject();
    let payload = serde_json::to_vec(&envelope).unwrap();

    // Publish twice: at-least-once delivery
    bus.publish(subject, payload.clone()).await.unwrap();
    bus.publish(subject, payload).await.unwrap();

    sleep(Duration::from_millis(500)).await;

    let record_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_events WHERE aggregate_id = $1")
            .bind(aggregate_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(record_count, 1, "duplicate publish audited once");

    cleanup_aggregate(&pool, aggregate_id).await;
}
