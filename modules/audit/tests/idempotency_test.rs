//! Idempotency guarantees of the audit consumer
//!
//! Validates the core at-most-once properties against live Postgres:
//! redelivery produces no duplicate effects, concurrent claims resolve to a
//! single winner, and the ledger entry is immutable once written.
//!
//! Run with: cargo test --package audit-rs --test idempotency_test -- --ignored

mod common;

use audit_rs::effect::AuditEffect;
use document_contracts::{DocumentEvent, DocumentEventKind, DocumentUploadedV1};
use event_consumer::{ledger, EventProcessor, ProcessOutcome, ReceivedEnvelope};
use serial_test::serial;
use uuid::Uuid;

use common::{bus_message, cleanup_aggregate, get_test_pool};

fn uploaded_envelope(aggregate_id: Uuid) -> event_bus::EventEnvelope<DocumentUploadedV1> {
    DocumentUploadedV1 {
        owner: "ops@example.com".to_string(),
        file_name: "report.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        size_bytes: 10240,
    }
    .into_envelope(aggregate_id)
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_redelivery_produces_exactly_one_record() {
    let pool = get_test_pool().await;
    let aggregate_id = Uuid::new_v4();
    cleanup_aggregate(&pool, aggregate_id).await;

    let envelope = uploaded_envelope(aggregate_id);
    let msg = bus_message(&envelope, DocumentEventKind::DocumentUploaded.subject());

    let processor = EventProcessor::new(pool.clone());
    let effect = AuditEffect;

    // Deliver the same message three times, as the transport may
    let first = processor.process_message(&msg, &effect).await.unwrap();
    let second = processor.process_message(&msg, &effect).await.unwrap();
    let third = processor.process_message(&msg, &effect).await.unwrap();

    assert_eq!(first, ProcessOutcome::Applied);
    assert_eq!(second, ProcessOutcome::Deduplicated);
    assert_eq!(third, ProcessOutcome::Deduplicated);

    let record_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_events WHERE event_id = $1")
            .bind(envelope.event_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(record_count, 1);

    let entry = ledger::entry_for(&pool, envelope.event_id)
        .await
        .unwrap()
        .expect("ledger entry exists");
    assert_eq!(entry.event_type, "DocumentUploaded");
    assert_eq!(entry.aggregate_id, aggregate_id);

    cleanup_aggregate(&pool, aggregate_id).await;
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_concurrent_claims_have_a_single_winner() {
    let pool = get_test_pool().await;
    let aggregate_id = Uuid::new_v4();
    cleanup_aggregate(&pool, aggregate_id).await;

    let envelope = uploaded_envelope(aggregate_id);
    let msg = bus_message(&envelope, DocumentEventKind::DocumentUploaded.subject());
    let received = ReceivedEnvelope::from_message(&msg).unwrap();

    // K concurrent workers race on the same event id
    let mut handles = Vec::new();
    for _ in 0..8 {
        let processor = EventProcessor::new(pool.clone());
        let received = received.clone();
        handles.push(tokio::spawn(async move {
            processor.process(&received, &AuditEffect).await.unwrap()
        }));
    }

    let mut applied = 0;
    let mut deduplicated = 0;
    for handle in handles {
        match handle.await.unwrap() {
            ProcessOutcome::Applied => applied += 1,
            ProcessOutcome::Deduplicated => deduplicated += 1,
        }
    }

    assert_eq!(applied, 1, "exactly one claimant wins");
    assert_eq!(deduplicated, 7);

    let record_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM audit_events WHERE event_id = $1")
            .bind(envelope.event_id)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(record_count, 1);

    cleanup_aggregate(&pool, aggregate_id).await;
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_duplicate_claim_does_not_mutate_processed_at() {
    let pool = get_test_pool().await;
    let aggregate_id = Uuid::new_v4();
    cleanup_aggregate(&pool, aggregate_id).await;

    let envelope = uploaded_envelope(aggregate_id);
    let msg = bus_message(&envelope, DocumentEventKind::DocumentUploaded.subject());

    let processor = EventProcessor::new(pool.clone());
    processor.process_message(&msg, &AuditEffect).await.unwrap();

    let before = ledger::entry_for(&pool, envelope.event_id)
        .await
        .unwrap()
        .expect("entry exists")
        .processed_at;

    processor.process_message(&msg, &AuditEffect).await.unwrap();

    let after = ledger::entry_for(&pool, envelope.event_id)
        .await
        .unwrap()
        .expect("entry still exists")
        .processed_at;

    assert_eq!(before, after);

    cleanup_aggregate(&pool, aggregate_id).await;
}

#[tokio::test]
#[serial]
#[ignore] // Requires Postgres
async fn test_malformed_envelope_is_dead_lettered_not_processed() {
    let pool = get_test_pool().await;

    sqlx::query("DELETE FROM failed_events WHERE subject = 'docs.test.malformed'")
        .execute(&pool)
        .await
        .unwrap();

    // Missing event_id entirely
    let msg = event_bus::BusMessage::new(
        "docs.test.malformed".to_string(),
        serde_json::to_vec(&serde_json::json!({
            "event_type": "DocumentUploaded",
            "aggregate_id": Uuid::new_v4(),
            "occurred_at": "2026-01-01T00:00:00Z",
            "payload": {}
        }))
        .unwrap(),
    );

    let processor = EventProcessor::new(pool.clone());
    let err = processor
        .process_with_retry(&msg, &AuditEffect)
        .await
        .unwrap_err();
    assert!(!err.is_retryable());

    event_consumer::dlq::record_failure(&pool, &msg, &err.to_string(), 0).await;

    let dlq_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM failed_events WHERE subject = 'docs.test.malformed'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(dlq_count, 1);
}
