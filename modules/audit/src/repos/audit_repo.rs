//! Append-only audit trail storage
//!
//! One row per successfully processed envelope, primary-keyed on `event_id`.
//! Rows are never updated or deleted; `append` is an idempotent insert so
//! replaying a committed event is a no-op, not an error.

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// One audit trail row: the envelope plus receipt-side transport metadata
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuditRecord {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
    pub received_at: DateTime<Utc>,
    pub message_id: Option<String>,
    pub correlation_id: Option<String>,
}

/// Append a record inside the caller's transaction.
///
/// Duplicate `event_id` is a no-op (`ON CONFLICT DO NOTHING`) — the unique
/// key makes the write idempotent at the storage layer.
pub async fn append(
    tx: &mut Transaction<'_, Postgres>,
    record: &AuditRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO audit_events
            (event_id, event_type, aggregate_id, occurred_at, payload,
             received_at, message_id, correlation_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(record.event_id)
    .bind(&record.event_type)
    .bind(record.aggregate_id)
    .bind(record.occurred_at)
    .bind(&record.payload)
    .bind(record.received_at)
    .bind(&record.message_id)
    .bind(&record.correlation_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// All records for one document, receipt order (oldest first), producer
/// timestamp as tie-break.
///
/// Unknown aggregates return an empty vec, not an error.
pub async fn records_for_aggregate(
    pool: &PgPool,
    aggregate_id: Uuid,
) -> Result<Vec<AuditRecord>, sqlx::Error> {
    sqlx::query_as::<_, AuditRecord>(
        r#"
        SELECT event_id, event_type, aggregate_id, occurred_at, payload,
               received_at, message_id, correlation_id
        FROM audit_events
        WHERE aggregate_id = $1
        ORDER BY received_at ASC, occurred_at ASC
        "#,
    )
    .bind(aggregate_id)
    .fetch_all(pool)
    .await
}

/// Look up a single record by event id
pub async fn lookup(pool: &PgPool, event_id: Uuid) -> Result<Option<AuditRecord>, sqlx::Error> {
    sqlx::query_as::<_, AuditRecord>(
        r#"
        SELECT event_id, event_type, aggregate_id, occurred_at, payload,
               received_at, message_id, correlation_id
        FROM audit_events
        WHERE event_id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await
}
