//! Idempotency ledger: the persisted set of processed event ids
//!
//! One `processed_events` table per consuming service, primary-keyed on
//! `event_id`. The ledger is a correctness-critical write-ahead record, not a
//! cache: the claim insert is the single atomic primitive that resolves
//! concurrent deliveries of the same event, across threads and across
//! processes, by leaning on the store's constraint enforcement instead of
//! in-process locking.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Outcome of a claim attempt.
///
/// `AlreadyClaimed` is a normal outcome, never an error — duplicate delivery
/// is an expected operating condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// This caller owns the event; exactly one claimant per event id
    Claimed,
    /// Another delivery already claimed the event
    AlreadyClaimed,
}

/// One row of the ledger
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerEntry {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub processed_at: DateTime<Utc>,
}

/// Has this event already been fully processed? Pure lookup, no side effect.
pub async fn has_processed(pool: &PgPool, event_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM processed_events WHERE event_id = $1)",
    )
    .bind(event_id)
    .fetch_one(pool)
    .await
}

/// Atomically claim an event inside the caller's transaction.
///
/// Insert-if-absent on the `processed_events` primary key: with K concurrent
/// claimants for one `event_id`, exactly one sees `Claimed` and the rest see
/// `AlreadyClaimed`, regardless of scheduling. The row becomes durable only
/// when the caller's transaction commits, so a rolled-back effect releases
/// its claim with it.
pub async fn claim(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    event_type: &str,
    aggregate_id: Uuid,
) -> Result<ClaimOutcome, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO processed_events (event_id, event_type, aggregate_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(event_id)
    .bind(event_type)
    .bind(aggregate_id)
    .execute(&mut **tx)
    .await?;

    if result.rows_affected() == 1 {
        Ok(ClaimOutcome::Claimed)
    } else {
        Ok(ClaimOutcome::AlreadyClaimed)
    }
}

/// Read back a ledger entry (diagnostics and tests)
pub async fn entry_for(pool: &PgPool, event_id: Uuid) -> Result<Option<LedgerEntry>, sqlx::Error> {
    sqlx::query_as::<_, LedgerEntry>(
        r#"
        SELECT event_id, event_type, aggregate_id, processed_at
        FROM processed_events
        WHERE event_id = $1
        "#,
    )
    .bind(event_id)
    .fetch_optional(pool)
    .await
}
