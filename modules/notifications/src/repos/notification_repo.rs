//! Notification ledger: one row per notification actually sent
//!
//! Primary-keyed on the triggering `event_id`, so a redelivered event can
//! never record a second send. A document accumulates one row per lifecycle
//! event; a recipient accumulates one row per event they were notified about.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// One sent notification
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRecord {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub recipient: String,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
}

/// Has a notification already been sent for this event?
///
/// Defense in depth: the processor's claim already prevents duplicate
/// effects, but this check keeps a ledger/effect race harmless if a channel
/// send ever ends up outside the joint commit.
pub async fn has_notified(pool: &PgPool, event_id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM notifications_sent WHERE event_id = $1)",
    )
    .bind(event_id)
    .fetch_one(pool)
    .await
}

/// Record a sent notification inside the caller's transaction.
///
/// Idempotent insert keyed by `event_id`; a duplicate is a no-op.
pub async fn record(
    tx: &mut Transaction<'_, Postgres>,
    event_id: Uuid,
    aggregate_id: Uuid,
    event_type: &str,
    recipient: &str,
    channel: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO notifications_sent (event_id, aggregate_id, event_type, recipient, channel)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(event_id)
    .bind(aggregate_id)
    .bind(event_type)
    .bind(recipient)
    .bind(channel)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Notification history for one document, most recent first
pub async fn history_for_aggregate(
    pool: &PgPool,
    aggregate_id: Uuid,
) -> Result<Vec<NotificationRecord>, sqlx::Error> {
    sqlx::query_as::<_, NotificationRecord>(
        r#"
        SELECT event_id, aggregate_id, event_type, recipient, channel, sent_at
        FROM notifications_sent
        WHERE aggregate_id = $1
        ORDER BY sent_at DESC, event_id DESC
        "#,
    )
    .bind(aggregate_id)
    .fetch_all(pool)
    .await
}

/// Notification history for one recipient, most recent first
pub async fn history_for_recipient(
    pool: &PgPool,
    recipient: &str,
) -> Result<Vec<NotificationRecord>, sqlx::Error> {
    sqlx::query_as::<_, NotificationRecord>(
        r#"
        SELECT event_id, aggregate_id, event_type, recipient, channel, sent_at
        FROM notifications_sent
        WHERE recipient = $1
        ORDER BY sent_at DESC, event_id DESC
        "#,
    )
    .bind(recipient)
    .fetch_all(pool)
    .await
}

/// How many notifications have been sent for one event type (monitoring)
pub async fn count_by_type(pool: &PgPool, event_type: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM notifications_sent WHERE event_type = $1",
    )
    .bind(event_type)
    .fetch_one(pool)
    .await
}
