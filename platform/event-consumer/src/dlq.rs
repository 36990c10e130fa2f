//! Dead-letter path for permanently unprocessable messages
//!
//! Malformed envelopes and retry-exhausted messages land in the consuming
//! service's `failed_events` table with whatever identity could still be
//! extracted, so operators can distinguish "needs a code fix" from "will
//! self-heal" and replay once fixed.

use event_bus::BusMessage;
use sqlx::PgPool;
use uuid::Uuid;

/// Write a failed message to the dead-letter table.
///
/// Best-effort by design: a failure to dead-letter is logged loudly but
/// never propagated, because the processing outcome has already been decided
/// when this runs.
pub async fn record_failure(pool: &PgPool, msg: &BusMessage, error: &str, retry_count: i32) {
    // Extract what identity we can; malformed envelopes may have none
    let envelope_json = serde_json::from_slice::<serde_json::Value>(&msg.payload).ok();

    let event_id = envelope_json
        .as_ref()
        .and_then(|v| v.get("event_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());

    let aggregate_id = envelope_json
        .as_ref()
        .and_then(|v| v.get("aggregate_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());

    let correlation_id = envelope_json
        .as_ref()
        .and_then(|v| v.get("correlation_id"))
        .and_then(|v| v.as_str())
        .unwrap_or("none")
        .to_string();

    let insert = sqlx::query(
        r#"
        INSERT INTO failed_events (event_id, subject, aggregate_id, envelope, error, retry_count)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(event_id)
    .bind(&msg.subject)
    .bind(aggregate_id)
    .bind(envelope_json)
    .bind(error)
    .bind(retry_count)
    .execute(pool)
    .await;

    match insert {
        Ok(_) => {
            tracing::error!(
                event_id = ?event_id,
                subject = %msg.subject,
                aggregate_id = ?aggregate_id,
                correlation_id = %correlation_id,
                retry_count,
                error = %error,
                "Event moved to dead-letter queue"
            );
        }
        Err(dlq_err) => {
            tracing::error!(
                event_id = ?event_id,
                subject = %msg.subject,
                retry_count,
                error = %error,
                dlq_error = %dlq_err,
                "Failed to write to dead-letter queue - event may be lost!"
            );
        }
    }
}
