//! The notification consumer's event effect: deliver once, record once

use event_consumer::{EffectError, EventEffect, ReceivedEnvelope};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

use crate::messages::build_message;
use crate::notifier::NotificationChannel;
use crate::repos::notification_repo;

/// Sends at most one notification per triggering event.
///
/// Delivery happens inside the processing unit of work: the sent-record and
/// the ledger claim commit together, and the record insert is idempotent on
/// `event_id` so the commit-then-redeliver window cannot double-record.
pub struct NotificationEffect {
    pool: PgPool,
    channel: Arc<dyn NotificationChannel>,
}

impl NotificationEffect {
    pub fn new(pool: PgPool, channel: Arc<dyn NotificationChannel>) -> Self {
        Self { pool, channel }
    }
}

#[async_trait::async_trait]
impl EventEffect for NotificationEffect {
    fn consumer_name(&self) -> &'static str {
        "notifications"
    }

    async fn apply(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        envelope: &ReceivedEnvelope,
    ) -> Result<(), EffectError> {
        let message = match build_message(envelope) {
            Ok(Some(message)) => message,
            Ok(None) => {
                // Outside the closed enumeration; claim it quietly
                tracing::info!(
                    event_id = %envelope.event_id,
                    event_type = %envelope.event_type,
                    "No notification defined for event type, skipping delivery"
                );
                return Ok(());
            }
            Err(e) => return Err(EffectError::Permanent(e.to_string())),
        };

        // Defense in depth against a ledger/effect race; the claim already
        // guards the normal path
        if notification_repo::has_notified(&self.pool, envelope.event_id).await? {
            tracing::debug!(
                event_id = %envelope.event_id,
                "Notification already sent, skipping delivery"
            );
            return Ok(());
        }

        self.channel
            .deliver(&message)
            .await
            .map_err(|e| EffectError::Retryable(e.to_string()))?;

        notification_repo::record(
            tx,
            envelope.event_id,
            envelope.aggregate_id,
            &envelope.event_type,
            &message.recipient,
            self.channel.name(),
        )
        .await?;

        tracing::info!(
            event_id = %envelope.event_id,
            recipient = %message.recipient,
            channel = self.channel.name(),
            "Notification recorded"
        );

        Ok(())
    }
}
