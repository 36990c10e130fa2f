//! Notification consumer task: subscribes to document events and delivers

use document_contracts::subjects::DOCUMENT_EVENTS_WILDCARD;
use event_bus::EventBus;
use event_consumer::{dlq, EventProcessor, ProcessOutcome};
use futures::StreamExt;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

use crate::effect::NotificationEffect;
use crate::notifier::NotificationChannel;

/// Start the notification consumer task.
///
/// Spawns a background task that subscribes to every document lifecycle
/// event, sends at most one notification per event through the configured
/// channel, and dead-letters messages that are malformed or exhausted their
/// retries.
pub async fn start_document_events_consumer(
    bus: Arc<dyn EventBus>,
    pool: PgPool,
    channel: Arc<dyn NotificationChannel>,
) {
    tokio::spawn(async move {
        tracing::info!("Starting notification consumer");

        let subject = DOCUMENT_EVENTS_WILDCARD;
        let mut stream = match bus.subscribe(subject).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to subscribe to {}: {}", subject, e);
                return;
            }
        };

        tracing::info!("Subscribed to {}", subject);

        let processor = EventProcessor::new(pool.clone());
        let effect = NotificationEffect::new(pool.clone(), channel);

        while let Some(msg) = stream.next().await {
            let span = tracing::info_span!(
                "notification_event",
                subject = %msg.subject,
                message_id = %msg.message_id().unwrap_or("none")
            );

            async {
                match processor.process_with_retry(&msg, &effect).await {
                    Ok(ProcessOutcome::Applied) => {}
                    Ok(ProcessOutcome::Deduplicated) => {
                        // Expected under at-least-once delivery; nothing to do
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            retryable = e.is_retryable(),
                            "Notification processing failed, dead-lettering"
                        );
                        dlq::record_failure(
                            &pool,
                            &msg,
                            &e.to_string(),
                            processor.max_attempts() as i32,
                        )
                        .await;
                    }
                }
            }
            .instrument(span)
            .await;
        }

        tracing::warn!("Notification consumer stopped");
    });
}
