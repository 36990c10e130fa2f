//! Audit consumer task: subscribes to document events and appends the trail

use document_contracts::subjects::DOCUMENT_EVENTS_WILDCARD;
use event_bus::EventBus;
use event_consumer::{dlq, EventProcessor, ProcessOutcome};
use futures::StreamExt;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Instrument;

use crate::effect::AuditEffect;

/// Start the audit consumer task.
///
/// Spawns a background task that subscribes to every document lifecycle
/// event, drives each message through the idempotent processor, and
/// dead-letters messages that are malformed or exhausted their retries.
pub async fn start_document_events_consumer(bus: Arc<dyn EventBus>, pool: PgPool) {
    tokio::spawn(async move {
        tracing::info!("Starting audit consumer");

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
        let effect = AuditEffect;

        while let Some(msg) = stream.next().await {
            let span = tracing::info_span!(
                "audit_event",
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
                            "Audit processing failed, dead-lettering"
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

        tracing::warn!("Audit consumer stopped");
    });
}
