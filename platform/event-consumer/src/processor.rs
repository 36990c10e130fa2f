//! Per-message processor: the state machine between receipt and terminal
//! outcome
//!
//! Received → Deduplicated (duplicate, no-op)
//! Received → Claimed → Applied (effect + claim committed together)
//! Received → Claimed → Failed (rolled back; claim never committed alone)

use event_bus::consumer_retry::{retry_with_backoff, RetryConfig};
use event_bus::BusMessage;
use sqlx::{PgPool, Postgres, Transaction};

use crate::ledger::{self, ClaimOutcome};
use crate::received::{MalformedEnvelope, ReceivedEnvelope};

/// Terminal outcome of processing one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Effect and ledger entry committed
    Applied,
    /// Event id already claimed; nothing done. Outwardly indistinguishable
    /// from the message never having been redelivered.
    Deduplicated,
}

/// Failure inside a service-specific effect
#[derive(Debug, thiserror::Error)]
pub enum EffectError {
    /// Worth re-attempting (downstream briefly unreachable, lock timeout)
    #[error("{0}")]
    Retryable(String),

    /// Re-attempting cannot succeed; dead-letter instead
    #[error("{0}")]
    Permanent(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Processing failure taxonomy.
///
/// Retryable failures leave the message eligible for redelivery; permanent
/// ones go to the dead-letter path. Duplicates are not here at all — they are
/// a [`ProcessOutcome`], not an error.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] MalformedEnvelope),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("effect failed: {0}")]
    Effect(String),

    #[error("effect failed permanently: {0}")]
    EffectPermanent(String),
}

impl ProcessingError {
    /// Transient failures self-heal on redelivery; the rest need a code or
    /// data fix and belong in the dead-letter queue.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProcessingError::Storage(_) | ProcessingError::Effect(_)
        )
    }
}

impl From<EffectError> for ProcessingError {
    fn from(e: EffectError) -> Self {
        match e {
            EffectError::Retryable(msg) => ProcessingError::Effect(msg),
            EffectError::Permanent(msg) => ProcessingError::EffectPermanent(msg),
            EffectError::Database(e) => ProcessingError::Storage(e),
        }
    }
}

/// The service-specific side effect of one event.
///
/// Runs inside the processor's transaction, after the claim. Effects must be
/// idempotent at the storage layer (upserts keyed by `event_id`): the joint
/// commit already prevents claim-without-effect, and effect idempotency
/// additionally keeps the commit-then-redeliver window safe.
#[async_trait::async_trait]
pub trait EventEffect: Send + Sync {
    /// Consumer name for logs and spans (e.g. "audit", "notifications")
    fn consumer_name(&self) -> &'static str;

    async fn apply(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        envelope: &ReceivedEnvelope,
    ) -> Result<(), EffectError>;
}

/// Drives every received message through claim-and-effect.
#[derive(Clone)]
pub struct EventProcessor {
    pool: PgPool,
    retry: RetryConfig,
}

impl EventProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Process one validated envelope to a terminal outcome.
    ///
    /// The claim and the effect commit in one transaction: a failed effect
    /// rolls the claim back with it, and a duplicate claim rolls back having
    /// changed nothing.
    pub async fn process(
        &self,
        envelope: &ReceivedEnvelope,
        effect: &dyn EventEffect,
    ) -> Result<ProcessOutcome, ProcessingError> {
        // Fast path: already processed, skip without opening a transaction
        if ledger::has_processed(&self.pool, envelope.event_id).await? {
            tracing::debug!(
                event_id = %envelope.event_id,
                subject = %envelope.subject,
                consumer = effect.consumer_name(),
                "Event already processed, skipping"
            );
            return Ok(ProcessOutcome::Deduplicated);
        }

        let mut tx = self.pool.begin().await?;

        match ledger::claim(
            &mut tx,
            envelope.event_id,
            &envelope.event_type,
            envelope.aggregate_id,
        )
        .await?
        {
            ClaimOutcome::AlreadyClaimed => {
                // Lost the race to a concurrent delivery
                tx.rollback().await?;
                tracing::debug!(
                    event_id = %envelope.event_id,
                    consumer = effect.consumer_name(),
                    "Concurrent delivery already claimed event"
                );
                Ok(ProcessOutcome::Deduplicated)
            }
            ClaimOutcome::Claimed => match effect.apply(&mut tx, envelope).await {
                Ok(()) => {
                    tx.commit().await?;
                    tracing::info!(
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        aggregate_id = %envelope.aggregate_id,
                        consumer = effect.consumer_name(),
                        "Event processed"
                    );
                    Ok(ProcessOutcome::Applied)
                }
                Err(e) => {
                    // Roll the claim back with the effect; redelivery retries both
                    if let Err(rollback_err) = tx.rollback().await {
                        tracing::warn!(
                            event_id = %envelope.event_id,
                            error = %rollback_err,
                            "Rollback after effect failure also failed"
                        );
                    }
                    Err(e.into())
                }
            },
        }
    }

    /// Parse, validate, and process a raw bus message.
    pub async fn process_message(
        &self,
        msg: &BusMessage,
        effect: &dyn EventEffect,
    ) -> Result<ProcessOutcome, ProcessingError> {
        let envelope = ReceivedEnvelope::from_message(msg)?;
        self.process(&envelope, effect).await
    }

    /// [`Self::process_message`] under the platform's bounded backoff.
    ///
    /// Only retryable failures re-attempt; malformed envelopes and permanent
    /// effect failures return immediately so the caller can dead-letter them.
    pub async fn process_with_retry(
        &self,
        msg: &BusMessage,
        effect: &dyn EventEffect,
    ) -> Result<ProcessOutcome, ProcessingError> {
        // Permanent errors tunnel through the Ok arm so the retry loop only
        // ever sees errors worth re-attempting.
        let result = retry_with_backoff(
            || async move {
                match self.process_message(msg, effect).await {
                    Ok(outcome) => Ok(Ok(outcome)),
                    Err(e) if e.is_retryable() => Err(e),
                    Err(e) => Ok(Err(e)),
                }
            },
            &self.retry,
            effect.consumer_name(),
        )
        .await;

        match result {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(permanent)) => Err(permanent),
            Err(exhausted) => Err(exhausted),
        }
    }

    /// Retry attempts configured for this processor (dead-letter reporting)
    pub fn max_attempts(&self) -> u32 {
        self.retry.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_are_retryable() {
        let err = ProcessingError::Storage(sqlx::Error::PoolTimedOut);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_malformed_is_permanent() {
        let err = ProcessingError::Malformed(MalformedEnvelope {
            subject: "docs.events.document.uploaded".to_string(),
            reason: "missing event_id".to_string(),
        });
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_effect_error_mapping() {
        let retryable: ProcessingError =
            EffectError::Retryable("smtp unreachable".to_string()).into();
        assert!(retryable.is_retryable());

        let permanent: ProcessingError =
            EffectError::Permanent("unknown recipient".to_string()).into();
        assert!(!permanent.is_retryable());
    }
}
