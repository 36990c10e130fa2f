//! The audit consumer's event effect: append one trail row per envelope

use event_consumer::{EffectError, EventEffect, ReceivedEnvelope};
use sqlx::{Postgres, Transaction};

use crate::repos::audit_repo::{self, AuditRecord};

/// Appends every received envelope to the audit trail.
///
/// Runs inside the processor's transaction, so the trail row and the ledger
/// claim commit together. The append is additionally idempotent on
/// `event_id`, which keeps a commit-then-redeliver race harmless.
pub struct AuditEffect;

#[async_trait::async_trait]
impl EventEffect for AuditEffect {
    fn consumer_name(&self) -> &'static str {
        "audit"
    }

    async fn apply(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        envelope: &ReceivedEnvelope,
    ) -> Result<(), EffectError> {
        let record = AuditRecord {
            event_id: envelope.event_id,
            event_type: envelope.event_type.clone(),
            aggregate_id: envelope.aggregate_id,
            occurred_at: envelope.occurred_at,
            payload: envelope.payload.clone(),
            received_at: envelope.received_at,
            message_id: envelope.message_id.clone(),
            correlation_id: envelope.correlation_id.clone(),
        };

        audit_repo::append(tx, &record).await?;

        Ok(())
    }
}
