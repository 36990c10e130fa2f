//! # Idempotent Event-Processing Core
//!
//! Turns the bus's at-least-once delivery into at-most-once side effects per
//! consumer. Every consuming service drives its messages through the same
//! machinery:
//!
//! 1. [`ReceivedEnvelope`] — parse and validate the wire envelope, stamping
//!    receipt time and transport metadata. Malformed input is a permanent
//!    error routed to the dead-letter path, never retried.
//! 2. [`ledger`] — the idempotency ledger. [`ledger::claim`] is the atomic
//!    insert-if-absent primitive everything else leans on: exactly one caller
//!    observes [`ClaimOutcome::Claimed`] per event id, under cross-process
//!    concurrency, enforced by the `processed_events` primary key.
//! 3. [`EventProcessor`] — the per-message state machine. The claim and the
//!    service-specific [`EventEffect`] commit in one transaction, so a claim
//!    is never durable without its effect.
//! 4. [`dlq`] — dead-letter writes for malformed envelopes and messages that
//!    exhausted their retries.
//!
//! Duplicate delivery is an expected operating condition: it surfaces as
//! [`ProcessOutcome::Deduplicated`], logs at debug, and is outwardly
//! indistinguishable from the message never having been redelivered.

pub mod dlq;
pub mod ledger;
mod processor;
mod received;

pub use ledger::{ClaimOutcome, LedgerEntry};
pub use processor::{EffectError, EventEffect, EventProcessor, ProcessOutcome, ProcessingError};
pub use received::{MalformedEnvelope, ReceivedEnvelope};
