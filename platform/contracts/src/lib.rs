//! # Document Event Contracts
//!
//! Canonical contracts for document lifecycle events, shared by the upstream
//! producer (doc-mgmt, enrichment) and every consumer (audit, notifications).
//!
//! The event-type enumeration is **closed and append-only**: new kinds may be
//! added at the end, existing wire names never change. Payload structs are
//! versioned (`...V1`) so fields can evolve behind a new version without
//! breaking deployed consumers.

mod events;
pub mod subjects;

pub use events::{
    DocumentEnrichedV1, DocumentEvent, DocumentEventKind, DocumentRejectedV1, DocumentUploadedV1,
    DocumentValidatedV1, UnknownEventKind,
};
