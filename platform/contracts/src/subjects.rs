//! Bus subjects for document lifecycle events
//!
//! Subject layout follows the platform convention
//! `<producer>.events.<entity>.<action>`. The aggregate id is NOT part of the
//! subject; per-aggregate ordering is supplied by the transport's
//! partitioning, not by subject fan-out.

/// Published when a document lands in storage
pub const DOCUMENT_UPLOADED: &str = "docs.events.document.uploaded";

/// Published when validation accepts a document
pub const DOCUMENT_VALIDATED: &str = "docs.events.document.validated";

/// Published when validation rejects a document
pub const DOCUMENT_REJECTED: &str = "docs.events.document.rejected";

/// Published by the enrichment service with classification results
pub const DOCUMENT_ENRICHED: &str = "docs.events.document.enriched";

/// Wildcard every document consumer subscribes to
pub const DOCUMENT_EVENTS_WILDCARD: &str = "docs.events.document.>";
