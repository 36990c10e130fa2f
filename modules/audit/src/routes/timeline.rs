//! Audit read-side API
//!
//! Timeline reconstruction per document and single-record lookup by event id.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::audit_repo;
use crate::timeline;

/// Timeline response for one document
#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    pub aggregate_id: Uuid,
    /// Human-readable event descriptions, oldest first
    pub ordered_event_descriptions: Vec<String>,
    pub event_count: usize,
}

/// One audit record, as exposed to operators
#[derive(Debug, Serialize)]
pub struct AuditRecordResponse {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
    pub received_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler for GET /api/audit/documents/{aggregate_id}/timeline
///
/// Unknown documents return an empty timeline with `event_count: 0`.
pub async fn get_timeline(
    State(pool): State<Arc<PgPool>>,
    Path(aggregate_id): Path<Uuid>,
) -> Result<Json<TimelineResponse>, (StatusCode, Json<ErrorResponse>)> {
    let descriptions = timeline::timeline_for(&pool, aggregate_id)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Failed to fetch timeline: {}", e),
                }),
            )
        })?;

    let event_count = descriptions.len();

    Ok(Json(TimelineResponse {
        aggregate_id,
        ordered_event_descriptions: descriptions,
        event_count,
    }))
}

/// Handler for GET /api/audit/events/{event_id}
pub async fn get_audit_record(
    State(pool): State<Arc<PgPool>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<AuditRecordResponse>, (StatusCode, Json<ErrorResponse>)> {
    let record = audit_repo::lookup(&pool, event_id).await.map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Failed to fetch audit record: {}", e),
            }),
        )
    })?;

    match record {
        Some(r) => Ok(Json(AuditRecordResponse {
            event_id: r.event_id,
            event_type: r.event_type,
            aggregate_id: r.aggregate_id,
            occurred_at: r.occurred_at,
            payload: r.payload,
            received_at: r.received_at,
            message_id: r.message_id,
            correlation_id: r.correlation_id,
        })),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("No audit record for event {}", event_id),
            }),
        )),
    }
}
