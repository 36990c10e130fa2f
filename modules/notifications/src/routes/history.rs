//! Notification read-side API
//!
//! History by document or recipient (most recent first), sent-check by event
//! id, and per-type counts for monitoring.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::repos::notification_repo::{self, NotificationRecord};

/// One sent notification, as exposed to operators
#[derive(Debug, Serialize)]
pub struct NotificationRecordResponse {
    pub event_id: Uuid,
    pub aggregate_id: Uuid,
    pub event_type: String,
    pub recipient: String,
    pub channel: String,
    pub sent_at: DateTime<Utc>,
}

impl From<NotificationRecord> for NotificationRecordResponse {
    fn from(r: NotificationRecord) -> Self {
        Self {
            event_id: r.event_id,
            aggregate_id: r.aggregate_id,
            event_type: r.event_type,
            recipient: r.recipient,
            channel: r.channel,
            sent_at: r.sent_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentHistoryResponse {
    pub aggregate_id: Uuid,
    /// Most recent first
    pub notifications: Vec<NotificationRecordResponse>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct RecipientHistoryResponse {
    pub recipient: String,
    /// Most recent first
    pub notifications: Vec<NotificationRecordResponse>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct NotifiedResponse {
    pub event_id: Uuid,
    pub notified: bool,
}

#[derive(Debug, Serialize)]
pub struct CountByTypeResponse {
    pub event_type: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type RouteError = (StatusCode, Json<ErrorResponse>);

fn internal_error(e: sqlx::Error) -> RouteError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("Query failed: {}", e),
        }),
    )
}

/// Handler for GET /api/notifications/documents/{aggregate_id}/history
pub async fn get_document_history(
    State(pool): State<Arc<PgPool>>,
    Path(aggregate_id): Path<Uuid>,
) -> Result<Json<DocumentHistoryResponse>, RouteError> {
    let records = notification_repo::history_for_aggregate(&pool, aggregate_id)
        .await
        .map_err(internal_error)?;

    let notifications: Vec<NotificationRecordResponse> =
        records.into_iter().map(Into::into).collect();
    let count = notifications.len();

    Ok(Json(DocumentHistoryResponse {
        aggregate_id,
        notifications,
        count,
    }))
}

/// Handler for GET /api/notifications/recipients/{recipient}/history
pub async fn get_recipient_history(
    State(pool): State<Arc<PgPool>>,
    Path(recipient): Path<String>,
) -> Result<Json<RecipientHistoryResponse>, RouteError> {
    let records = notification_repo::history_for_recipient(&pool, &recipient)
        .await
        .map_err(internal_error)?;

    let notifications: Vec<NotificationRecordResponse> =
        records.into_iter().map(Into::into).collect();
    let count = notifications.len();

    Ok(Json(RecipientHistoryResponse {
        recipient,
        notifications,
        count,
    }))
}

/// Handler for GET /api/notifications/events/{event_id}
pub async fn get_notified(
    State(pool): State<Arc<PgPool>>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<NotifiedResponse>, RouteError> {
    let notified = notification_repo::has_notified(&pool, event_id)
        .await
        .map_err(internal_error)?;

    Ok(Json(NotifiedResponse { event_id, notified }))
}

/// Handler for GET /api/notifications/counts/{event_type}
pub async fn get_count_by_type(
    State(pool): State<Arc<PgPool>>,
    Path(event_type): Path<String>,
) -> Result<Json<CountByTypeResponse>, RouteError> {
    let count = notification_repo::count_by_type(&pool, &event_type)
        .await
        .map_err(internal_error)?;

    Ok(Json(CountByTypeResponse { event_type, count }))
}
