use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::notifications::{MarkReadOutcome, NotificationService};
use crate::domain::notification::{NewNotification, Notification, NotificationKind};
use crate::http::response::ApiResponse;
use crate::http::{AdminToken, AppError, AuthUser};
use crate::infra::store::PageCursor;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;
const MAX_TITLE_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 2000;

#[derive(Serialize)]
pub struct HealthStatus {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct ListNotificationsQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Serialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub next_cursor: Option<String>,
}

#[derive(Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

#[derive(Deserialize)]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: Option<Value>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<PageCursor>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<PageCursor>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthStatus>> {
    let status = match state.store.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = ?err, "store ping failed");
            "degraded"
        }
    };

    Json(ApiResponse::data(HealthStatus { status }))
}

pub async fn not_found() -> AppError {
    AppError::not_found("Not found")
}

pub async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}

pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    query: Result<Query<ListNotificationsQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<NotificationPage>>, AppError> {
    let Query(query) = query.map_err(|_| AppError::bad_request("invalid query parameters"))?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::bad_request("limit must be between 1 and 100"));
    }
    let cursor = parse_cursor(query.cursor)?;

    let service = NotificationService::new(state.store.clone());
    let mut notifications = service
        .list(auth.user_id, query.unread_only, cursor, limit + 1)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %auth.user_id, "failed to list notifications");
            AppError::internal("Failed to fetch notifications")
        })?;

    let next_cursor = if notifications.len() > limit as usize {
        notifications.truncate(limit as usize);
        notifications.last().map(|last| (last.created_at, last.id))
    } else {
        None
    };

    Ok(Json(ApiResponse::data(NotificationPage {
        items: notifications,
        next_cursor: encode_cursor(next_cursor),
    })))
}

pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<UnreadCount>>, AppError> {
    let service = NotificationService::new(state.store.clone());
    let unread = service.unread_count(auth.user_id).await.map_err(|err| {
        tracing::error!(
            error = ?err,
            user_id = %auth.user_id,
            "failed to count unread notifications"
        );
        AppError::internal("Failed to fetch unread count")
    })?;

    Ok(Json(ApiResponse::data(UnreadCount { unread })))
}

pub async fn mark_notification_read(
    auth: AuthUser,
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let Path(id) = id.map_err(|_| AppError::bad_request("invalid notification id"))?;

    let service = NotificationService::new(state.store.clone());
    let outcome = service
        .mark_read(id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(
                error = ?err,
                notification_id = %id,
                user_id = %auth.user_id,
                "failed to mark notification read"
            );
            AppError::internal("Failed to mark as read")
        })?;

    match outcome {
        MarkReadOutcome::Marked | MarkReadOutcome::AlreadyRead => {
            Ok(Json(ApiResponse::message("Notification marked as read")))
        }
        MarkReadOutcome::NotFound => Err(AppError::not_found("Notification not found")),
    }
}

pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    let service = NotificationService::new(state.store.clone());
    let outcome = service.mark_all_read(auth.user_id).await.map_err(|err| {
        tracing::error!(
            error = ?err,
            user_id = %auth.user_id,
            "failed to mark all notifications read"
        );
        AppError::internal("Failed to mark all as read")
    })?;

    tracing::info!(
        user_id = %auth.user_id,
        updated = outcome.updated,
        "marked all notifications read"
    );
    Ok(Json(ApiResponse::message("All notifications marked as read")))
}

pub async fn create_notification(
    _admin: AdminToken,
    State(state): State<AppState>,
    payload: Result<Json<CreateNotificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<Notification>>), AppError> {
    let Json(payload) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let title = payload.title.trim().to_string();
    let message = payload.message.trim().to_string();
    if title.is_empty() || message.is_empty() {
        return Err(AppError::bad_request("title and message are required"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::bad_request("title must be at most 200 characters"));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::bad_request("message must be at most 2000 characters"));
    }
    let payload_value = match payload.payload {
        None | Some(Value::Null) => Value::Object(Default::default()),
        Some(value @ Value::Object(_)) => value,
        Some(_) => return Err(AppError::bad_request("payload must be a JSON object")),
    };

    let draft = NewNotification {
        user_id: payload.user_id,
        kind: payload.kind,
        title,
        message,
        payload: payload_value,
    };

    let service = NotificationService::new(state.store.clone());
    let notification = service.create(draft).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %payload.user_id, "failed to create notification");
        AppError::internal("Failed to create notification")
    })?;

    Ok((StatusCode::CREATED, Json(ApiResponse::data(notification))))
}
