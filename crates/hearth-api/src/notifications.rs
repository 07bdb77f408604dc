use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use serde::Deserialize;

use hearth_types::api::{StatusMessage, UnreadCount};
use hearth_types::models::Notification;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiQuery, Page, default_limit};
use crate::middleware::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", get(list).delete(clear))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/mark-all-read", post(mark_all_read))
        .route("/api/notifications/{notification_id}/read", post(mark_read))
        .route("/api/notifications/{notification_id}", delete(remove))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub unread_only: bool,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let (skip, limit) = Page {
        skip: q.skip,
        limit: q.limit,
    }
    .bounds();
    Ok(Json(state.db.list_notifications(auth.id, q.unread_only, skip, limit)?))
}

pub async fn unread_count(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UnreadCount>> {
    Ok(Json(UnreadCount {
        unread_count: state.db.unread_notification_count(auth.id)?,
    }))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<i64>,
) -> ApiResult<Json<Notification>> {
    state
        .db
        .mark_notification_read(notification_id, auth.id)?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn mark_all_read(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<StatusMessage>> {
    let n = state.db.mark_all_notifications_read(auth.id)?;
    Ok(Json(StatusMessage::new(format!("Marked {} notifications as read", n))))
}

pub async fn remove(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_notification(notification_id, auth.id)? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<StatusMessage>> {
    let n = state.db.clear_notifications(auth.id)?;
    Ok(Json(StatusMessage::new(format!("Cleared {} notifications", n))))
}

fn not_found() -> ApiError {
    ApiError::NotFound("Notification not found".into())
}
