//! Scheduled messages are stored and managed here; nothing delivers them.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use hearth_types::api::{CreateScheduledRequest, UpdateScheduledRequest};
use hearth_types::models::ScheduledMessage;

use crate::AppState;
use crate::access::{self, Target};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;

const STATUSES: &[&str] = &["pending", "sent", "cancelled"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/scheduled", get(list_scheduled).post(create_scheduled))
        .route(
            "/api/scheduled/{scheduled_id}",
            get(get_scheduled).put(update_scheduled).delete(cancel_scheduled),
        )
}

pub async fn create_scheduled(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateScheduledRequest>,
) -> ApiResult<impl IntoResponse> {
    check_future(req.scheduled_for)?;
    match access::exactly_one(
        req.channel_id,
        req.receiver_id,
        "Provide exactly one of channel_id or receiver_id",
    )? {
        Target::First(channel_id) => {
            access::channel(&state.db, channel_id)?;
            access::require_member(&state.db, channel_id, auth.id)?;
        }
        Target::Second(receiver_id) => access::require_user(&state.db, receiver_id)?,
    }

    let scheduled = state.db.create_scheduled(
        auth.id,
        req.channel_id,
        req.receiver_id,
        &req.content,
        req.formatting.as_deref(),
        req.mentions.as_deref(),
        req.scheduled_for,
    )?;
    Ok((StatusCode::CREATED, Json(scheduled)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub async fn list_scheduled(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<ScheduledMessage>>> {
    let status = q.status.as_deref().unwrap_or("pending");
    if !STATUSES.contains(&status) {
        return Err(ApiError::Validation(format!(
            "status must be one of: {}",
            STATUSES.join(", ")
        )));
    }
    Ok(Json(state.db.list_scheduled(auth.id, status)?))
}

pub async fn get_scheduled(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(scheduled_id): Path<i64>,
) -> ApiResult<Json<ScheduledMessage>> {
    Ok(Json(owned(&state, scheduled_id, auth.id)?))
}

pub async fn update_scheduled(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(scheduled_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateScheduledRequest>,
) -> ApiResult<Json<ScheduledMessage>> {
    let current = owned(&state, scheduled_id, auth.id)?;
    require_pending(&current)?;
    if let Some(at) = req.scheduled_for {
        check_future(at)?;
    }

    state.db.update_scheduled(
        scheduled_id,
        req.content.as_deref(),
        req.formatting.as_deref(),
        req.mentions.as_deref(),
        req.scheduled_for,
    )?;
    Ok(Json(owned(&state, scheduled_id, auth.id)?))
}

/// Marks a pending message cancelled; the row is kept.
pub async fn cancel_scheduled(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(scheduled_id): Path<i64>,
) -> ApiResult<Json<ScheduledMessage>> {
    let current = owned(&state, scheduled_id, auth.id)?;
    require_pending(&current)?;

    state.db.cancel_scheduled(scheduled_id)?;
    Ok(Json(owned(&state, scheduled_id, auth.id)?))
}

fn owned(state: &AppState, id: i64, user_id: i64) -> ApiResult<ScheduledMessage> {
    state
        .db
        .get_scheduled(id, user_id)?
        .ok_or_else(|| ApiError::NotFound("Scheduled message not found".into()))
}

fn require_pending(s: &ScheduledMessage) -> ApiResult<()> {
    if s.status != "pending" {
        return Err(ApiError::Validation(format!(
            "Scheduled message is already {}",
            s.status
        )));
    }
    Ok(())
}

fn check_future(at: DateTime<Utc>) -> ApiResult<()> {
    if at <= Utc::now() {
        return Err(ApiError::Validation("Scheduled time must be in the future".into()));
    }
    Ok(())
}
