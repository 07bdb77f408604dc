use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;
use uuid::Uuid;

use hearth_types::api::{ActiveCalls, StartCallRequest};
use hearth_types::models::Call;

use crate::AppState;
use crate::access::{self, Target};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::notify;

const CALL_TYPES: &[&str] = &["audio", "video"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/calls/start", post(start_call))
        .route("/api/calls/active", get(active_calls))
        .route("/api/calls/{call_id}/end", post(end_call))
}

pub async fn start_call(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<StartCallRequest>,
) -> ApiResult<impl IntoResponse> {
    if !CALL_TYPES.contains(&req.call_type.as_str()) {
        return Err(ApiError::Validation("call_type must be audio or video".into()));
    }
    match access::exactly_one(
        req.channel_id,
        req.dm_user_id,
        "Provide exactly one of channel_id or dm_user_id",
    )? {
        Target::First(channel_id) => {
            access::channel(&state.db, channel_id)?;
            access::require_member(&state.db, channel_id, auth.id)?;
        }
        Target::Second(dm_user_id) => {
            if dm_user_id == auth.id {
                return Err(ApiError::Validation("Cannot call yourself".into()));
            }
            access::require_user(&state.db, dm_user_id)?;
        }
    }

    let call_url = format!("/calls/join/{}", Uuid::new_v4());
    let call = state.db.create_call(
        req.channel_id,
        req.dm_user_id,
        &req.call_type,
        auth.id,
        &call_url,
    )?;

    if let Some(dm_user_id) = call.dm_user_id {
        notify::notify(
            &state.db,
            dm_user_id,
            auth.id,
            "call",
            "Incoming call",
            &format!("{} started a {} call with you", auth.username, call.call_type),
            ("call", call.id),
        )?;
    }
    info!("{} started {} call {}", auth.username, call.call_type, call.id);

    Ok((StatusCode::CREATED, Json(call)))
}

/// The starter, a member of the call's channel or the DM counterpart may end it.
pub async fn end_call(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(call_id): Path<i64>,
) -> ApiResult<Json<Call>> {
    let call = state
        .db
        .get_call(call_id)?
        .ok_or_else(|| ApiError::NotFound("Call not found".into()))?;

    let allowed = call.started_by == auth.id
        || call.dm_user_id == Some(auth.id)
        || match call.channel_id {
            Some(channel_id) => state.db.is_member(channel_id, auth.id)?,
            None => false,
        };
    if !allowed {
        return Err(ApiError::Forbidden("Not a participant in this call".into()));
    }
    if call.status != "active" {
        return Err(ApiError::Conflict("Call already ended".into()));
    }

    let ended = state
        .db
        .end_call(call_id)?
        .ok_or_else(|| ApiError::NotFound("Call not found".into()))?;
    Ok(Json(ended))
}

pub async fn active_calls(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<ActiveCalls>> {
    Ok(Json(ActiveCalls {
        active_calls: state.db.active_calls_for(auth.id)?,
    }))
}
