use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};

use hearth_types::api::{CreateDraftRequest, UpdateDraftRequest};
use hearth_types::models::Draft;

use crate::AppState;
use crate::access::{self, Target};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/drafts", get(list_drafts).post(save_draft))
        .route("/api/drafts/channel/{channel_id}", get(channel_draft))
        .route("/api/drafts/dm/{receiver_id}", get(dm_draft))
        .route("/api/drafts/{draft_id}", put(update_draft).delete(delete_draft))
}

/// One draft per (caller, target); saving again overwrites it.
pub async fn save_draft(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateDraftRequest>,
) -> ApiResult<Json<Draft>> {
    match access::exactly_one(
        req.channel_id,
        req.receiver_id,
        "Provide exactly one of channel_id or receiver_id",
    )? {
        Target::First(channel_id) => {
            access::channel(&state.db, channel_id)?;
        }
        Target::Second(receiver_id) => access::require_user(&state.db, receiver_id)?,
    }

    let draft = state.db.upsert_draft(
        auth.id,
        req.channel_id,
        req.receiver_id,
        &req.content,
        req.formatting.as_deref(),
        req.mentions.as_deref(),
    )?;
    Ok(Json(draft))
}

pub async fn list_drafts(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<Draft>>> {
    Ok(Json(state.db.list_drafts(auth.id)?))
}

pub async fn channel_draft(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
) -> ApiResult<Json<Draft>> {
    state
        .db
        .channel_draft(auth.id, channel_id)?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn dm_draft(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(receiver_id): Path<i64>,
) -> ApiResult<Json<Draft>> {
    state
        .db
        .dm_draft(auth.id, receiver_id)?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn update_draft(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(draft_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateDraftRequest>,
) -> ApiResult<Json<Draft>> {
    state.db.get_draft(draft_id, auth.id)?.ok_or_else(not_found)?;

    state.db.update_draft(
        draft_id,
        req.content.as_deref(),
        req.formatting.as_deref(),
        req.mentions.as_deref(),
    )?;
    state
        .db
        .get_draft(draft_id, auth.id)?
        .map(Json)
        .ok_or_else(not_found)
}

pub async fn delete_draft(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(draft_id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_draft(draft_id, auth.id)? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

fn not_found() -> ApiError {
    ApiError::NotFound("Draft not found".into())
}
