use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use hearth_types::models::PinnedMessage;

use crate::AppState;
use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::notify;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/pins/channels/{channel_id}", get(list_pins))
        .route(
            "/api/pins/channels/{channel_id}/messages/{message_id}",
            post(pin).delete(unpin),
        )
}

pub async fn pin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((channel_id, message_id)): Path<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    access::channel(&state.db, channel_id)?;
    access::require_member(&state.db, channel_id, auth.id)?;
    let msg = message_in_channel(&state, channel_id, message_id)?;

    let already = || ApiError::Conflict("Message already pinned".into());
    if state.db.get_pin(channel_id, message_id)?.is_some() {
        return Err(already());
    }
    let pinned = state
        .db
        .pin_message(message_id, channel_id, auth.id)
        .map_err(|e| if hearth_db::is_unique_violation(&e) { already() } else { e.into() })?;

    notify::notify(
        &state.db,
        msg.user_id,
        auth.id,
        "pin",
        "Message pinned",
        &format!("{} pinned your message", auth.username),
        ("message", message_id),
    )?;

    Ok((StatusCode::CREATED, Json(pinned)))
}

/// Pins of a channel, newest first.
pub async fn list_pins(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
) -> ApiResult<Json<Vec<PinnedMessage>>> {
    access::channel(&state.db, channel_id)?;
    access::require_member(&state.db, channel_id, auth.id)?;
    Ok(Json(state.db.list_pins(channel_id)?))
}

/// The channel creator or whoever pinned the message may unpin it.
pub async fn unpin(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((channel_id, message_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    let channel = access::channel(&state.db, channel_id)?;
    access::require_member(&state.db, channel_id, auth.id)?;

    let pinned = state
        .db
        .get_pin(channel_id, message_id)?
        .ok_or_else(|| ApiError::NotFound("Message is not pinned".into()))?;
    if pinned.pinned_by != auth.id && channel.created_by != Some(auth.id) {
        return Err(ApiError::Forbidden(
            "Only the channel creator or the user who pinned can unpin".into(),
        ));
    }

    state.db.delete_pin(pinned.id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn message_in_channel(
    state: &AppState,
    channel_id: i64,
    message_id: i64,
) -> ApiResult<hearth_db::models::MessageRow> {
    let msg = access::message(&state.db, message_id)?;
    if msg.channel_id != channel_id {
        return Err(ApiError::NotFound("Message not found in this channel".into()));
    }
    Ok(msg)
}
