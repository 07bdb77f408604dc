use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::info;

use hearth_db::models::ChannelInvite;
use hearth_types::api::{CreateChannelRequest, StatusMessage, TopicUpdate, UpdateChannelRequest};
use hearth_types::models::{Channel, User};

use crate::AppState;
use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;

const DEFAULT_SECTION: &str = "Channels";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/channels", get(list_channels).post(create_channel))
        .route("/api/channels/my-channels", get(my_channels))
        .route("/api/channels/by-section", get(by_section))
        .route(
            "/api/channels/{channel_id}",
            get(get_channel).put(update_channel).delete(delete_channel),
        )
        .route("/api/channels/{channel_id}/join", post(join_channel))
        .route("/api/channels/{channel_id}/leave", post(leave_channel))
        .route("/api/channels/{channel_id}/invite/{user_id}", post(invite))
        .route("/api/channels/{channel_id}/topic", put(set_topic))
        .route("/api/channels/{channel_id}/section", put(set_section))
        .route("/api/channels/{channel_id}/members", get(members))
}

pub async fn create_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateChannelRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("Channel name cannot be empty".into()));
    }
    if state.db.get_channel_by_name(name)?.is_some() {
        return Err(ApiError::Conflict("Channel name already exists".into()));
    }

    let id = state
        .db
        .create_channel(name, req.description.as_deref(), req.is_private, auth.id, &req.members)
        .map_err(|e| {
            if hearth_db::is_unique_violation(&e) {
                ApiError::Conflict("Channel name already exists".into())
            } else {
                e.into()
            }
        })?;
    info!("{} created channel #{} ({})", auth.username, name, id);

    Ok((StatusCode::CREATED, Json(full_channel(&state, id)?)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_private: bool,
}

/// Public channels, or with `include_private` the caller's own channels.
pub async fn list_channels(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Channel>>> {
    let channels = if q.include_private {
        state.db.list_user_channels(auth.id)?
    } else {
        state.db.list_public_channels()?
    };
    Ok(Json(channels))
}

pub async fn my_channels(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<Channel>>> {
    Ok(Json(state.db.list_user_channels(auth.id)?))
}

pub async fn by_section(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<BTreeMap<String, Vec<Channel>>>> {
    let mut sections: BTreeMap<String, Vec<Channel>> = BTreeMap::new();
    for channel in state.db.list_user_channels(auth.id)? {
        let key = channel
            .section
            .clone()
            .unwrap_or_else(|| DEFAULT_SECTION.to_string());
        sections.entry(key).or_default().push(channel);
    }
    Ok(Json(sections))
}

/// Looks the channel up by id when the segment is numeric, by name otherwise.
pub async fn get_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id_or_name): Path<String>,
) -> ApiResult<Json<Channel>> {
    let row = match id_or_name.parse::<i64>() {
        Ok(id) => state.db.get_channel(id)?,
        Err(_) => state.db.get_channel_by_name(&id_or_name)?,
    }
    .ok_or_else(|| ApiError::NotFound("Channel not found".into()))?;

    access::require_read(&state.db, &row, auth.id)?;
    Ok(Json(full_channel(&state, row.id)?))
}

pub async fn update_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateChannelRequest>,
) -> ApiResult<Json<Channel>> {
    let channel = access::channel(&state.db, channel_id)?;
    access::require_creator(&channel, auth.id)?;

    let name = req.name.as_deref().map(str::trim);
    if let Some(name) = name {
        if name.is_empty() {
            return Err(ApiError::Validation("Channel name cannot be empty".into()));
        }
        if let Some(other) = state.db.get_channel_by_name(name)? {
            if other.id != channel_id {
                return Err(ApiError::Conflict("Channel name already exists".into()));
            }
        }
    }

    state
        .db
        .update_channel(channel_id, name, req.description.as_deref(), req.is_private)?;
    Ok(Json(full_channel(&state, channel_id)?))
}

pub async fn delete_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let channel = access::channel(&state.db, channel_id)?;
    access::require_creator(&channel, auth.id)?;

    state.db.delete_channel(channel_id)?;
    info!("{} deleted channel #{}", auth.username, channel.name);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn join_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
) -> ApiResult<Json<StatusMessage>> {
    let channel = access::channel(&state.db, channel_id)?;
    if channel.is_private {
        return Err(ApiError::Forbidden("Cannot join a private channel".into()));
    }
    if state.db.is_member(channel_id, auth.id)? {
        return Err(ApiError::Conflict("Already a member of this channel".into()));
    }

    state.db.add_member(channel_id, auth.id)?;
    Ok(Json(StatusMessage::new(format!("Joined #{}", channel.name))))
}

pub async fn leave_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
) -> ApiResult<StatusCode> {
    access::channel(&state.db, channel_id)?;
    if !state.db.remove_member(channel_id, auth.id)? {
        return Err(ApiError::Validation("Not a member of this channel".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Adds `user_id` to the channel. Private channels accept invites from the
/// creator only, public ones from any member.
pub async fn invite(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((channel_id, user_id)): Path<(i64, i64)>,
) -> ApiResult<Json<StatusMessage>> {
    let channel = access::channel(&state.db, channel_id)?;
    if channel.is_private {
        access::require_creator(&channel, auth.id)?;
    } else {
        access::require_member(&state.db, channel_id, auth.id)?;
    }

    let invitee = state
        .db
        .get_user(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    if state.db.is_member(channel_id, user_id)? {
        return Err(ApiError::Conflict("User is already a member of this channel".into()));
    }

    let system_text = format!("{} added {} to #{}.", auth.username, invitee.username, channel.name);
    let description = format!("{} added you to #{}", auth.username, channel.name);
    state
        .db
        .invite_member(&ChannelInvite {
            channel_id,
            inviter_id: auth.id,
            invitee_id: user_id,
            system_text: &system_text,
            description: &description,
        })
        .map_err(|e| {
            if hearth_db::is_unique_violation(&e) {
                ApiError::Conflict("User is already a member of this channel".into())
            } else {
                e.into()
            }
        })?;
    info!("{} invited {} to #{}", auth.username, invitee.username, channel.name);

    Ok(Json(StatusMessage::new(format!(
        "Added {} to #{}",
        invitee.username, channel.name
    ))))
}

pub async fn set_topic(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
    ApiJson(req): ApiJson<TopicUpdate>,
) -> ApiResult<Json<Channel>> {
    access::channel(&state.db, channel_id)?;
    access::require_member(&state.db, channel_id, auth.id)?;

    state
        .db
        .set_topic(channel_id, req.topic.as_deref(), req.purpose.as_deref(), auth.id)?;
    Ok(Json(full_channel(&state, channel_id)?))
}

#[derive(Debug, Deserialize)]
pub struct SectionQuery {
    pub section: String,
}

pub async fn set_section(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
    ApiQuery(q): ApiQuery<SectionQuery>,
) -> ApiResult<Json<Channel>> {
    access::channel(&state.db, channel_id)?;
    access::require_member(&state.db, channel_id, auth.id)?;

    state.db.set_section(channel_id, q.section.trim())?;
    Ok(Json(full_channel(&state, channel_id)?))
}

pub async fn members(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
) -> ApiResult<Json<Vec<User>>> {
    let channel = access::channel(&state.db, channel_id)?;
    access::require_read(&state.db, &channel, auth.id)?;

    let rows = state.db.channel_members(channel_id)?;
    Ok(Json(rows.iter().map(|u| u.to_user()).collect()))
}

fn full_channel(state: &AppState, id: i64) -> ApiResult<Channel> {
    state
        .db
        .get_channel_full(id)?
        .ok_or_else(|| ApiError::NotFound("Channel not found".into()))
}
