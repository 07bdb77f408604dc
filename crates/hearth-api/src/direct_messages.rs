use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post, put},
};
use serde_json::json;

use hearth_db::models::NewNotification;
use hearth_types::api::UpdateMessageRequest;
use hearth_types::models::{Conversation, DirectMessage};

use crate::AppState;
use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::messages::MessageForm;
use crate::middleware::AuthUser;
use crate::storage::UploadDir;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/direct-messages", post(send_direct_message))
        .route("/api/direct-messages/conversations", get(conversations))
        .route("/api/direct-messages/conversation/{user_id}", get(conversation))
        .route(
            "/api/direct-messages/{dm_id}",
            put(update_direct_message).delete(delete_direct_message),
        )
        .route("/api/direct-messages/{dm_id}/read", patch(mark_read))
}

pub async fn send_direct_message(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = MessageForm::read(multipart, "receiver_id").await?;
    let receiver_id = form.target("receiver_id")?;
    let content = form.content()?;

    if receiver_id == auth.id {
        return Err(ApiError::Validation("Cannot send a direct message to yourself".into()));
    }
    if !state.db.user_exists(receiver_id)? {
        return Err(ApiError::NotFound("Receiver not found".into()));
    }

    let mut files = Vec::with_capacity(form.files.len());
    for upload in &form.files {
        files.push(state.storage.save(UploadDir::DirectMessages, upload).await?);
    }

    let dm_id = state.db.insert_direct_message(
        auth.id,
        receiver_id,
        content,
        form.formatted_content.as_deref(),
        &files,
    )?;

    let message = format!("{} sent you a message", auth.username);
    state.db.create_notification(&NewNotification {
        user_id: receiver_id,
        notification_type: "dm",
        title: "New direct message",
        message: &message,
        source_type: Some("direct_message"),
        source_id: Some(dm_id),
        data: Some(json!({ "sender_id": auth.id }).to_string()),
    })?;

    Ok((StatusCode::CREATED, Json(load_dm(&state, dm_id)?)))
}

/// Both directions with `user_id`, oldest first. Marks incoming messages read.
pub async fn conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Vec<DirectMessage>>> {
    access::require_user(&state.db, user_id)?;
    Ok(Json(state.db.read_conversation(auth.id, user_id)?))
}

pub async fn conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Vec<Conversation>>> {
    Ok(Json(state.db.list_conversations(auth.id)?))
}

pub async fn update_direct_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dm_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateMessageRequest>,
) -> ApiResult<Json<DirectMessage>> {
    let dm = access::direct_message(&state.db, dm_id)?;
    access::require_owner(dm.sender_id, auth.id, "messages")?;

    let mentions = req
        .mentions
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(anyhow::Error::from)?;
    state
        .db
        .update_direct_message(dm_id, &req.content, req.formatting.as_deref(), mentions.as_deref())?;

    Ok(Json(load_dm(&state, dm_id)?))
}

pub async fn delete_direct_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dm_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let dm = access::direct_message(&state.db, dm_id)?;
    access::require_owner(dm.sender_id, auth.id, "messages")?;

    let attachments = state.db.dm_attachments(dm_id)?;
    state.db.delete_direct_message(dm_id)?;
    for a in &attachments {
        state.storage.remove(&a.file_path).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dm_id): Path<i64>,
) -> ApiResult<Json<DirectMessage>> {
    let dm = access::direct_message(&state.db, dm_id)?;
    if dm.receiver_id != auth.id {
        return Err(ApiError::Forbidden("Only the receiver can mark a message as read".into()));
    }

    state.db.mark_direct_message_read(dm_id)?;
    Ok(Json(load_dm(&state, dm_id)?))
}

fn load_dm(state: &AppState, id: i64) -> ApiResult<DirectMessage> {
    state
        .db
        .get_direct_message(id)?
        .ok_or_else(|| ApiError::NotFound("Direct message not found".into()))
}
