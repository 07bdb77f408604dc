use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use tracing::{info, warn};

use hearth_types::api::{CreateReactionRequest, CreateThreadRequest, UpdateMessageRequest, UpdateThreadRequest};
use hearth_types::models::{Message, Reaction, Thread};

use crate::AppState;
use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::notify;
use crate::storage::{Upload, UploadDir};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/messages", post(send_message))
        .route("/api/messages/channel/{channel_id}", get(channel_messages))
        .route("/api/messages/{message_id}", put(update_message).delete(delete_message))
        .route(
            "/api/messages/{message_id}/threads",
            get(list_threads).post(create_thread),
        )
        .route(
            "/api/messages/threads/{thread_id}",
            put(update_thread).delete(delete_thread),
        )
        .route(
            "/api/messages/{message_id}/reactions",
            get(list_reactions).post(add_reaction),
        )
        .route("/api/messages/reactions/{reaction_id}", delete(remove_reaction))
}

/// Multipart fields of a message send. Any `user_id` field is ignored; the
/// author is always the session's account.
#[derive(Debug, Default)]
pub(crate) struct MessageForm {
    pub target_id: Option<i64>,
    pub content: Option<String>,
    pub formatted_content: Option<String>,
    pub files: Vec<Upload>,
}

impl MessageForm {
    pub(crate) async fn read(mut multipart: Multipart, target_field: &str) -> ApiResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if name == target_field {
                let raw = field.text().await?;
                let id = raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ApiError::Validation(format!("{} must be an integer", target_field)))?;
                form.target_id = Some(id);
                continue;
            }
            match name.as_str() {
                "content" => form.content = Some(field.text().await?),
                "formatted_content" => {
                    let html = field.text().await?;
                    form.formatted_content = Some(html).filter(|h| !h.trim().is_empty());
                }
                "files" => {
                    if let Some(upload) = Upload::from_field(field).await? {
                        form.files.push(upload);
                    }
                }
                _ => {}
            }
        }
        Ok(form)
    }

    pub(crate) fn target(&self, target_field: &str) -> ApiResult<i64> {
        self.target_id
            .ok_or_else(|| ApiError::Validation(format!("{} is required", target_field)))
    }

    pub(crate) fn content(&self) -> ApiResult<&str> {
        let content = self.content.as_deref().unwrap_or_default();
        if content.trim().is_empty() && self.files.is_empty() {
            return Err(ApiError::Validation("Message content cannot be empty".into()));
        }
        Ok(content)
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let form = MessageForm::read(multipart, "channel_id").await?;
    let channel_id = form.target("channel_id")?;
    let content = form.content()?;

    access::channel(&state.db, channel_id)?;
    access::require_member(&state.db, channel_id, auth.id)?;

    let mut files = Vec::with_capacity(form.files.len());
    for upload in &form.files {
        files.push(state.storage.save(UploadDir::Messages, upload).await?);
    }

    let message_id = state.db.insert_message_with_files(
        channel_id,
        auth.id,
        content,
        form.formatted_content.as_deref(),
        &files,
    )?;

    if let Some(html) = form.formatted_content.as_deref() {
        notify::mentions(&state.db, html, auth.id, &auth.username, "message", message_id)?;
    }

    Ok((StatusCode::CREATED, Json(load_message(&state, message_id)?)))
}

pub async fn channel_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(channel_id): Path<i64>,
) -> ApiResult<Json<Vec<Message>>> {
    let channel = access::channel(&state.db, channel_id)?;
    access::require_read(&state.db, &channel, auth.id)?;
    Ok(Json(state.db.channel_messages(channel_id)?))
}

pub async fn update_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateMessageRequest>,
) -> ApiResult<Json<Message>> {
    let msg = access::message(&state.db, message_id)?;
    access::require_owner(msg.user_id, auth.id, "messages")?;

    let mentions = req
        .mentions
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(anyhow::Error::from)?;
    state
        .db
        .update_message(message_id, &req.content, req.formatting.as_deref(), mentions.as_deref())?;

    Ok(Json(load_message(&state, message_id)?))
}

pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let msg = access::message(&state.db, message_id)?;
    access::require_owner(msg.user_id, auth.id, "messages")?;

    let attachments = state.db.message_attachments(message_id)?;
    state.db.delete_message(message_id)?;
    for a in &attachments {
        state.storage.remove(&a.file_path).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
    ApiJson(req): ApiJson<CreateThreadRequest>,
) -> ApiResult<impl IntoResponse> {
    let parent = access::member_message(&state.db, message_id, auth.id)?;
    if req.content.trim().is_empty() {
        return Err(ApiError::Validation("Reply cannot be empty".into()));
    }

    let thread = state.db.insert_thread(message_id, auth.id, &req.content)?;
    notify::notify(
        &state.db,
        parent.user_id,
        auth.id,
        "thread_reply",
        "New reply",
        &format!("{} replied to your message", auth.username),
        ("message", message_id),
    )?;

    Ok((StatusCode::CREATED, Json(thread)))
}

pub async fn list_threads(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
) -> ApiResult<Json<Vec<Thread>>> {
    access::readable_message(&state.db, message_id, auth.id)?;
    Ok(Json(state.db.list_threads(message_id)?))
}

pub async fn update_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateThreadRequest>,
) -> ApiResult<Json<Thread>> {
    let row = state
        .db
        .get_thread_row(thread_id)?
        .ok_or_else(|| ApiError::NotFound("Thread reply not found".into()))?;
    access::require_owner(row.user_id, auth.id, "replies")?;

    state.db.update_thread(thread_id, &req.content)?;
    let thread = state
        .db
        .get_thread(thread_id)?
        .ok_or_else(|| ApiError::NotFound("Thread reply not found".into()))?;
    Ok(Json(thread))
}

pub async fn delete_thread(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(thread_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let row = state
        .db
        .get_thread_row(thread_id)?
        .ok_or_else(|| ApiError::NotFound("Thread reply not found".into()))?;
    access::require_owner(row.user_id, auth.id, "replies")?;

    state.db.delete_thread(thread_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
    ApiJson(req): ApiJson<CreateReactionRequest>,
) -> ApiResult<impl IntoResponse> {
    let msg = access::member_message(&state.db, message_id, auth.id)?;
    let emoji = req.emoji.trim();
    if emoji.is_empty() {
        return Err(ApiError::Validation("Emoji cannot be empty".into()));
    }

    let already = || ApiError::Conflict("You already reacted with this emoji".into());
    if state.db.has_reacted(message_id, auth.id, emoji)? {
        return Err(already());
    }
    let reaction = state
        .db
        .insert_reaction(message_id, auth.id, emoji)
        .map_err(|e| {
            if hearth_db::is_unique_violation(&e) {
                warn!("Concurrent duplicate reaction on message {}", message_id);
                already()
            } else {
                e.into()
            }
        })?;

    notify::notify(
        &state.db,
        msg.user_id,
        auth.id,
        "reaction",
        "New reaction",
        &format!("{} reacted {} to your message", auth.username, emoji),
        ("message", message_id),
    )?;

    Ok((StatusCode::CREATED, Json(reaction)))
}

pub async fn list_reactions(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
) -> ApiResult<Json<Vec<Reaction>>> {
    access::readable_message(&state.db, message_id, auth.id)?;
    Ok(Json(state.db.list_reactions(message_id)?))
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(reaction_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let reaction = state
        .db
        .get_reaction(reaction_id)?
        .ok_or_else(|| ApiError::NotFound("Reaction not found".into()))?;
    access::require_owner(reaction.user_id, auth.id, "reactions")?;

    state.db.delete_reaction(reaction_id)?;
    info!("{} removed reaction {}", auth.username, reaction_id);
    Ok(StatusCode::NO_CONTENT)
}

fn load_message(state: &AppState, id: i64) -> ApiResult<Message> {
    state
        .db
        .get_message(id)?
        .ok_or_else(|| ApiError::NotFound("Message not found".into()))
}
