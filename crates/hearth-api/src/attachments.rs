use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get},
};
use serde::Deserialize;

use hearth_types::models::{Attachment, DmAttachment};

use crate::AppState;
use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiQuery, Page};
use crate::middleware::AuthUser;
use crate::storage::{Upload, UploadDir};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/attachments", get(list_attachments))
        .route(
            "/api/attachments/message/{message_id}",
            get(message_attachments).post(upload_to_message),
        )
        .route(
            "/api/attachments/direct-message/{dm_id}",
            get(dm_attachments).post(upload_to_dm),
        )
        .route("/api/attachments/{attachment_id}", delete(delete_attachment))
        .route("/api/attachments/download/{attachment_id}", get(download))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    #[default]
    Message,
    Dm,
}

#[derive(Debug, Deserialize)]
pub struct KindQuery {
    #[serde(default)]
    pub attachment_type: AttachmentKind,
}

pub async fn list_attachments(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(page): ApiQuery<Page>,
) -> ApiResult<Json<Vec<Attachment>>> {
    let (skip, limit) = page.bounds();
    Ok(Json(state.db.list_readable_attachments(auth.id, skip, limit)?))
}

pub async fn upload_to_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let upload = single_file(multipart).await?;
    access::member_message(&state.db, message_id, auth.id)?;

    let file = state.storage.save(UploadDir::Attachments, &upload).await?;
    let attachment = state.db.add_message_attachment(message_id, &file)?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn upload_to_dm(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dm_id): Path<i64>,
    multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let upload = single_file(multipart).await?;
    access::participant_dm(&state.db, dm_id, auth.id)?;

    let file = state.storage.save(UploadDir::Attachments, &upload).await?;
    let attachment = state.db.add_dm_attachment(dm_id, &file)?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn message_attachments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(message_id): Path<i64>,
) -> ApiResult<Json<Vec<Attachment>>> {
    access::readable_message(&state.db, message_id, auth.id)?;
    Ok(Json(state.db.message_attachments(message_id)?))
}

pub async fn dm_attachments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(dm_id): Path<i64>,
) -> ApiResult<Json<Vec<DmAttachment>>> {
    access::participant_dm(&state.db, dm_id, auth.id)?;
    Ok(Json(state.db.dm_attachments(dm_id)?))
}

/// Owner is the author of the message (or sender of the DM) carrying the file.
pub async fn delete_attachment(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(attachment_id): Path<i64>,
    ApiQuery(q): ApiQuery<KindQuery>,
) -> ApiResult<StatusCode> {
    let stored = match q.attachment_type {
        AttachmentKind::Message => {
            let a = state
                .db
                .get_attachment(attachment_id)?
                .ok_or_else(not_found)?;
            let msg = access::message(&state.db, a.message_id)?;
            access::require_owner(msg.user_id, auth.id, "attachments")?;
            state.db.delete_attachment(attachment_id)?;
            a.file_path
        }
        AttachmentKind::Dm => {
            let a = state
                .db
                .get_dm_attachment(attachment_id)?
                .ok_or_else(not_found)?;
            let dm = access::direct_message(&state.db, a.direct_message_id)?;
            access::require_owner(dm.sender_id, auth.id, "attachments")?;
            state.db.delete_dm_attachment(attachment_id)?;
            a.file_path
        }
    };

    state.storage.remove(&stored).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn download(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(attachment_id): Path<i64>,
    ApiQuery(q): ApiQuery<KindQuery>,
) -> ApiResult<Response> {
    let (stored, filename, mime) = match q.attachment_type {
        AttachmentKind::Message => {
            let a = state
                .db
                .get_attachment(attachment_id)?
                .ok_or_else(not_found)?;
            access::readable_message(&state.db, a.message_id, auth.id)?;
            (a.file_path, a.filename, a.mime_type)
        }
        AttachmentKind::Dm => {
            let a = state
                .db
                .get_dm_attachment(attachment_id)?
                .ok_or_else(not_found)?;
            access::participant_dm(&state.db, a.direct_message_id, auth.id)?;
            (a.file_path, a.filename, a.mime_type)
        }
    };

    state.storage.download(&stored, &filename, mime.as_deref()).await
}

async fn single_file(mut multipart: Multipart) -> ApiResult<Upload> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        if let Some(upload) = Upload::from_field(field).await? {
            return Ok(upload);
        }
    }
    Err(ApiError::Validation("file is required".into()))
}

fn not_found() -> ApiError {
    ApiError::NotFound("Attachment not found".into())
}
