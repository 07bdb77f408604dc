use std::path::Path as FsPath;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use serde::Deserialize;

use hearth_types::models::CustomEmoji;

use crate::AppState;
use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiQuery, Page};
use crate::middleware::AuthUser;
use crate::storage::{Upload, UploadDir};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/emojis", get(list_emojis).post(create_emoji))
        .route("/api/emojis/popular", get(popular))
        .route("/api/emojis/{emoji_id}", delete(delete_emoji))
        .route("/api/emojis/{emoji_id}/image", get(image))
        .route("/api/emojis/{emoji_id}/use", post(use_emoji))
}

pub async fn create_emoji(
    State(state): State<AppState>,
    auth: AuthUser,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let mut name = None;
    let mut aliases = None;
    let mut image = None;
    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "name" => name = Some(field.text().await?),
            "aliases" => aliases = Some(field.text().await?).filter(|a| !a.trim().is_empty()),
            "image" => image = Upload::from_field(field).await?,
            _ => {}
        }
    }

    let name = name
        .as_deref()
        .map(|n| n.trim().trim_matches(':'))
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::Validation("Emoji name is required".into()))?
        .to_string();
    let image = image.ok_or_else(|| ApiError::Validation("Emoji image is required".into()))?;
    if !image
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.starts_with("image/"))
    {
        return Err(ApiError::Validation("Emoji must be an image".into()));
    }
    // name uniqueness is left to the UNIQUE constraint so concurrent
    // uploads of the same name cannot both pass a pre-check
    let file = state.storage.save(UploadDir::Emojis, &image).await?;
    let emoji = match state
        .db
        .create_emoji(&name, &file.file_path, aliases.as_deref(), auth.id)
    {
        Ok(emoji) => emoji,
        Err(e) => {
            state.storage.remove(&file.file_path).await;
            if hearth_db::is_unique_violation(&e) {
                return Err(ApiError::Conflict("Emoji name already exists".into()));
            }
            return Err(e.into());
        }
    };
    Ok((StatusCode::CREATED, Json(emoji)))
}

pub async fn list_emojis(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(page): ApiQuery<Page>,
) -> ApiResult<Json<Vec<CustomEmoji>>> {
    let (skip, limit) = page.bounds();
    Ok(Json(state.db.list_emojis(skip, limit)?))
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    #[serde(default = "default_popular")]
    pub limit: i64,
}

fn default_popular() -> i64 {
    10
}

/// Most used first.
pub async fn popular(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(q): ApiQuery<PopularQuery>,
) -> ApiResult<Json<Vec<CustomEmoji>>> {
    Ok(Json(state.db.popular_emojis(q.limit.clamp(1, 100))?))
}

pub async fn image(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(emoji_id): Path<i64>,
) -> ApiResult<Response> {
    let emoji = load(&state, emoji_id)?;
    let filename = FsPath::new(&emoji.image_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(&emoji.name)
        .to_string();
    state
        .storage
        .download(&emoji.image_path, &filename, Some(image_mime(&emoji.image_path)))
        .await
}

pub async fn delete_emoji(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(emoji_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let emoji = load(&state, emoji_id)?;
    access::require_owner(emoji.uploaded_by, auth.id, "emojis")?;

    state.db.delete_emoji(emoji_id)?;
    state.storage.remove(&emoji.image_path).await;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn use_emoji(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(emoji_id): Path<i64>,
) -> ApiResult<Json<CustomEmoji>> {
    state
        .db
        .use_emoji(emoji_id)?
        .ok_or_else(not_found)?;
    Ok(Json(load(&state, emoji_id)?))
}

fn load(state: &AppState, id: i64) -> ApiResult<CustomEmoji> {
    state.db.get_emoji(id)?.ok_or_else(not_found)
}

fn not_found() -> ApiError {
    ApiError::NotFound("Emoji not found".into())
}

fn image_mime(path: &str) -> &'static str {
    let ext = FsPath::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
