use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
};
use serde::Deserialize;

use hearth_types::api::CreateBookmarkRequest;
use hearth_types::models::Bookmark;

use crate::AppState;
use crate::access::{self, Target};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, Page};
use crate::middleware::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookmarks", get(list_bookmarks).post(create_bookmark))
        .route("/api/bookmarks/{bookmark_id}", delete(delete_bookmark))
        .route("/api/bookmarks/{bookmark_id}/note", put(set_note))
}

pub async fn create_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateBookmarkRequest>,
) -> ApiResult<impl IntoResponse> {
    match access::exactly_one(
        req.message_id,
        req.direct_message_id,
        "Provide exactly one of message_id or direct_message_id",
    )? {
        Target::First(message_id) => {
            access::member_message(&state.db, message_id, auth.id)?;
        }
        Target::Second(dm_id) => {
            access::participant_dm(&state.db, dm_id, auth.id)?;
        }
    }

    if state
        .db
        .bookmark_exists(auth.id, req.message_id, req.direct_message_id)?
    {
        return Err(ApiError::Conflict("Already bookmarked".into()));
    }

    let bookmark = state.db.create_bookmark(
        auth.id,
        req.message_id,
        req.direct_message_id,
        req.note.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(bookmark)))
}

pub async fn list_bookmarks(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(page): ApiQuery<Page>,
) -> ApiResult<Json<Vec<Bookmark>>> {
    let (skip, limit) = page.bounds();
    Ok(Json(state.db.list_bookmarks(auth.id, skip, limit)?))
}

pub async fn delete_bookmark(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(bookmark_id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.db.delete_bookmark(bookmark_id, auth.id)? {
        return Err(not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct NoteQuery {
    pub note: Option<String>,
}

pub async fn set_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(bookmark_id): Path<i64>,
    ApiQuery(q): ApiQuery<NoteQuery>,
) -> ApiResult<Json<Bookmark>> {
    state
        .db
        .set_bookmark_note(bookmark_id, auth.id, q.note.as_deref())?
        .map(Json)
        .ok_or_else(not_found)
}

fn not_found() -> ApiError {
    ApiError::NotFound("Bookmark not found".into())
}
