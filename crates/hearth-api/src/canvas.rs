use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use hearth_types::api::{CreateCanvasRequest, UpdateCanvasRequest};
use hearth_types::models::Canvas;

use crate::AppState;
use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, Page, default_limit};
use crate::middleware::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/canvas", get(list_canvases).post(create_canvas))
        .route(
            "/api/canvas/{canvas_id}",
            get(get_canvas).put(update_canvas).delete(delete_canvas),
        )
}

pub async fn create_canvas(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateCanvasRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.title.trim().is_empty() {
        return Err(ApiError::Validation("Canvas title cannot be empty".into()));
    }
    if let Some(channel_id) = req.channel_id {
        access::channel(&state.db, channel_id)?;
        access::require_member(&state.db, channel_id, auth.id)?;
    }

    let canvas = state.db.create_canvas(
        req.title.trim(),
        &req.content,
        req.channel_id,
        auth.id,
        req.is_public,
    )?;
    Ok((StatusCode::CREATED, Json(canvas)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub channel_id: Option<i64>,
}

/// The caller's own canvases plus public ones.
pub async fn list_canvases(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Canvas>>> {
    let (skip, limit) = Page {
        skip: q.skip,
        limit: q.limit,
    }
    .bounds();
    Ok(Json(
        state
            .db
            .list_visible_canvases(auth.id, q.channel_id, skip, limit)?,
    ))
}

pub async fn get_canvas(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(canvas_id): Path<i64>,
) -> ApiResult<Json<Canvas>> {
    let canvas = load(&state, canvas_id)?;
    let visible = canvas.owner_id == auth.id
        || canvas.is_public
        || match canvas.channel_id {
            Some(channel_id) => state.db.is_member(channel_id, auth.id)?,
            None => false,
        };
    if !visible {
        return Err(ApiError::Forbidden("You do not have access to this canvas".into()));
    }
    Ok(Json(canvas))
}

pub async fn update_canvas(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(canvas_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateCanvasRequest>,
) -> ApiResult<Json<Canvas>> {
    let canvas = load(&state, canvas_id)?;
    access::require_owner(canvas.owner_id, auth.id, "canvases")?;
    if let Some(channel_id) = req.channel_id {
        access::channel(&state.db, channel_id)?;
        access::require_member(&state.db, channel_id, auth.id)?;
    }
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::Validation("Canvas title cannot be empty".into()));
    }

    state.db.update_canvas(
        canvas_id,
        req.title.as_deref().map(str::trim),
        req.content.as_deref(),
        req.channel_id,
        req.is_public,
    )?;
    Ok(Json(load(&state, canvas_id)?))
}

pub async fn delete_canvas(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(canvas_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let canvas = load(&state, canvas_id)?;
    access::require_owner(canvas.owner_id, auth.id, "canvases")?;

    state.db.delete_canvas(canvas_id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn load(state: &AppState, id: i64) -> ApiResult<Canvas> {
    state
        .db
        .get_canvas(id)?
        .ok_or_else(|| ApiError::NotFound("Canvas not found".into()))
}
