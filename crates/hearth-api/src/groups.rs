use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tracing::info;

use hearth_types::api::{CreateGroupRequest, UpdateGroupRequest};
use hearth_types::models::{User, UserGroup};

use crate::AppState;
use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, Page};
use crate::middleware::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/groups", get(list_groups).post(create_group))
        .route(
            "/api/groups/{group_id}",
            get(get_group).put(update_group).delete(delete_group),
        )
        .route("/api/groups/{group_id}/members", get(members))
        .route(
            "/api/groups/{group_id}/members/{user_id}",
            post(add_member).delete(remove_member),
        )
}

pub async fn create_group(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateGroupRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = req.name.trim();
    let handle = req.handle.trim().trim_start_matches('@');
    if name.is_empty() || handle.is_empty() {
        return Err(ApiError::Validation("Group name and handle are required".into()));
    }
    if state.db.group_name_taken(name, handle)? {
        return Err(ApiError::Conflict("Group name or handle already exists".into()));
    }

    let id = state
        .db
        .create_group(name, handle, req.description.as_deref(), auth.id, &req.member_ids)
        .map_err(|e| {
            if hearth_db::is_unique_violation(&e) {
                ApiError::Conflict("Group name or handle already exists".into())
            } else {
                e.into()
            }
        })?;
    info!("{} created group @{}", auth.username, handle);

    Ok((StatusCode::CREATED, Json(load(&state, id)?)))
}

pub async fn list_groups(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(page): ApiQuery<Page>,
) -> ApiResult<Json<Vec<UserGroup>>> {
    let (skip, limit) = page.bounds();
    Ok(Json(state.db.list_groups(skip, limit)?))
}

pub async fn get_group(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(group_id): Path<i64>,
) -> ApiResult<Json<UserGroup>> {
    Ok(Json(load(&state, group_id)?))
}

pub async fn update_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateGroupRequest>,
) -> ApiResult<Json<UserGroup>> {
    let group = load(&state, group_id)?;
    access::require_owner(group.created_by, auth.id, "groups")?;

    let name = req.name.as_deref().map(str::trim);
    if let Some(name) = name {
        if name.is_empty() {
            return Err(ApiError::Validation("Group name cannot be empty".into()));
        }
        if let Some(other) = state.db.get_group_by_name(name)? {
            if other.id != group_id {
                return Err(ApiError::Conflict("Group name already exists".into()));
            }
        }
    }

    state
        .db
        .update_group(group_id, name, req.description.as_deref())?;
    Ok(Json(load(&state, group_id)?))
}

pub async fn delete_group(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(group_id): Path<i64>,
) -> ApiResult<StatusCode> {
    let group = load(&state, group_id)?;
    access::require_owner(group.created_by, auth.id, "groups")?;

    state.db.delete_group(group_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((group_id, user_id)): Path<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    let group = load(&state, group_id)?;
    access::require_owner(group.created_by, auth.id, "groups")?;
    access::require_user(&state.db, user_id)?;
    if state.db.is_group_member(group_id, user_id)? {
        return Err(ApiError::Conflict("User is already in this group".into()));
    }

    state.db.add_group_member(group_id, user_id)?;
    Ok((StatusCode::CREATED, Json(load(&state, group_id)?)))
}

pub async fn remove_member(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((group_id, user_id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    let group = load(&state, group_id)?;
    access::require_owner(group.created_by, auth.id, "groups")?;

    if !state.db.remove_group_member(group_id, user_id)? {
        return Err(ApiError::NotFound("User is not in this group".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn members(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(group_id): Path<i64>,
) -> ApiResult<Json<Vec<User>>> {
    load(&state, group_id)?;
    let rows = state.db.group_members(group_id)?;
    Ok(Json(rows.iter().map(|u| u.to_user()).collect()))
}

fn load(state: &AppState, id: i64) -> ApiResult<UserGroup> {
    state
        .db
        .get_group(id)?
        .ok_or_else(|| ApiError::NotFound("Group not found".into()))
}
