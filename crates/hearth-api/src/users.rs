use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
};
use serde::Deserialize;

use hearth_db::models::UserRow;
use hearth_types::api::{
    AddContactRequest, PreferencesUpdate, PresenceUpdate, StatusUpdate, UpdateProfileRequest,
    UpdateUserRequest,
};
use hearth_types::models::{Preferences, Presence, User, UserProfile};

use crate::AppState;
use crate::auth::{check_email, check_username};
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery};
use crate::middleware::AuthUser;

const PRESENCES: &[&str] = &["online", "away", "dnd", "offline"];
const THEMES: &[&str] = &["light", "dark"];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/directory", get(directory))
        .route("/api/users/me", get(my_profile).put(update_me))
        .route("/api/users/me/profile", get(my_profile).put(update_profile))
        .route("/api/users/me/presence", put(update_presence))
        .route("/api/users/me/status", put(update_status))
        .route("/api/users/me/preferences", get(preferences).put(update_preferences))
        .route("/api/users/contacts", get(list_contacts).post(add_contact))
        .route("/api/users/contacts/{contact_id}", delete(remove_contact))
        .route("/api/users/{user_id}", get(get_user))
        .route("/api/users/{user_id}/presence", get(get_presence))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub status_filter: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let rows = state
        .db
        .list_users(q.search.as_deref(), q.status_filter.as_deref())?;
    Ok(Json(rows.iter().map(|u| u.to_user()).collect()))
}

#[derive(Debug, Deserialize)]
pub struct DirectoryQuery {
    pub search: Option<String>,
}

pub async fn directory(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(q): ApiQuery<DirectoryQuery>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    let rows = state.db.list_directory(auth.id, q.search.as_deref())?;
    Ok(Json(rows.iter().map(|u| u.to_profile()).collect()))
}

pub async fn get_user(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<UserProfile>> {
    let row = state
        .db
        .get_user(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(row.to_profile()))
}

pub async fn get_presence(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(user_id): Path<i64>,
) -> ApiResult<Json<Presence>> {
    let row = state
        .db
        .get_user(user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(row.to_presence()))
}

pub async fn update_me(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<User>> {
    if let Some(username) = req.username.as_deref() {
        check_username(username)?;
        if let Some(other) = state.db.get_user_by_username(username)? {
            if other.id != auth.id {
                return Err(ApiError::Conflict("Username already taken".into()));
            }
        }
    }
    if let Some(email) = req.email.as_deref() {
        check_email(email)?;
        if let Some(other) = state.db.get_user_by_email(email)? {
            if other.id != auth.id {
                return Err(ApiError::Conflict("Email already registered".into()));
            }
        }
    }

    state.db.update_account(
        auth.id,
        req.username.as_deref(),
        req.email.as_deref(),
        req.status.as_deref(),
        req.profile_picture.as_deref(),
    )?;
    Ok(Json(me(&state, auth.id)?.to_user()))
}

pub async fn my_profile(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserProfile>> {
    Ok(Json(me(&state, auth.id)?.to_profile()))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<UserProfile>> {
    state.db.update_profile(
        auth.id,
        req.full_name.as_deref(),
        req.job_title.as_deref(),
        req.phone.as_deref(),
        req.timezone.as_deref(),
        req.bio.as_deref(),
        req.profile_picture.as_deref(),
    )?;
    Ok(Json(me(&state, auth.id)?.to_profile()))
}

pub async fn update_presence(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<PresenceUpdate>,
) -> ApiResult<Json<Presence>> {
    if !PRESENCES.contains(&req.presence.as_str()) {
        return Err(ApiError::Validation(format!(
            "Presence must be one of: {}",
            PRESENCES.join(", ")
        )));
    }
    state.db.set_presence(auth.id, &req.presence)?;
    Ok(Json(me(&state, auth.id)?.to_presence()))
}

pub async fn update_status(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<StatusUpdate>,
) -> ApiResult<Json<Presence>> {
    state.db.set_custom_status(
        auth.id,
        req.status_text.as_deref(),
        req.status_emoji.as_deref(),
        req.status_expires_at,
    )?;
    Ok(Json(me(&state, auth.id)?.to_presence()))
}

pub async fn preferences(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Preferences>> {
    Ok(Json(me(&state, auth.id)?.to_preferences()))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<PreferencesUpdate>,
) -> ApiResult<Json<Preferences>> {
    if let Some(theme) = req.theme.as_deref() {
        if !THEMES.contains(&theme) {
            return Err(ApiError::Validation("Theme must be light or dark".into()));
        }
    }
    state.db.update_preferences(
        auth.id,
        req.theme.as_deref(),
        req.notification_sound,
        req.email_notifications,
    )?;
    Ok(Json(me(&state, auth.id)?.to_preferences()))
}

pub async fn add_contact(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<AddContactRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.contact_id == auth.id {
        return Err(ApiError::Validation("Cannot add yourself as a contact".into()));
    }
    let contact = state
        .db
        .get_user(req.contact_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    if state.db.is_contact(auth.id, contact.id)? {
        return Err(ApiError::Conflict("User is already in your contacts".into()));
    }

    state.db.add_contact(auth.id, contact.id)?;
    Ok((StatusCode::CREATED, Json(contact.to_user())))
}

pub async fn list_contacts(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<User>>> {
    let rows = state.db.list_contacts(auth.id)?;
    Ok(Json(rows.iter().map(|u| u.to_user()).collect()))
}

pub async fn remove_contact(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(contact_id): Path<i64>,
) -> ApiResult<StatusCode> {
    if !state.db.remove_contact(auth.id, contact_id)? {
        return Err(ApiError::Validation("User is not in your contacts".into()));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn me(state: &AppState, id: i64) -> ApiResult<UserRow> {
    state
        .db
        .get_user(id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}
