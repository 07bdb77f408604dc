use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Method, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use tracing::warn;

use crate::AppState;
use crate::error::ApiError;

/// The account behind a validated session, attached by [`require_session`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

/// Session gate for everything under `/api/`.
///
/// Allow-listed prefixes, `OPTIONS` and non-API paths pass through untouched.
/// Expired sessions are deleted on first sight; nothing else is written.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path();
    if req.method() == Method::OPTIONS || !path.starts_with("/api/") || state.config.is_public(path) {
        return Ok(next.run(req).await);
    }

    let token = jar
        .get(&state.config.session_cookie)
        .map(|c| c.value().to_owned())
        .ok_or_else(|| ApiError::Unauthenticated("Not authenticated".into()))?;

    let user = resolve_session(&state, &token)?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub(crate) fn resolve_session(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    let session = state
        .db
        .get_session(token)?
        .ok_or_else(|| ApiError::Unauthenticated("Invalid session".into()))?;

    if session.is_expired(Utc::now()) {
        state.db.delete_session(token)?;
        warn!("Rejected expired session for user {}", session.user_id);
        return Err(ApiError::Unauthenticated("Session expired".into()));
    }

    let user = state.db.get_user(session.user_id)?.ok_or_else(|| {
        warn!("Session {} points at missing user {}", session.id, session.user_id);
        ApiError::Unauthenticated("User not found".into())
    })?;

    Ok(AuthUser {
        id: user.id,
        username: user.username,
    })
}

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthenticated("Not authenticated".into()))
    }
}
