use std::sync::LazyLock;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use rand::RngCore;
use regex::Regex;
use tracing::{info, warn};

use hearth_db::models::NewUser;
use hearth_types::api::{AuthCheck, AuthResponse, LoginRequest, SignupRequest, StatusMessage};
use hearth_types::models::User;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::AuthUser;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
});

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/check", get(check))
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<SignupRequest>,
) -> ApiResult<impl IntoResponse> {
    let username = req.username.trim();
    let email = req.email.trim();

    check_username(username)?;
    check_email(email)?;
    if req.password.chars().count() < 8 {
        return Err(ApiError::Validation("Password must be at least 8 characters".into()));
    }

    if state.db.get_user_by_username(username)?.is_some() {
        return Err(ApiError::Conflict("Username already registered".into()));
    }
    if state.db.get_user_by_email(email)?.is_some() {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = state
        .db
        .create_user(&NewUser {
            username,
            email,
            password_hash: &password_hash,
            status: "online",
            ..Default::default()
        })
        .map_err(|e| {
            if hearth_db::is_unique_violation(&e) {
                ApiError::Conflict("Username or email already registered".into())
            } else {
                e.into()
            }
        })?;

    let cookie = issue_session(&state, user_id)?;
    let user = load_user(&state, user_id)?;
    info!("New account {} ({})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(AuthResponse {
            message: "Signup successful".into(),
            user,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let invalid = || ApiError::Unauthenticated("Invalid username or password".into());

    let row = state.db.get_user_by_username(req.username.trim())?.ok_or_else(invalid)?;
    if !verify_password(&row.password_hash, &req.password) {
        warn!("Failed login for {}", row.username);
        return Err(invalid());
    }

    state.db.set_status(row.id, "online")?;
    let cookie = issue_session(&state, row.id)?;
    let user = load_user(&state, row.id)?;

    Ok((
        jar.add(cookie),
        Json(AuthResponse {
            message: "Login successful".into(),
            user,
        }),
    ))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let name = state.config.session_cookie.clone();

    if let Some(token) = jar.get(&name).map(|c| c.value().to_owned()) {
        if let Some(session) = state.db.get_session(&token)? {
            state.db.delete_session(&token)?;
            if state.db.user_exists(session.user_id)? {
                state.db.set_offline(session.user_id)?;
            }
        }
    }

    let jar = jar.remove(Cookie::build((name, "")).path("/"));
    Ok((jar, Json(StatusMessage::new("Logout successful"))))
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<User>> {
    Ok(Json(load_user(&state, auth.id)?))
}

/// Reports whether the cookie names a live session. Never writes.
pub async fn check(State(state): State<AppState>, jar: CookieJar) -> ApiResult<Json<AuthCheck>> {
    let unauthenticated = AuthCheck {
        authenticated: false,
        user_id: None,
    };

    let Some(token) = jar.get(&state.config.session_cookie).map(|c| c.value().to_owned()) else {
        return Ok(Json(unauthenticated));
    };
    let Some(session) = state.db.get_session(&token)? else {
        return Ok(Json(unauthenticated));
    };
    if session.is_expired(Utc::now()) || !state.db.user_exists(session.user_id)? {
        return Ok(Json(unauthenticated));
    }

    Ok(Json(AuthCheck {
        authenticated: true,
        user_id: Some(session.user_id),
    }))
}

pub(crate) fn check_username(username: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ApiError::Validation("Username must be 3 to 32 characters".into()));
    }
    Ok(())
}

pub(crate) fn check_email(email: &str) -> ApiResult<()> {
    if !EMAIL.is_match(email) {
        return Err(ApiError::Validation("Invalid email address".into()));
    }
    Ok(())
}

/// Argon2id PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

pub fn verify_password(stored: &str, password: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => {
            warn!("Stored password hash is not a PHC string");
            false
        }
    }
}

/// 256 random bits, URL-safe base64 without padding.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn issue_session(state: &AppState, user_id: i64) -> ApiResult<Cookie<'static>> {
    let token = generate_token();
    let ttl = state.config.session_ttl_hours;
    let now = Utc::now();
    let expires_at = Duration::try_hours(ttl)
        .filter(|d| *d > Duration::zero())
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| anyhow::anyhow!("session ttl of {} hours is out of range", ttl))?;
    state.db.create_session(&token, user_id, now, expires_at)?;

    Ok(Cookie::build((state.config.session_cookie.clone(), token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::hours(ttl))
        .build())
}

fn load_user(state: &AppState, id: i64) -> ApiResult<User> {
    state
        .db
        .get_user(id)?
        .map(|u| u.to_user())
        .ok_or_else(|| ApiError::NotFound("User not found".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_and_are_salted() {
        let a = hash_password("correct horse").unwrap();
        let b = hash_password("correct horse").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(verify_password(&a, "correct horse"));
        assert!(!verify_password(&a, "wrong horse"));
    }

    #[test]
    fn plaintext_is_never_accepted_as_a_hash() {
        assert!(!verify_password("hunter22", "hunter22"));
    }

    #[test]
    fn tokens_are_43_url_safe_chars() {
        let t = generate_token();
        assert_eq!(t.len(), 43);
        assert!(t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(t, generate_token());
    }

    #[test]
    fn email_shape() {
        assert!(EMAIL.is_match("alice@example.com"));
        assert!(!EMAIL.is_match("alice"));
        assert!(!EMAIL.is_match("alice@localhost"));
        assert!(!EMAIL.is_match("a b@example.com"));
    }
}
