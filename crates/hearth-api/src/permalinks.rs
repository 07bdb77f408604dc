use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use uuid::Uuid;

use hearth_types::api::CreatePermalinkRequest;
use hearth_types::models::{Permalink, PermalinkTarget};

use crate::AppState;
use crate::access::{self, Target};
use crate::error::{ApiError, ApiResult};
use crate::extract::ApiJson;
use crate::middleware::AuthUser;

const SLUG_ATTEMPTS: usize = 3;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/permalinks", post(create_permalink))
        .route("/api/permalinks/{slug}", get(resolve))
}

/// Returns the existing permalink for the target if there is one (200),
/// otherwise mints a new one (201).
pub async fn create_permalink(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreatePermalinkRequest>,
) -> ApiResult<Response> {
    match access::exactly_one(
        req.message_id,
        req.direct_message_id,
        "Provide exactly one of message_id or direct_message_id",
    )? {
        Target::First(message_id) => {
            access::readable_message(&state.db, message_id, auth.id)?;
        }
        Target::Second(dm_id) => {
            access::participant_dm(&state.db, dm_id, auth.id)?;
        }
    }

    if let Some(existing) = state
        .db
        .find_permalink(req.message_id, req.direct_message_id)?
    {
        return Ok(Json(existing).into_response());
    }

    let mut attempt = 0;
    let permalink: Permalink = loop {
        attempt += 1;
        match state
            .db
            .create_permalink(req.message_id, req.direct_message_id, &new_slug())
        {
            Ok(p) => break p,
            Err(e) if hearth_db::is_unique_violation(&e) && attempt < SLUG_ATTEMPTS => continue,
            Err(e) => return Err(e.into()),
        }
    };

    Ok((StatusCode::CREATED, Json(permalink)).into_response())
}

pub async fn resolve(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(slug): Path<String>,
) -> ApiResult<Json<PermalinkTarget>> {
    let link = state
        .db
        .get_permalink(&slug)?
        .ok_or_else(|| ApiError::NotFound("Permalink not found".into()))?;

    let target = match (link.message_id, link.direct_message_id) {
        (Some(message_id), _) => {
            access::readable_message(&state.db, message_id, auth.id)?;
            let message = state
                .db
                .get_message(message_id)?
                .ok_or_else(|| ApiError::NotFound("Message not found".into()))?;
            PermalinkTarget::Message { message }
        }
        (None, Some(dm_id)) => {
            access::participant_dm(&state.db, dm_id, auth.id)?;
            let direct_message = state
                .db
                .get_direct_message(dm_id)?
                .ok_or_else(|| ApiError::NotFound("Direct message not found".into()))?;
            PermalinkTarget::DirectMessage { direct_message }
        }
        (None, None) => return Err(ApiError::NotFound("Permalink target no longer exists".into())),
    };
    Ok(Json(target))
}

/// First eight characters of a v4 UUID.
fn new_slug() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}
