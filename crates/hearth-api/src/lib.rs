pub mod access;
pub mod activity;
pub mod attachments;
pub mod auth;
pub mod bookmarks;
pub mod calls;
pub mod canvas;
pub mod channels;
pub mod config;
pub mod direct_messages;
pub mod drafts;
pub mod emojis;
pub mod error;
pub mod extract;
pub mod groups;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod notify;
pub mod permalinks;
pub mod pins;
pub mod scheduled;
pub mod search;
pub mod storage;
pub mod users;
pub mod workflows;

use std::sync::Arc;

use axum::{Json, Router, extract::DefaultBodyLimit, routing::get};

use hearth_db::Database;
use hearth_types::api::HealthResponse;

use crate::config::Config;
use crate::storage::{MAX_UPLOAD_BYTES, Storage};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub config: Config,
    pub storage: Storage,
}

/// Whole-request cap; individual files are held to [`MAX_UPLOAD_BYTES`].
const MAX_BODY_BYTES: usize = 5 * MAX_UPLOAD_BYTES;

/// Every `/api` route behind the session gate.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .merge(auth::routes())
        .merge(users::routes())
        .merge(channels::routes())
        .merge(messages::routes())
        .merge(direct_messages::routes())
        .merge(search::routes())
        .merge(attachments::routes())
        .merge(notifications::routes())
        .merge(pins::routes())
        .merge(bookmarks::routes())
        .merge(drafts::routes())
        .merge(scheduled::routes())
        .merge(groups::routes())
        .merge(emojis::routes())
        .merge(canvas::routes())
        .merge(workflows::routes())
        .merge(activity::routes())
        .merge(permalinks::routes())
        .merge(calls::routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ))
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}
