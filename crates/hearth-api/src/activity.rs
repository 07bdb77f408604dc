use axum::{Json, Router, extract::State, routing::get};
use chrono::{Duration, Utc};
use serde::Deserialize;

use hearth_types::models::{Activity, FeedActivity};

use crate::AppState;
use crate::error::ApiResult;
use crate::extract::{ApiQuery, Page, default_limit};
use crate::middleware::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/activity", get(my_activity))
        .route("/api/activity/all", get(feed))
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    7
}

/// The caller's activities from the last `days` days, newest first.
pub async fn my_activity(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(q): ApiQuery<ActivityQuery>,
) -> ApiResult<Json<Vec<Activity>>> {
    let (skip, limit) = Page {
        skip: q.skip,
        limit: q.limit,
    }
    .bounds();
    let since = Utc::now() - Duration::days(q.days.clamp(1, 365));
    Ok(Json(state.db.list_activities(auth.id, since, skip, limit)?))
}

pub async fn feed(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(page): ApiQuery<Page>,
) -> ApiResult<Json<Vec<FeedActivity>>> {
    let (skip, limit) = page.bounds();
    Ok(Json(state.db.activity_feed(skip, limit)?))
}
