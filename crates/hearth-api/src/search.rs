use axum::{Json, Router, extract::State, routing::get};
use serde::Deserialize;

use hearth_types::models::{ChannelSummary, DirectMessage, Message, SearchHit, SearchResponse, User};

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiQuery, default_limit};
use crate::middleware::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/search", get(search))
        .route("/api/search/messages", get(search_messages))
        .route("/api/search/users", get(search_users))
        .route("/api/search/channels", get(search_channels))
        .route("/api/search/direct-messages", get(search_direct_messages))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    #[default]
    All,
    Messages,
    Channels,
    Users,
    DirectMessages,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub search_type: SearchType,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

/// Mixed search over everything the caller can see. `total_count` is taken
/// before the result list is cut to `limit`.
pub async fn search(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(params): ApiQuery<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let q = query_text(params.q.as_deref())?;
    let limit = check_limit(params.limit)?;
    let wants = |t: SearchType| params.search_type == SearchType::All || params.search_type == t;

    let mut results = Vec::new();
    if wants(SearchType::Users) {
        results.extend(
            state
                .db
                .search_users(q)?
                .iter()
                .map(|u| SearchHit::User(u.to_user())),
        );
    }
    if wants(SearchType::Channels) {
        results.extend(
            state
                .db
                .search_channels(auth.id, q, true)?
                .iter()
                .map(|c| SearchHit::Channel(c.to_summary())),
        );
    }
    if wants(SearchType::Messages) {
        results.extend(
            state
                .db
                .search_messages(auth.id, q, None)?
                .into_iter()
                .map(SearchHit::Message),
        );
    }
    if wants(SearchType::DirectMessages) {
        results.extend(
            state
                .db
                .search_direct_messages(auth.id, q, None)?
                .into_iter()
                .map(SearchHit::DirectMessage),
        );
    }

    let total_count = results.len();
    results.truncate(limit);
    Ok(Json(SearchResponse {
        query: q.to_string(),
        results,
        total_count,
    }))
}

#[derive(Debug, Deserialize)]
pub struct MessageSearchQuery {
    pub q: Option<String>,
    pub channel_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub async fn search_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(params): ApiQuery<MessageSearchQuery>,
) -> ApiResult<Json<Vec<Message>>> {
    let q = query_text(params.q.as_deref())?;
    let limit = check_limit(params.limit)?;
    let mut hits = state.db.search_messages(auth.id, q, params.channel_id)?;
    hits.truncate(limit);
    Ok(Json(hits))
}

#[derive(Debug, Deserialize)]
pub struct UserSearchQuery {
    pub q: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub async fn search_users(
    State(state): State<AppState>,
    _auth: AuthUser,
    ApiQuery(params): ApiQuery<UserSearchQuery>,
) -> ApiResult<Json<Vec<User>>> {
    let q = query_text(params.q.as_deref())?;
    let limit = check_limit(params.limit)?;
    let hits = state.db.search_users(q)?;
    Ok(Json(hits.iter().take(limit).map(|u| u.to_user()).collect()))
}

#[derive(Debug, Deserialize)]
pub struct ChannelSearchQuery {
    pub q: Option<String>,
    #[serde(default)]
    pub include_private: bool,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub async fn search_channels(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(params): ApiQuery<ChannelSearchQuery>,
) -> ApiResult<Json<Vec<ChannelSummary>>> {
    let q = query_text(params.q.as_deref())?;
    let limit = check_limit(params.limit)?;
    let hits = state.db.search_channels(auth.id, q, params.include_private)?;
    Ok(Json(hits.iter().take(limit).map(|c| c.to_summary()).collect()))
}

#[derive(Debug, Deserialize)]
pub struct DmSearchQuery {
    pub q: Option<String>,
    pub user_id: Option<i64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

pub async fn search_direct_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(params): ApiQuery<DmSearchQuery>,
) -> ApiResult<Json<Vec<DirectMessage>>> {
    let q = query_text(params.q.as_deref())?;
    let limit = check_limit(params.limit)?;
    let mut hits = state.db.search_direct_messages(auth.id, q, params.user_id)?;
    hits.truncate(limit);
    Ok(Json(hits))
}

fn query_text(q: Option<&str>) -> ApiResult<&str> {
    match q.map(str::trim) {
        Some(q) if !q.is_empty() => Ok(q),
        _ => Err(ApiError::Validation("Search query is required".into())),
    }
}

fn check_limit(limit: i64) -> ApiResult<usize> {
    if !(1..=100).contains(&limit) {
        return Err(ApiError::Validation("limit must be between 1 and 100".into()));
    }
    Ok(limit as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_queries_are_rejected() {
        assert!(query_text(None).is_err());
        assert!(query_text(Some("   ")).is_err());
        assert_eq!(query_text(Some(" hi ")).unwrap(), "hi");
    }

    #[test]
    fn limit_bounds() {
        assert!(check_limit(0).is_err());
        assert!(check_limit(101).is_err());
        assert_eq!(check_limit(100).unwrap(), 100);
    }
}
