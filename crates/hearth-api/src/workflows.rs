use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;

use hearth_types::api::{CreateWorkflowRequest, UpdateWorkflowRequest};
use hearth_types::models::Workflow;

use crate::AppState;
use crate::access;
use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiQuery, Page, default_limit};
use crate::middleware::AuthUser;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/workflows", get(list_workflows).post(create_workflow))
        .route(
            "/api/workflows/{workflow_id}",
            get(get_workflow).put(update_workflow).delete(delete_workflow),
        )
        .route("/api/workflows/{workflow_id}/toggle", post(toggle))
}

pub async fn create_workflow(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(req): ApiJson<CreateWorkflowRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("Workflow name cannot be empty".into()));
    }
    if req.trigger_type.trim().is_empty() || req.action_type.trim().is_empty() {
        return Err(ApiError::Validation("trigger_type and action_type are required".into()));
    }
    if let Some(channel_id) = req.channel_id {
        access::channel(&state.db, channel_id)?;
        access::require_member(&state.db, channel_id, auth.id)?;
    }

    let workflow = state.db.create_workflow(&req, auth.id)?;
    Ok((StatusCode::CREATED, Json(workflow)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub channel_id: Option<i64>,
    pub is_active: Option<bool>,
}

/// Workflows the caller created.
pub async fn list_workflows(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(q): ApiQuery<ListQuery>,
) -> ApiResult<Json<Vec<Workflow>>> {
    let (skip, limit) = Page {
        skip: q.skip,
        limit: q.limit,
    }
    .bounds();
    Ok(Json(state.db.list_workflows(
        auth.id,
        q.channel_id,
        q.is_active,
        skip,
        limit,
    )?))
}

pub async fn get_workflow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workflow_id): Path<i64>,
) -> ApiResult<Json<Workflow>> {
    Ok(Json(owned(&state, workflow_id, auth.id)?))
}

pub async fn update_workflow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workflow_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateWorkflowRequest>,
) -> ApiResult<Json<Workflow>> {
    owned(&state, workflow_id, auth.id)?;
    state.db.update_workflow(
        workflow_id,
        req.name.as_deref(),
        req.description.as_deref(),
        req.is_active,
    )?;
    Ok(Json(owned(&state, workflow_id, auth.id)?))
}

pub async fn delete_workflow(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workflow_id): Path<i64>,
) -> ApiResult<StatusCode> {
    owned(&state, workflow_id, auth.id)?;
    state.db.delete_workflow(workflow_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(workflow_id): Path<i64>,
) -> ApiResult<Json<Workflow>> {
    owned(&state, workflow_id, auth.id)?;
    state.db.toggle_workflow(workflow_id)?;
    Ok(Json(owned(&state, workflow_id, auth.id)?))
}

fn owned(state: &AppState, id: i64, user_id: i64) -> ApiResult<Workflow> {
    let workflow = state
        .db
        .get_workflow(id)?
        .ok_or_else(|| ApiError::NotFound("Workflow not found".into()))?;
    access::require_owner(workflow.created_by, user_id, "workflows")?;
    Ok(workflow)
}
