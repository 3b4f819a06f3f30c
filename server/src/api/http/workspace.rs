//! Workspace HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::variable::{VariableParams, WorkspaceVariable};
use crate::domain::workspace::{CreateWorkspaceParams, Workspace, WorkspaceState};
use crate::infra::workspace_repository::WorkspaceFilter;
use crate::service::workspace::ResolvedAgentConfig;
use crate::{AppState, Result};

// ==================== Request/Response Types ====================

/// Create workspace request
#[derive(Debug, Deserialize)]
pub struct CreateWorkspaceRequest {
    pub user_id: i64,
    pub project_id: i64,
    pub cluster_agent_id: i64,
    pub devfile: String,
    #[serde(default)]
    pub variables: Vec<VariableParams>,
}

/// Workspace response
#[derive(Debug, Serialize)]
pub struct WorkspaceResponse {
    pub id: i64,
    pub name: String,
    pub user_id: i64,
    pub project_id: i64,
    pub cluster_agent_id: i64,
    pub desired_state: String,
    pub actual_state: String,
    pub desired_state_updated_at: String,
    pub responded_to_agent_at: Option<String>,
    pub url: String,
    pub devfile: String,
    pub processed_devfile: String,
    pub workspaces_agent_config_version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Workspace> for WorkspaceResponse {
    fn from(w: Workspace) -> Self {
        Self {
            id: w.id,
            name: w.name,
            user_id: w.user_id,
            project_id: w.project_id,
            cluster_agent_id: w.cluster_agent_id,
            desired_state: w.desired_state.as_str().to_string(),
            actual_state: w.actual_state.as_str().to_string(),
            desired_state_updated_at: w.desired_state_updated_at.to_rfc3339(),
            responded_to_agent_at: w.responded_to_agent_at.map(|t| t.to_rfc3339()),
            url: w.url,
            devfile: w.devfile,
            processed_devfile: w.processed_devfile,
            workspaces_agent_config_version: w.workspaces_agent_config_version,
            created_at: w.created_at.to_rfc3339(),
            updated_at: w.updated_at.to_rfc3339(),
        }
    }
}

/// List workspaces response
#[derive(Debug, Serialize)]
pub struct ListWorkspacesResponse {
    pub workspaces: Vec<WorkspaceResponse>,
    pub total: usize,
}

/// List query parameters
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<i64>,
    pub agent_id: Option<i64>,
}

/// Update desired state request
#[derive(Debug, Deserialize)]
pub struct UpdateDesiredStateRequest {
    pub desired_state: WorkspaceState,
}

/// List variables response
#[derive(Debug, Serialize)]
pub struct ListVariablesResponse {
    pub variables: Vec<WorkspaceVariable>,
}

// ==================== Handlers ====================

/// Create a new workspace
pub async fn create_workspace(
    State(state): State<AppState>,
    Json(req): Json<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<WorkspaceResponse>)> {
    let params = CreateWorkspaceParams {
        user_id: req.user_id,
        project_id: req.project_id,
        cluster_agent_id: req.cluster_agent_id,
        devfile: req.devfile,
        variables: req.variables,
    };

    let workspace = state.workspace_service.create(params).await?;

    Ok((StatusCode::CREATED, Json(workspace.into())))
}

/// Get a workspace by ID
pub async fn get_workspace(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<WorkspaceResponse>> {
    let workspace = state.workspace_service.get(id).await?;
    Ok(Json(workspace.into()))
}

/// List workspaces
pub async fn list_workspaces(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListWorkspacesResponse>> {
    let filter = WorkspaceFilter {
        user_id: query.user_id,
        cluster_agent_id: query.agent_id,
    };

    let workspaces: Vec<WorkspaceResponse> = state
        .workspace_service
        .list(&filter)
        .await?
        .into_iter()
        .map(WorkspaceResponse::from)
        .collect();

    let total = workspaces.len();
    Ok(Json(ListWorkspacesResponse { workspaces, total }))
}

/// Change the desired state of a workspace
pub async fn update_desired_state(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateDesiredStateRequest>,
) -> Result<Json<WorkspaceResponse>> {
    let workspace = state
        .workspace_service
        .update_desired_state(id, req.desired_state)
        .await?;
    Ok(Json(workspace.into()))
}

/// Get the agent config version a workspace runs with
pub async fn get_agent_config(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ResolvedAgentConfig>> {
    let resolved = state.workspace_service.resolve_agent_config(id).await?;
    Ok(Json(resolved))
}

/// List the variables of a workspace
pub async fn list_variables(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ListVariablesResponse>> {
    let variables = state.workspace_service.variables(id).await?;
    Ok(Json(ListVariablesResponse { variables }))
}
