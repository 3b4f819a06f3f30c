//! Workspaces agent config HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};

use crate::domain::agent_config::AgentConfigSettings;
use crate::service::agent_config::AgentConfigView;
use crate::{AppState, Result};

/// Create or replace the config of an agent
pub async fn put_agent_config(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
    Json(settings): Json<AgentConfigSettings>,
) -> Result<Json<AgentConfigView>> {
    let view = state.agent_config_service.upsert(agent_id, settings).await?;
    Ok(Json(view))
}

/// Get the live config of an agent
pub async fn get_agent_config(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
) -> Result<Json<AgentConfigView>> {
    let view = state.agent_config_service.get(agent_id).await?;
    Ok(Json(view))
}
