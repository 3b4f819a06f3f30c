//! Workspace proxy authorization handler

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::service::authorization::AuthorizationResponse;
use crate::{AppState, Result};

/// Authorize request sent by the workspaces proxy
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    pub workspace_host: String,
    pub user_id: i64,
}

/// Decide whether a user may reach a workspace host
pub async fn authorize(
    State(state): State<AppState>,
    Json(req): Json<AuthorizeRequest>,
) -> Result<Json<AuthorizationResponse>> {
    let response = state
        .authorization_service
        .authorize(&req.workspace_host, req.user_id)
        .await?;

    Ok(Json(response))
}
