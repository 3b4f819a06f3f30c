//! Agent reconciliation handler

use axum::{
    extract::{Path, State},
    Json,
};

use crate::service::reconciliation::{ReconcileRequest, ReconcileResponse};
use crate::{AppState, Result};

/// Accept an agent report and answer with the workspaces to act on
pub async fn reconcile(
    State(state): State<AppState>,
    Path(agent_id): Path<i64>,
    Json(req): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>> {
    let response = state
        .reconciliation_service
        .reconcile(agent_id, req)
        .await?;
    Ok(Json(response))
}
