//! Reconciliation with cluster agents
//!
//! An agent periodically reports the actual state of the workspaces it runs
//! and receives back the workspaces it has to act on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::workspace::{Workspace, WorkspaceState};
use crate::error::Result;
use crate::infra::agent_config_repository::AgentConfigRepository;
use crate::infra::workspace_repository::{WorkspaceFilter, WorkspaceRepository};

/// Kind of report sent by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    /// Only workspaces with unsent desired state changes
    Partial,
    /// Every workspace that is not terminated
    Full,
}

/// State of one workspace as observed by the agent
#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceAgentInfo {
    pub name: String,
    pub actual_state: WorkspaceState,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconcileRequest {
    pub update_type: UpdateType,
    #[serde(default)]
    pub workspace_agent_infos: Vec<WorkspaceAgentInfo>,
}

/// Workspace the agent has to act on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceRailsInfo {
    pub name: String,
    pub desired_state: WorkspaceState,
    pub actual_state: WorkspaceState,
    pub processed_devfile: String,
    pub workspaces_agent_config_version: i64,
    pub include_all_resources: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconcileResponse {
    pub workspace_rails_infos: Vec<WorkspaceRailsInfo>,
}

/// Reconciliation service
pub struct ReconciliationService {
    workspaces: Arc<WorkspaceRepository>,
    agent_configs: Arc<AgentConfigRepository>,
}

impl ReconciliationService {
    pub fn new(workspaces: Arc<WorkspaceRepository>, agent_configs: Arc<AgentConfigRepository>) -> Self {
        Self {
            workspaces,
            agent_configs,
        }
    }

    /// Store what the agent reported and return what it has to do next
    pub async fn reconcile(&self, cluster_agent_id: i64, request: ReconcileRequest) -> Result<ReconcileResponse> {
        self.agent_configs.get_by_agent(cluster_agent_id).await?;

        for info in &request.workspace_agent_infos {
            match self.workspaces.get_by_name(&info.name).await? {
                Some(workspace) if workspace.cluster_agent_id == cluster_agent_id => {
                    if workspace.actual_state != info.actual_state {
                        debug!(
                            "Workspace {} actual state {} -> {}",
                            workspace.name, workspace.actual_state, info.actual_state
                        );
                        self.workspaces
                            .update_actual_state(workspace.id, info.actual_state)
                            .await?;
                    }
                }
                _ => warn!(
                    "Agent {} reported unknown workspace {}",
                    cluster_agent_id, info.name
                ),
            }
        }

        let full = request.update_type == UpdateType::Full;
        let (responded_at, selected) = self.select(cluster_agent_id, full).await?;
        let workspace_rails_infos = self.respond(selected, responded_at, full).await?;

        info!(
            "Reconciled agent {} ({:?}): {} reported, {} sent",
            cluster_agent_id,
            request.update_type,
            request.workspace_agent_infos.len(),
            workspace_rails_infos.len()
        );

        Ok(ReconcileResponse {
            workspace_rails_infos,
        })
    }

    /// Pick the workspaces to send, with the time to record as their response
    ///
    /// The time is taken before the read so that a desired state change
    /// landing after the read still counts as pending on the next report.
    async fn select(&self, cluster_agent_id: i64, full: bool) -> Result<(DateTime<Utc>, Vec<Workspace>)> {
        let responded_at = Utc::now();
        let filter = WorkspaceFilter {
            user_id: None,
            cluster_agent_id: Some(cluster_agent_id),
        };

        let selected = self
            .workspaces
            .list(&filter)
            .await?
            .into_iter()
            .filter(|w| w.desired_state_pending() || (full && !w.is_terminated()))
            .collect();

        Ok((responded_at, selected))
    }

    async fn respond(
        &self,
        selected: Vec<Workspace>,
        responded_at: DateTime<Utc>,
        full: bool,
    ) -> Result<Vec<WorkspaceRailsInfo>> {
        let mut workspace_rails_infos = Vec::with_capacity(selected.len());
        for workspace in selected {
            self.workspaces
                .mark_responded(workspace.id, responded_at)
                .await?;

            workspace_rails_infos.push(WorkspaceRailsInfo {
                include_all_resources: full || workspace.force_include_all_resources,
                name: workspace.name,
                desired_state: workspace.desired_state,
                actual_state: workspace.actual_state,
                processed_devfile: workspace.processed_devfile,
                workspaces_agent_config_version: workspace.workspaces_agent_config_version,
            });
        }

        Ok(workspace_rails_infos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::agent_config::AgentConfigSettings;
    use crate::domain::workspace::CreateWorkspaceParams;
    use crate::error::Error;
    use crate::infra::crypto::VariableCipher;
    use crate::infra::sqlite::create_test_pool;
    use crate::infra::variable_repository::VariableRepository;
    use crate::service::agent_config::AgentConfigService;
    use crate::service::workspace::WorkspaceService;

    struct Fixture {
        reconciliation: ReconciliationService,
        workspaces: WorkspaceService,
    }

    async fn fixture() -> Fixture {
        let pool = create_test_pool().await;
        let repository = Arc::new(WorkspaceRepository::new(pool.clone()));
        let agent_configs = Arc::new(AgentConfigRepository::new(pool.clone()));
        let variables = Arc::new(VariableRepository::new(
            pool,
            VariableCipher::from_secret("test").unwrap(),
        ));

        let settings: AgentConfigSettings = serde_json::from_value(serde_json::json!({
            "enabled": true,
            "dns_zone": "ws.example.com",
        }))
        .unwrap();
        AgentConfigService::new(agent_configs.clone())
            .upsert(1, settings)
            .await
            .unwrap();

        Fixture {
            reconciliation: ReconciliationService::new(repository.clone(), agent_configs.clone()),
            workspaces: WorkspaceService::new(repository, agent_configs, variables),
        }
    }

    async fn create(f: &Fixture, user_id: i64) -> Workspace {
        f.workspaces
            .create(CreateWorkspaceParams {
                user_id,
                project_id: 1,
                cluster_agent_id: 1,
                devfile: "schemaVersion: 2.2.0".to_string(),
                variables: Vec::new(),
            })
            .await
            .unwrap()
    }

    fn request(update_type: UpdateType, infos: &[(&str, WorkspaceState)]) -> ReconcileRequest {
        ReconcileRequest {
            update_type,
            workspace_agent_infos: infos
                .iter()
                .map(|(name, actual_state)| WorkspaceAgentInfo {
                    name: name.to_string(),
                    actual_state: *actual_state,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_partial_sends_only_pending_changes() {
        let f = fixture().await;
        let workspace = create(&f, 42).await;

        let first = f
            .reconciliation
            .reconcile(1, request(UpdateType::Partial, &[]))
            .await
            .unwrap();
        assert_eq!(first.workspace_rails_infos.len(), 1);
        assert_eq!(first.workspace_rails_infos[0].name, workspace.name);
        assert!(first.workspace_rails_infos[0].include_all_resources);

        let second = f
            .reconciliation
            .reconcile(
                1,
                request(UpdateType::Partial, &[(&workspace.name, WorkspaceState::Running)]),
            )
            .await
            .unwrap();
        assert!(second.workspace_rails_infos.is_empty());
        assert_eq!(
            f.workspaces.get(workspace.id).await.unwrap().actual_state,
            WorkspaceState::Running
        );

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        f.workspaces
            .update_desired_state(workspace.id, WorkspaceState::Stopped)
            .await
            .unwrap();

        let third = f
            .reconciliation
            .reconcile(1, request(UpdateType::Partial, &[]))
            .await
            .unwrap();
        assert_eq!(third.workspace_rails_infos.len(), 1);
        assert_eq!(third.workspace_rails_infos[0].desired_state, WorkspaceState::Stopped);
        assert!(!third.workspace_rails_infos[0].include_all_resources);
    }

    #[tokio::test]
    async fn test_full_sends_all_non_terminated() {
        let f = fixture().await;
        let running = create(&f, 42).await;
        let terminated = create(&f, 43).await;

        f.workspaces
            .update_desired_state(terminated.id, WorkspaceState::Terminated)
            .await
            .unwrap();
        f.reconciliation
            .reconcile(
                1,
                request(
                    UpdateType::Partial,
                    &[
                        (&running.name, WorkspaceState::Running),
                        (&terminated.name, WorkspaceState::Terminated),
                    ],
                ),
            )
            .await
            .unwrap();

        let full = f
            .reconciliation
            .reconcile(1, request(UpdateType::Full, &[]))
            .await
            .unwrap();
        assert_eq!(full.workspace_rails_infos.len(), 1);
        assert_eq!(full.workspace_rails_infos[0].name, running.name);
        assert!(full.workspace_rails_infos[0].include_all_resources);
    }

    #[tokio::test]
    async fn test_unknown_workspaces_are_skipped() {
        let f = fixture().await;

        let response = f
            .reconciliation
            .reconcile(
                1,
                request(UpdateType::Partial, &[("workspace-9-9-zzzzzz", WorkspaceState::Running)]),
            )
            .await
            .unwrap();
        assert!(response.workspace_rails_infos.is_empty());
    }

    #[tokio::test]
    async fn test_requires_agent_config() {
        let f = fixture().await;

        assert!(matches!(
            f.reconciliation
                .reconcile(2, request(UpdateType::Full, &[]))
                .await,
            Err(Error::AgentConfigNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_change_after_selection_is_sent_next_time() {
        let f = fixture().await;
        let workspace = create(&f, 42).await;
        f.reconciliation
            .reconcile(1, request(UpdateType::Partial, &[]))
            .await
            .unwrap();

        // Owner stops the workspace between selection and the response stamp
        let (responded_at, selected) = f.reconciliation.select(1, true).await.unwrap();
        f.workspaces
            .update_desired_state(workspace.id, WorkspaceState::Stopped)
            .await
            .unwrap();
        let sent = f
            .reconciliation
            .respond(selected, responded_at, true)
            .await
            .unwrap();
        assert_eq!(sent[0].desired_state, WorkspaceState::Running);

        let next = f
            .reconciliation
            .reconcile(1, request(UpdateType::Partial, &[]))
            .await
            .unwrap();
        assert_eq!(next.workspace_rails_infos.len(), 1);
        assert_eq!(next.workspace_rails_infos[0].desired_state, WorkspaceState::Stopped);
    }
}
