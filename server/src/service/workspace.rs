//! Workspace service

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::agent_config::AgentConfigSettings;
use crate::domain::variable::{VariableParams, WorkspaceVariable};
use crate::domain::workspace::{
    editor_url, generate_name, validate_desired_state_transition, CreateWorkspaceParams,
    NewWorkspace, Workspace, WorkspaceState,
};
use crate::error::{Error, Result};
use crate::infra::agent_config_repository::AgentConfigRepository;
use crate::infra::variable_repository::VariableRepository;
use crate::infra::workspace_repository::{WorkspaceFilter, WorkspaceRepository};

/// Length of the random part of a workspace name
const NAME_SUFFIX_LENGTH: usize = 6;

/// Agent config a workspace runs with
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedAgentConfig {
    pub workspace_id: i64,
    pub workspaces_agent_config_version: i64,
    /// False when the stamped version fell back to the live config
    pub from_history: bool,
    #[serde(flatten)]
    pub settings: AgentConfigSettings,
}

/// Workspace service for managing workspace lifecycle
pub struct WorkspaceService {
    repository: Arc<WorkspaceRepository>,
    agent_configs: Arc<AgentConfigRepository>,
    variables: Arc<VariableRepository>,
    /// Serializes quota check and insert per cluster agent
    creation_locks: DashMap<i64, Arc<Mutex<()>>>,
}

impl WorkspaceService {
    /// Create a new workspace service
    pub fn new(
        repository: Arc<WorkspaceRepository>,
        agent_configs: Arc<AgentConfigRepository>,
        variables: Arc<VariableRepository>,
    ) -> Self {
        Self {
            repository,
            agent_configs,
            variables,
            creation_locks: DashMap::new(),
        }
    }

    /// Create a new workspace
    ///
    /// Fails when the agent has no enabled config or when the owner or the
    /// agent already reached its quota of non-terminated workspaces.
    pub async fn create(&self, params: CreateWorkspaceParams) -> Result<Workspace> {
        let agent_id = params.cluster_agent_id;
        info!(
            "Creating workspace for user {} on agent {}",
            params.user_id, agent_id
        );

        if params.devfile.trim().is_empty() {
            return Err(Error::InvalidParameter("devfile must not be empty".to_string()));
        }
        validate_variables(&params.variables)?;

        let lock = self.creation_locks.entry(agent_id).or_default().clone();
        let _guard = lock.lock().await;

        let mut tx = self.repository.begin().await?;

        let config = AgentConfigRepository::find_by_agent_in(&mut tx, agent_id)
            .await?
            .ok_or_else(|| Error::AgentConfigNotFound(agent_id.to_string()))?;
        if !config.settings.enabled {
            return Err(Error::AgentConfigDisabled(agent_id.to_string()));
        }

        let user_count =
            WorkspaceRepository::count_non_terminated(&mut tx, agent_id, Some(params.user_id))
                .await?;
        if config
            .settings
            .workspaces_per_user_quota
            .is_exceeded_by(user_count)
        {
            warn!(
                "User {} reached the per-user workspace quota of agent {}",
                params.user_id, agent_id
            );
            return Err(Error::WorkspacePerUserQuotaExceeded);
        }

        let agent_count = WorkspaceRepository::count_non_terminated(&mut tx, agent_id, None).await?;
        if config.settings.workspaces_quota.is_exceeded_by(agent_count) {
            warn!("Agent {} reached its workspace quota", agent_id);
            return Err(Error::WorkspaceQuotaExceeded);
        }

        let version = AgentConfigRepository::history_len(&mut tx, config.id).await?;

        let name = generate_name(agent_id, params.user_id, &random_suffix());
        let new_workspace = NewWorkspace {
            url: editor_url(&name, &config.settings.dns_zone),
            name,
            user_id: params.user_id,
            project_id: params.project_id,
            cluster_agent_id: agent_id,
            desired_state: WorkspaceState::Running,
            actual_state: WorkspaceState::CreationRequested,
            processed_devfile: params.devfile.clone(),
            devfile: params.devfile,
            workspaces_agent_config_version: version,
        };

        let id = WorkspaceRepository::insert(&mut tx, &new_workspace).await?;
        self.variables
            .insert_all(&mut tx, id, &params.variables)
            .await?;
        tx.commit().await?;

        info!(
            "Workspace {} created with agent config version {}",
            new_workspace.name, version
        );

        self.repository.get(id).await
    }

    /// Get a workspace by ID
    pub async fn get(&self, id: i64) -> Result<Workspace> {
        self.repository.get(id).await
    }

    /// List workspaces
    pub async fn list(&self, filter: &WorkspaceFilter) -> Result<Vec<Workspace>> {
        self.repository.list(filter).await
    }

    /// Change what the owner wants the workspace to be
    pub async fn update_desired_state(&self, id: i64, state: WorkspaceState) -> Result<Workspace> {
        let workspace = self.repository.get(id).await?;
        validate_desired_state_transition(workspace.desired_state, state)
            .map_err(Error::InvalidStateTransition)?;

        // A concurrent termination may have landed since the read above
        if !self.repository.update_desired_state(id, state).await? {
            let current = self.repository.get(id).await?;
            validate_desired_state_transition(current.desired_state, state)
                .map_err(Error::InvalidStateTransition)?;
        }

        info!(
            "Workspace {} desired state changed from {} to {}",
            workspace.name, workspace.desired_state, state
        );

        self.repository.get(id).await
    }

    /// Resolve the agent config the workspace was created against
    pub async fn resolve_agent_config(&self, id: i64) -> Result<ResolvedAgentConfig> {
        let workspace = self.repository.get(id).await?;
        let config = self
            .agent_configs
            .get_by_agent(workspace.cluster_agent_id)
            .await?;
        let history = self.agent_configs.history(config.id).await?;

        let version = workspace.workspaces_agent_config_version;
        let from_history = version >= 0 && version < history.versions_count();
        let settings = history.resolve(version, &config.settings).clone();

        Ok(ResolvedAgentConfig {
            workspace_id: workspace.id,
            workspaces_agent_config_version: version,
            from_history,
            settings,
        })
    }

    /// List the decrypted variables of a workspace
    pub async fn variables(&self, id: i64) -> Result<Vec<WorkspaceVariable>> {
        self.repository.get(id).await?;
        self.variables.list(id).await
    }
}

/// Variable keys must be non-empty and unique within a workspace
fn validate_variables(variables: &[VariableParams]) -> Result<()> {
    let mut keys = HashSet::with_capacity(variables.len());
    for variable in variables {
        if variable.key.trim().is_empty() {
            return Err(Error::InvalidParameter(
                "variable key must not be empty".to_string(),
            ));
        }
        if !keys.insert(variable.key.as_str()) {
            return Err(Error::InvalidParameter(format!(
                "duplicate variable key: {}",
                variable.key
            )));
        }
    }
    Ok(())
}

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..NAME_SUFFIX_LENGTH].to_string()
}
