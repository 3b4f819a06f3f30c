//! Workspace domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::variable::VariableParams;

/// Port the workspace editor listens on
pub const WORKSPACE_EDITOR_PORT: u16 = 60001;

/// Port the workspace SSH server listens on
pub const WORKSPACE_SSH_PORT: u16 = 60022;

/// Ports reachable through the workspaces proxy
pub const EXPOSED_PORTS: [u16; 2] = [WORKSPACE_EDITOR_PORT, WORKSPACE_SSH_PORT];

/// Workspace lifecycle state
///
/// Used for both the desired state (what the owner asked for) and the actual
/// state (what the agent last reported).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkspaceState {
    CreationRequested,
    Starting,
    Running,
    Stopping,
    Stopped,
    Terminating,
    Terminated,
    RestartRequested,
    Failed,
    Error,
    #[default]
    Unknown,
}

impl WorkspaceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkspaceState::CreationRequested => "CreationRequested",
            WorkspaceState::Starting => "Starting",
            WorkspaceState::Running => "Running",
            WorkspaceState::Stopping => "Stopping",
            WorkspaceState::Stopped => "Stopped",
            WorkspaceState::Terminating => "Terminating",
            WorkspaceState::Terminated => "Terminated",
            WorkspaceState::RestartRequested => "RestartRequested",
            WorkspaceState::Failed => "Failed",
            WorkspaceState::Error => "Error",
            WorkspaceState::Unknown => "Unknown",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CreationRequested" => Some(WorkspaceState::CreationRequested),
            "Starting" => Some(WorkspaceState::Starting),
            "Running" => Some(WorkspaceState::Running),
            "Stopping" => Some(WorkspaceState::Stopping),
            "Stopped" => Some(WorkspaceState::Stopped),
            "Terminating" => Some(WorkspaceState::Terminating),
            "Terminated" => Some(WorkspaceState::Terminated),
            "RestartRequested" => Some(WorkspaceState::RestartRequested),
            "Failed" => Some(WorkspaceState::Failed),
            "Error" => Some(WorkspaceState::Error),
            "Unknown" => Some(WorkspaceState::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorkspaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workspace entity
///
/// A user-owned remote development environment hosted by one cluster agent
/// and bound to one project. Workspaces are never deleted; `Terminated` is
/// their final state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    /// Surrogate identifier
    pub id: i64,

    /// Unique name, also the host label the proxy routes on
    pub name: String,

    /// Owner
    pub user_id: i64,

    pub project_id: i64,

    pub cluster_agent_id: i64,

    pub desired_state: WorkspaceState,

    pub actual_state: WorkspaceState,

    pub desired_state_updated_at: DateTime<Utc>,

    /// Last time the agent was sent this workspace's desired state
    pub responded_to_agent_at: Option<DateTime<Utc>>,

    pub url: String,

    /// Raw devfile as submitted
    pub devfile: String,

    /// Devfile sent to the agent
    pub processed_devfile: String,

    /// Index into the agent config history, see `AgentConfigHistory::resolve`
    pub workspaces_agent_config_version: i64,

    /// Next full reconciliation must send every resource of this workspace
    pub force_include_all_resources: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    /// Check if the agent reported the workspace as terminated
    pub fn is_terminated(&self) -> bool {
        self.actual_state == WorkspaceState::Terminated
    }

    /// Check whether the given port is exposed by this workspace
    pub fn exposes_port(&self, port: &str) -> bool {
        EXPOSED_PORTS.iter().any(|p| p.to_string() == port)
    }

    /// Check if the agent still has to act on the latest desired state
    pub fn desired_state_pending(&self) -> bool {
        match self.responded_to_agent_at {
            Some(responded) => self.desired_state_updated_at >= responded,
            None => true,
        }
    }
}

/// Reject a desired state change once the workspace was asked to terminate
pub fn validate_desired_state_transition(
    previous: WorkspaceState,
    next: WorkspaceState,
) -> std::result::Result<(), String> {
    if previous == WorkspaceState::Terminated {
        return Err(format!(
            "desired_state is Terminated and cannot be changed to {}",
            next
        ));
    }
    Ok(())
}

/// Build the unique workspace name
pub fn generate_name(cluster_agent_id: i64, user_id: i64, random_suffix: &str) -> String {
    format!("workspace-{}-{}-{}", cluster_agent_id, user_id, random_suffix)
}

/// Build the editor URL for a workspace served under `dns_zone`
pub fn editor_url(name: &str, dns_zone: &str) -> String {
    format!("https://{}-{}.{}", WORKSPACE_EDITOR_PORT, name, dns_zone)
}

/// Parameters for creating a workspace
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWorkspaceParams {
    pub user_id: i64,

    pub project_id: i64,

    pub cluster_agent_id: i64,

    pub devfile: String,

    /// Variables injected into the workspace runtime
    #[serde(default)]
    pub variables: Vec<VariableParams>,
}

/// Values written when a workspace row is inserted
#[derive(Debug, Clone)]
pub struct NewWorkspace {
    pub name: String,
    pub user_id: i64,
    pub project_id: i64,
    pub cluster_agent_id: i64,
    pub desired_state: WorkspaceState,
    pub actual_state: WorkspaceState,
    pub url: String,
    pub devfile: String,
    pub processed_devfile: String,
    pub workspaces_agent_config_version: i64,
}
