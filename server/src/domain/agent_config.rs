//! Workspaces agent config domain model
//!
//! Every cluster agent hosting workspaces owns one config. Updates keep an
//! append-only history so that a workspace can keep using the config that was
//! live when it was created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::quota::Quota;

/// The versioned part of an agent config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfigSettings {
    pub enabled: bool,

    /// DNS zone workspaces are served under
    pub dns_zone: String,

    /// Limit on non-terminated workspaces across all users of the agent
    #[serde(default)]
    pub workspaces_quota: Quota,

    /// Limit on non-terminated workspaces of a single user on the agent
    #[serde(default)]
    pub workspaces_per_user_quota: Quota,

    #[serde(default = "default_network_policy_enabled")]
    pub network_policy_enabled: bool,

    #[serde(default = "default_network_policy_egress")]
    pub network_policy_egress: serde_json::Value,

    #[serde(default = "empty_object")]
    pub default_resources_per_workspace_container: serde_json::Value,

    #[serde(default = "empty_object")]
    pub max_resources_per_workspace: serde_json::Value,

    #[serde(default = "default_proxy_namespace")]
    pub gitlab_workspaces_proxy_namespace: String,
}

fn default_network_policy_enabled() -> bool {
    true
}

fn default_network_policy_egress() -> serde_json::Value {
    serde_json::json!([{
        "allow": "0.0.0.0/0",
        "except": ["10.0.0.0/8", "172.16.0.0/12", "192.168.0.0/16"]
    }])
}

fn empty_object() -> serde_json::Value {
    serde_json::json!({})
}

fn default_proxy_namespace() -> String {
    "gitlab-workspaces".to_string()
}

/// Live agent config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: i64,

    pub cluster_agent_id: i64,

    #[serde(flatten)]
    pub settings: AgentConfigSettings,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Append-only list of prior settings of one agent config
///
/// Entry `i` holds the settings that were live while the history had length
/// `i`, because each update pushes the outgoing settings before replacing them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentConfigHistory {
    snapshots: Vec<AgentConfigSettings>,
}

impl AgentConfigHistory {
    pub fn new(snapshots: Vec<AgentConfigSettings>) -> Self {
        Self { snapshots }
    }

    /// Number of recorded versions; new workspaces are stamped with it
    pub fn versions_count(&self) -> i64 {
        self.snapshots.len() as i64
    }

    /// Settings a workspace stamped with `version` runs with
    ///
    /// Versions outside the recorded history resolve to the live settings.
    pub fn resolve<'a>(&'a self, version: i64, live: &'a AgentConfigSettings) -> &'a AgentConfigSettings {
        usize::try_from(version)
            .ok()
            .and_then(|index| self.snapshots.get(index))
            .unwrap_or(live)
    }
}

/// Check that `version` lies within `[0, versions_count]`
pub fn validate_version(version: i64, versions_count: i64) -> std::result::Result<(), String> {
    if version < 0 || version > versions_count {
        return Err(format!(
            "workspaces_agent_config_version must be between 0 and {}, got {}",
            versions_count, version
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(dns_zone: &str) -> AgentConfigSettings {
        serde_json::from_value(serde_json::json!({
            "enabled": true,
            "dns_zone": dns_zone,
        }))
        .unwrap()
    }

    #[test]
    fn test_settings_defaults() {
        let s = settings("ws.example.com");
        assert_eq!(s.workspaces_quota, Quota::Unlimited);
        assert_eq!(s.workspaces_per_user_quota, Quota::Unlimited);
        assert!(s.network_policy_enabled);
        assert_eq!(s.gitlab_workspaces_proxy_namespace, "gitlab-workspaces");
    }

    #[test]
    fn test_resolve_in_range_returns_snapshot() {
        let history = AgentConfigHistory::new(vec![settings("v0.example.com"), settings("v1.example.com")]);
        let live = settings("live.example.com");

        assert_eq!(history.resolve(0, &live).dns_zone, "v0.example.com");
        assert_eq!(history.resolve(1, &live).dns_zone, "v1.example.com");
    }

    #[test]
    fn test_resolve_out_of_range_falls_back_to_live() {
        let history = AgentConfigHistory::new(vec![settings("v0.example.com")]);
        let live = settings("live.example.com");

        assert_eq!(history.resolve(1, &live).dns_zone, "live.example.com");
        assert_eq!(history.resolve(99, &live).dns_zone, "live.example.com");
        assert_eq!(history.resolve(-1, &live).dns_zone, "live.example.com");
        assert_eq!(
            AgentConfigHistory::default().resolve(0, &live).dns_zone,
            "live.example.com"
        );
    }

    #[test]
    fn test_validate_version_bounds() {
        assert!(validate_version(0, 2).is_ok());
        assert!(validate_version(2, 2).is_ok());
        assert!(validate_version(3, 2).is_err());
        assert!(validate_version(-1, 2).is_err());
        assert!(validate_version(0, 0).is_ok());
    }
}
