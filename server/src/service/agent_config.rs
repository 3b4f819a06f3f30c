//! Agent config service

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::domain::agent_config::{AgentConfig, AgentConfigSettings};
use crate::error::{Error, Result};
use crate::infra::agent_config_repository::AgentConfigRepository;

/// Live config of an agent with the size of its history
#[derive(Debug, Clone, Serialize)]
pub struct AgentConfigView {
    #[serde(flatten)]
    pub config: AgentConfig,
    pub versions_count: i64,
}

/// Agent config service
pub struct AgentConfigService {
    repository: Arc<AgentConfigRepository>,
}

impl AgentConfigService {
    pub fn new(repository: Arc<AgentConfigRepository>) -> Self {
        Self { repository }
    }

    /// Create the config of an agent, or replace it while recording the
    /// outgoing settings as a new version
    pub async fn upsert(
        &self,
        cluster_agent_id: i64,
        settings: AgentConfigSettings,
    ) -> Result<AgentConfigView> {
        if settings.dns_zone.trim().is_empty() {
            return Err(Error::InvalidParameter("dns_zone must not be empty".to_string()));
        }

        let mut tx = self.repository.begin().await?;
        match AgentConfigRepository::find_by_agent_in(&mut tx, cluster_agent_id).await? {
            Some(current) => {
                AgentConfigRepository::update(&mut tx, &current, &settings).await?;
                info!("Updated agent config of agent {}", cluster_agent_id);
            }
            None => {
                AgentConfigRepository::create(&mut tx, cluster_agent_id, &settings).await?;
                info!("Created agent config of agent {}", cluster_agent_id);
            }
        }
        tx.commit().await?;

        self.get(cluster_agent_id).await
    }

    /// Get the live config of an agent
    pub async fn get(&self, cluster_agent_id: i64) -> Result<AgentConfigView> {
        let config = self.repository.get_by_agent(cluster_agent_id).await?;
        let versions_count = self.repository.history(config.id).await?.versions_count();

        Ok(AgentConfigView {
            config,
            versions_count,
        })
    }
}
