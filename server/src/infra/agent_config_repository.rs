//! Workspaces agent config repository for database operations

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::domain::agent_config::{AgentConfig, AgentConfigHistory, AgentConfigSettings};
use crate::domain::quota::Quota;
use crate::error::{Error, Result};
use crate::infra::sqlite::BEGIN_IMMEDIATE;

const SELECT_CONFIG: &str = r#"
    SELECT id, cluster_agent_id, enabled, dns_zone, workspaces_quota, workspaces_per_user_quota,
           network_policy_enabled, network_policy_egress, default_resources_per_workspace_container,
           max_resources_per_workspace, gitlab_workspaces_proxy_namespace, created_at, updated_at
    FROM workspaces_agent_configs
"#;

/// Database row for an agent config
#[derive(Debug, FromRow)]
struct AgentConfigRow {
    id: i64,
    cluster_agent_id: i64,
    enabled: bool,
    dns_zone: String,
    workspaces_quota: i64,
    workspaces_per_user_quota: i64,
    network_policy_enabled: bool,
    network_policy_egress: String,
    default_resources_per_workspace_container: String,
    max_resources_per_workspace: String,
    gitlab_workspaces_proxy_namespace: String,
    created_at: String,
    updated_at: String,
}

fn parse_quota(field: &str, value: i64) -> Result<Quota> {
    Quota::from_i64(value).ok_or_else(|| Error::Internal(format!("Invalid {}: {}", field, value)))
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))?
        .with_timezone(&Utc))
}

impl TryFrom<AgentConfigRow> for AgentConfig {
    type Error = Error;

    fn try_from(row: AgentConfigRow) -> Result<Self> {
        Ok(AgentConfig {
            id: row.id,
            cluster_agent_id: row.cluster_agent_id,
            settings: AgentConfigSettings {
                enabled: row.enabled,
                dns_zone: row.dns_zone,
                workspaces_quota: parse_quota("workspaces_quota", row.workspaces_quota)?,
                workspaces_per_user_quota: parse_quota(
                    "workspaces_per_user_quota",
                    row.workspaces_per_user_quota,
                )?,
                network_policy_enabled: row.network_policy_enabled,
                network_policy_egress: serde_json::from_str(&row.network_policy_egress)?,
                default_resources_per_workspace_container: serde_json::from_str(
                    &row.default_resources_per_workspace_container,
                )?,
                max_resources_per_workspace: serde_json::from_str(
                    &row.max_resources_per_workspace,
                )?,
                gitlab_workspaces_proxy_namespace: row.gitlab_workspaces_proxy_namespace,
            },
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
        })
    }
}

/// Agent config repository for database operations
pub struct AgentConfigRepository {
    pool: SqlitePool,
}

impl AgentConfigRepository {
    /// Create a new repository with the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Start a write transaction holding the database write lock
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>> {
        Ok(self.pool.begin_with(BEGIN_IMMEDIATE).await?)
    }

    /// Insert the config of an agent
    pub async fn create(
        conn: &mut SqliteConnection,
        cluster_agent_id: i64,
        settings: &AgentConfigSettings,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO workspaces_agent_configs (
                cluster_agent_id, enabled, dns_zone, workspaces_quota, workspaces_per_user_quota,
                network_policy_enabled, network_policy_egress, default_resources_per_workspace_container,
                max_resources_per_workspace, gitlab_workspaces_proxy_namespace, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(cluster_agent_id)
        .bind(settings.enabled)
        .bind(&settings.dns_zone)
        .bind(settings.workspaces_quota.as_i64())
        .bind(settings.workspaces_per_user_quota.as_i64())
        .bind(settings.network_policy_enabled)
        .bind(settings.network_policy_egress.to_string())
        .bind(settings.default_resources_per_workspace_container.to_string())
        .bind(settings.max_resources_per_workspace.to_string())
        .bind(&settings.gitlab_workspaces_proxy_namespace)
        .bind(&now)
        .bind(&now)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Replace the settings of a config, recording the outgoing ones in its history
    pub async fn update(
        conn: &mut SqliteConnection,
        current: &AgentConfig,
        settings: &AgentConfigSettings,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        let version_index = Self::history_len(&mut *conn, current.id).await?;

        sqlx::query(
            r#"
            INSERT INTO workspaces_agent_config_versions (config_id, version_index, snapshot, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(current.id)
        .bind(version_index)
        .bind(serde_json::to_string(&current.settings)?)
        .bind(&now)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            UPDATE workspaces_agent_configs
            SET enabled = ?, dns_zone = ?, workspaces_quota = ?, workspaces_per_user_quota = ?,
                network_policy_enabled = ?, network_policy_egress = ?,
                default_resources_per_workspace_container = ?, max_resources_per_workspace = ?,
                gitlab_workspaces_proxy_namespace = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(settings.enabled)
        .bind(&settings.dns_zone)
        .bind(settings.workspaces_quota.as_i64())
        .bind(settings.workspaces_per_user_quota.as_i64())
        .bind(settings.network_policy_enabled)
        .bind(settings.network_policy_egress.to_string())
        .bind(settings.default_resources_per_workspace_container.to_string())
        .bind(settings.max_resources_per_workspace.to_string())
        .bind(&settings.gitlab_workspaces_proxy_namespace)
        .bind(&now)
        .bind(current.id)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Find the config of an agent on the given connection
    pub async fn find_by_agent_in(
        conn: &mut SqliteConnection,
        cluster_agent_id: i64,
    ) -> Result<Option<AgentConfig>> {
        let row: Option<AgentConfigRow> =
            sqlx::query_as(&format!("{} WHERE cluster_agent_id = ?", SELECT_CONFIG))
                .bind(cluster_agent_id)
                .fetch_optional(conn)
                .await?;

        row.map(AgentConfig::try_from).transpose()
    }

    /// Find the config of an agent
    pub async fn find_by_agent(&self, cluster_agent_id: i64) -> Result<Option<AgentConfig>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_agent_in(&mut conn, cluster_agent_id).await
    }

    /// Get the config of an agent
    pub async fn get_by_agent(&self, cluster_agent_id: i64) -> Result<AgentConfig> {
        self.find_by_agent(cluster_agent_id)
            .await?
            .ok_or_else(|| Error::AgentConfigNotFound(cluster_agent_id.to_string()))
    }

    /// Number of recorded versions of a config
    pub async fn history_len(conn: &mut SqliteConnection, config_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM workspaces_agent_config_versions WHERE config_id = ?
            "#,
        )
        .bind(config_id)
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Load the full history of a config, oldest first
    pub async fn history(&self, config_id: i64) -> Result<AgentConfigHistory> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT snapshot FROM workspaces_agent_config_versions
            WHERE config_id = ?
            ORDER BY version_index ASC
            "#,
        )
        .bind(config_id)
        .fetch_all(&self.pool)
        .await?;

        let snapshots = rows
            .into_iter()
            .map(|(snapshot,)| serde_json::from_str(&snapshot).map_err(Error::from))
            .collect::<Result<Vec<AgentConfigSettings>>>()?;

        Ok(AgentConfigHistory::new(snapshots))
    }
}
