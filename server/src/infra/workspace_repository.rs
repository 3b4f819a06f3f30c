//! Workspace repository for database operations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::domain::agent_config;
use crate::domain::workspace::{NewWorkspace, Workspace, WorkspaceState};
use crate::error::{Error, Result};
use crate::infra::sqlite::BEGIN_IMMEDIATE;
use crate::infra::store::WorkspaceStore;

const SELECT_WORKSPACE: &str = r#"
    SELECT id, name, user_id, project_id, cluster_agent_id, desired_state, actual_state,
           desired_state_updated_at, responded_to_agent_at, url, devfile, processed_devfile,
           workspaces_agent_config_version, force_include_all_resources, created_at, updated_at
    FROM workspaces
"#;

/// Database row for workspace
#[derive(Debug, FromRow)]
struct WorkspaceRow {
    id: i64,
    name: String,
    user_id: i64,
    project_id: i64,
    cluster_agent_id: i64,
    desired_state: String,
    actual_state: String,
    desired_state_updated_at: String,
    responded_to_agent_at: Option<String>,
    url: String,
    devfile: String,
    processed_devfile: String,
    workspaces_agent_config_version: i64,
    force_include_all_resources: bool,
    created_at: String,
    updated_at: String,
}

fn parse_state(field: &str, value: &str) -> Result<WorkspaceState> {
    WorkspaceState::from_str(value)
        .ok_or_else(|| Error::Internal(format!("Invalid {}: {}", field, value)))
}

fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", field, e)))?
        .with_timezone(&Utc))
}

impl TryFrom<WorkspaceRow> for Workspace {
    type Error = Error;

    fn try_from(row: WorkspaceRow) -> Result<Self> {
        let responded_to_agent_at = row
            .responded_to_agent_at
            .as_deref()
            .map(|value| parse_timestamp("responded_to_agent_at", value))
            .transpose()?;

        Ok(Workspace {
            id: row.id,
            name: row.name,
            user_id: row.user_id,
            project_id: row.project_id,
            cluster_agent_id: row.cluster_agent_id,
            desired_state: parse_state("desired_state", &row.desired_state)?,
            actual_state: parse_state("actual_state", &row.actual_state)?,
            desired_state_updated_at: parse_timestamp(
                "desired_state_updated_at",
                &row.desired_state_updated_at,
            )?,
            responded_to_agent_at,
            url: row.url,
            devfile: row.devfile,
            processed_devfile: row.processed_devfile,
            workspaces_agent_config_version: row.workspaces_agent_config_version,
            force_include_all_resources: row.force_include_all_resources,
            created_at: parse_timestamp("created_at", &row.created_at)?,
            updated_at: parse_timestamp("updated_at", &row.updated_at)?,
        })
    }
}

/// Optional filters for listing workspaces
#[derive(Debug, Clone, Default)]
pub struct WorkspaceFilter {
    pub user_id: Option<i64>,
    pub cluster_agent_id: Option<i64>,
}

/// Workspace repository for database operations
pub struct WorkspaceRepository {
    pool: SqlitePool,
}

impl WorkspaceRepository {
    /// Create a new repository with the given pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Start a write transaction holding the database write lock
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>> {
        Ok(self.pool.begin_with(BEGIN_IMMEDIATE).await?)
    }

    /// Count workspaces on an agent whose desired state is not `Terminated`,
    /// optionally restricted to one owner
    pub async fn count_non_terminated(
        conn: &mut SqliteConnection,
        cluster_agent_id: i64,
        user_id: Option<i64>,
    ) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM workspaces
            WHERE cluster_agent_id = ?
              AND (? IS NULL OR user_id = ?)
              AND desired_state != ?
            "#,
        )
        .bind(cluster_agent_id)
        .bind(user_id)
        .bind(user_id)
        .bind(WorkspaceState::Terminated.as_str())
        .fetch_one(conn)
        .await?;

        Ok(count)
    }

    /// Insert a workspace and return its id
    ///
    /// The stamped agent config version must lie within the history of the
    /// agent's config as stored on `conn`.
    pub async fn insert(conn: &mut SqliteConnection, workspace: &NewWorkspace) -> Result<i64> {
        let (versions_count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(v.version_index)
            FROM workspaces_agent_configs c
            JOIN workspaces_agent_config_versions v ON v.config_id = c.id
            WHERE c.cluster_agent_id = ?
            "#,
        )
        .bind(workspace.cluster_agent_id)
        .fetch_one(&mut *conn)
        .await?;
        agent_config::validate_version(workspace.workspaces_agent_config_version, versions_count)
            .map_err(Error::InvalidConfigVersion)?;

        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            INSERT INTO workspaces (
                name, user_id, project_id, cluster_agent_id, desired_state, actual_state,
                desired_state_updated_at, url, devfile, processed_devfile,
                workspaces_agent_config_version, force_include_all_resources, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
            "#,
        )
        .bind(&workspace.name)
        .bind(workspace.user_id)
        .bind(workspace.project_id)
        .bind(workspace.cluster_agent_id)
        .bind(workspace.desired_state.as_str())
        .bind(workspace.actual_state.as_str())
        .bind(&now)
        .bind(&workspace.url)
        .bind(&workspace.devfile)
        .bind(&workspace.processed_devfile)
        .bind(workspace.workspaces_agent_config_version)
        .bind(&now)
        .bind(&now)
        .execute(conn)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a workspace by ID
    pub async fn get(&self, id: i64) -> Result<Workspace> {
        let row: WorkspaceRow = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_WORKSPACE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::WorkspaceNotFound(id.to_string()))?;

        row.try_into()
    }

    /// Get a workspace by its unique name
    pub async fn get_by_name(&self, name: &str) -> Result<Option<Workspace>> {
        let row: Option<WorkspaceRow> =
            sqlx::query_as(&format!("{} WHERE name = ?", SELECT_WORKSPACE))
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Workspace::try_from).transpose()
    }

    /// List workspaces, newest first
    pub async fn list(&self, filter: &WorkspaceFilter) -> Result<Vec<Workspace>> {
        let rows: Vec<WorkspaceRow> = sqlx::query_as(&format!(
            r#"{}
            WHERE (? IS NULL OR user_id = ?)
              AND (? IS NULL OR cluster_agent_id = ?)
            ORDER BY id DESC
            "#,
            SELECT_WORKSPACE
        ))
        .bind(filter.user_id)
        .bind(filter.user_id)
        .bind(filter.cluster_agent_id)
        .bind(filter.cluster_agent_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Update the desired state, stamping `desired_state_updated_at`
    ///
    /// Rows whose desired state is already `Terminated` are left untouched;
    /// returns whether a row was updated.
    pub async fn update_desired_state(&self, id: i64, state: WorkspaceState) -> Result<bool> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET desired_state = ?, desired_state_updated_at = ?, updated_at = ?
            WHERE id = ? AND desired_state != ?
            "#,
        )
        .bind(state.as_str())
        .bind(&now)
        .bind(&now)
        .bind(id)
        .bind(WorkspaceState::Terminated.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Store the state the agent last observed
    pub async fn update_actual_state(&self, id: i64, state: WorkspaceState) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET actual_state = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(state.as_str())
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::WorkspaceNotFound(id.to_string()));
        }

        Ok(())
    }

    /// Record that the agent was sent this workspace
    pub async fn mark_responded(&self, id: i64, responded_at: DateTime<Utc>) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET responded_to_agent_at = ?, force_include_all_resources = 0, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(responded_at.to_rfc3339())
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::WorkspaceNotFound(id.to_string()));
        }

        Ok(())
    }
}

#[async_trait]
impl WorkspaceStore for WorkspaceRepository {
    async fn find_by_name(&self, name: &str) -> Result<Option<Workspace>> {
        self.get_by_name(name).await
    }
}
