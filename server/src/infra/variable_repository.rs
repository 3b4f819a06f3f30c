//! Workspace variable repository
//!
//! Values are encrypted before they reach the database and decrypted on read.
//! Variables are never updated.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};

use crate::domain::variable::{VariableParams, VariableType, WorkspaceVariable};
use crate::error::{Error, Result};
use crate::infra::crypto::VariableCipher;

#[derive(Debug, FromRow)]
struct VariableRow {
    id: i64,
    workspace_id: i64,
    key: String,
    encrypted_value: String,
    variable_type: String,
    created_at: String,
}

/// Workspace variable repository for database operations
pub struct VariableRepository {
    pool: SqlitePool,
    cipher: VariableCipher,
}

impl VariableRepository {
    pub fn new(pool: SqlitePool, cipher: VariableCipher) -> Self {
        Self { pool, cipher }
    }

    /// Insert the variables of a freshly created workspace
    pub async fn insert_all(
        &self,
        conn: &mut SqliteConnection,
        workspace_id: i64,
        variables: &[VariableParams],
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();

        for variable in variables {
            let encrypted_value = self.cipher.encrypt(&variable.value)?;

            sqlx::query(
                r#"
                INSERT INTO workspace_variables (workspace_id, key, encrypted_value, variable_type, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(workspace_id)
            .bind(&variable.key)
            .bind(&encrypted_value)
            .bind(variable.variable_type.as_str())
            .bind(&now)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// List the decrypted variables of a workspace
    pub async fn list(&self, workspace_id: i64) -> Result<Vec<WorkspaceVariable>> {
        let rows: Vec<VariableRow> = sqlx::query_as(
            r#"
            SELECT id, workspace_id, key, encrypted_value, variable_type, created_at
            FROM workspace_variables
            WHERE workspace_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|row| self.decrypt_row(row)).collect()
    }

    fn decrypt_row(&self, row: VariableRow) -> Result<WorkspaceVariable> {
        let variable_type = VariableType::from_str(&row.variable_type).ok_or_else(|| {
            Error::Internal(format!("Invalid variable_type: {}", row.variable_type))
        })?;

        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| Error::Internal(format!("Failed to parse created_at: {}", e)))?
            .with_timezone(&Utc);

        Ok(WorkspaceVariable {
            id: row.id,
            workspace_id: row.workspace_id,
            key: row.key,
            value: self.cipher.decrypt(&row.encrypted_value)?,
            variable_type,
            created_at,
        })
    }
}
