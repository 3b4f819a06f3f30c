//! Workspace variable domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a variable is injected into the workspace
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableType {
    #[default]
    Environment,
    File,
}

impl VariableType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VariableType::Environment => "environment",
            VariableType::File => "file",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "environment" => Some(VariableType::Environment),
            "file" => Some(VariableType::File),
            _ => None,
        }
    }
}

/// Decrypted workspace variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceVariable {
    pub id: i64,
    pub workspace_id: i64,
    pub key: String,
    pub value: String,
    pub variable_type: VariableType,
    pub created_at: DateTime<Utc>,
}

/// Variable supplied at workspace creation
#[derive(Debug, Clone, Deserialize)]
pub struct VariableParams {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub variable_type: VariableType,
}
