//! Values threaded through the authorization steps

use serde::{Deserialize, Serialize};

use crate::domain::workspace::Workspace;
use crate::service::authorization::messages::{AuthorizationFailure, AuthorizationStatus};

/// Details of a granted connection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<i64>,
}

/// Decision for one proxy connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationPayload {
    pub status: AuthorizationStatus,

    /// Empty unless `status` is `AUTHORIZED`
    pub info: AuthorizationInfo,
}

impl AuthorizationPayload {
    pub fn authorized(port: String, workspace_id: i64) -> Self {
        Self {
            status: AuthorizationStatus::Authorized,
            info: AuthorizationInfo {
                port: Some(port),
                workspace_id: Some(workspace_id),
            },
        }
    }

    pub fn denied(failure: AuthorizationFailure) -> Self {
        Self {
            status: failure.into(),
            info: AuthorizationInfo::default(),
        }
    }
}

/// Accumulating record of one authorization call
///
/// Starts with the request fields; each step fills in what it resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthorizationContext {
    pub workspace_host: String,
    pub user_id: i64,
    pub port: Option<String>,
    pub workspace_name: Option<String>,
    pub workspace: Option<Workspace>,
    pub response_payload: Option<AuthorizationPayload>,
}

impl AuthorizationContext {
    pub fn new(workspace_host: impl Into<String>, user_id: i64) -> Self {
        Self {
            workspace_host: workspace_host.into(),
            user_id,
            port: None,
            workspace_name: None,
            workspace: None,
            response_payload: None,
        }
    }
}
