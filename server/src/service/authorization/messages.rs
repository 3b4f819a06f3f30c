//! Results exchanged between authorization steps

use serde::{Deserialize, Serialize};

/// Outcome reported to the workspaces proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStatus {
    Authorized,
    InvalidHost,
    WorkspaceNotFound,
    NotAuthorized,
    PortNotFound,
}

impl AuthorizationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorizationStatus::Authorized => "AUTHORIZED",
            AuthorizationStatus::InvalidHost => "INVALID_HOST",
            AuthorizationStatus::WorkspaceNotFound => "WORKSPACE_NOT_FOUND",
            AuthorizationStatus::NotAuthorized => "NOT_AUTHORIZED",
            AuthorizationStatus::PortNotFound => "PORT_NOT_FOUND",
        }
    }
}

/// Expected reasons for denying access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationFailure {
    InvalidHost,
    WorkspaceNotFound,
    NotAuthorized,
    PortNotFound,
}

impl From<AuthorizationFailure> for AuthorizationStatus {
    fn from(failure: AuthorizationFailure) -> Self {
        match failure {
            AuthorizationFailure::InvalidHost => AuthorizationStatus::InvalidHost,
            AuthorizationFailure::WorkspaceNotFound => AuthorizationStatus::WorkspaceNotFound,
            AuthorizationFailure::NotAuthorized => AuthorizationStatus::NotAuthorized,
            AuthorizationFailure::PortNotFound => AuthorizationStatus::PortNotFound,
        }
    }
}

/// Error side of a step result
///
/// Only `WorkspaceAuthorizeUserAccessFailed` is an expected outcome. Anything
/// else reaching the orchestrator is treated as a fault.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    WorkspaceAuthorizeUserAccessFailed { status: AuthorizationFailure },

    /// The workspace store could not answer
    WorkspaceStoreFailed { details: String },

    /// A step ran before the step that provides `field`
    ContextIncomplete { field: &'static str },
}

impl Message {
    pub fn failed(status: AuthorizationFailure) -> Self {
        Message::WorkspaceAuthorizeUserAccessFailed { status }
    }
}
