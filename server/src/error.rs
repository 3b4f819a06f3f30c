//! Error types for the remote development server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the remote development server
#[derive(Debug, Error)]
pub enum Error {
    // Workspace errors (2000-2999)
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("Workspace quota of the agent reached")]
    WorkspaceQuotaExceeded,

    #[error("Workspace quota per user of the agent reached")]
    WorkspacePerUserQuotaExceeded,

    #[error("Invalid desired state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Invalid agent config version: {0}")]
    InvalidConfigVersion(String),

    // Agent config errors (3000-3999)
    #[error("Workspaces agent config not found for agent: {0}")]
    AgentConfigNotFound(String),

    #[error("Workspaces agent config is disabled for agent: {0}")]
    AgentConfigDisabled(String),

    // Authorization errors (4000-4999)
    #[error("Unmatched authorization result: {0}")]
    UnmatchedResult(String),

    // Infrastructure errors (6000-6999)
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Encryption error: {0}")]
    EncryptionError(String),

    // General errors (1000-1999)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the error code
    pub fn code(&self) -> u32 {
        match self {
            // Workspace errors (2000-2999)
            Error::WorkspaceNotFound(_) => 2001,
            Error::WorkspaceQuotaExceeded => 2002,
            Error::WorkspacePerUserQuotaExceeded => 2003,
            Error::InvalidStateTransition(_) => 2004,
            Error::InvalidConfigVersion(_) => 2005,

            // Agent config errors (3000-3999)
            Error::AgentConfigNotFound(_) => 3001,
            Error::AgentConfigDisabled(_) => 3002,

            // Authorization errors (4000-4999)
            Error::UnmatchedResult(_) => 4001,

            // Infrastructure errors (6000-6999)
            Error::DatabaseError(_) => 6001,
            Error::EncryptionError(_) => 6002,

            // General errors (1000-1999)
            Error::InvalidParameter(_) => 1002,
            Error::Internal(_) => 1003,
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::WorkspaceNotFound(_) | Error::AgentConfigNotFound(_) => StatusCode::NOT_FOUND,

            Error::InvalidStateTransition(_) => StatusCode::CONFLICT,

            Error::InvalidParameter(_)
            | Error::InvalidConfigVersion(_)
            | Error::AgentConfigDisabled(_) => StatusCode::BAD_REQUEST,

            Error::WorkspaceQuotaExceeded | Error::WorkspacePerUserQuotaExceeded => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        let body = ErrorResponse {
            code: self.code(),
            message: self.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_errors_are_client_errors() {
        assert_eq!(
            Error::WorkspaceQuotaExceeded.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(Error::WorkspacePerUserQuotaExceeded.code(), 2003);
    }

    #[test]
    fn test_unmatched_result_is_internal() {
        let err = Error::UnmatchedResult("WorkspaceCreateFailed".to_string());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), 4001);
    }
}
