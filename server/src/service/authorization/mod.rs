//! Workspace proxy authorization
//!
//! Decides whether a user may open a proxied connection to a workspace, given
//! only the requested host and the user id. The decision is made by three
//! steps run in order, each taking the context produced by the previous one:
//!
//! 1. `host_parser` extracts the port and the workspace name from the host,
//! 2. `workspace_finder` loads the workspace with that name,
//! 3. `authorizer` checks ownership and then the port.
//!
//! The first step that fails ends the run. Expected denials are reported as
//! a successful response carrying the denial status; anything else is an
//! internal error.

pub mod authorizer;
pub mod context;
pub mod host_parser;
pub mod messages;
pub mod workspace_finder;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::error::{Error, Result};
use crate::infra::store::WorkspaceStore;

use context::{AuthorizationContext, AuthorizationPayload};
use messages::Message;

/// Outer status of an authorization response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
}

/// Response consumed by the workspaces proxy
///
/// `status` is always `success`; the decision lives in `payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResponse {
    pub status: ResponseStatus,
    pub payload: AuthorizationPayload,
}

impl AuthorizationResponse {
    fn success(payload: AuthorizationPayload) -> Self {
        Self {
            status: ResponseStatus::Success,
            payload,
        }
    }
}

/// Stateless authorization service over a workspace store
pub struct AuthorizationService {
    store: Arc<dyn WorkspaceStore>,
}

impl AuthorizationService {
    pub fn new(store: Arc<dyn WorkspaceStore>) -> Self {
        Self { store }
    }

    /// Authorize `user_id` to connect to `workspace_host`
    pub async fn authorize(&self, workspace_host: &str, user_id: i64) -> Result<AuthorizationResponse> {
        let context = AuthorizationContext::new(workspace_host, user_id);

        let payload = match self.run(context).await {
            Ok(AuthorizationContext {
                response_payload: Some(payload),
                ..
            }) => payload,
            Ok(_) => {
                error!("Authorization finished without a response payload");
                return Err(Error::UnmatchedResult(
                    "pipeline finished without a response payload".to_string(),
                ));
            }
            Err(Message::WorkspaceAuthorizeUserAccessFailed { status }) => {
                AuthorizationPayload::denied(status)
            }
            Err(unmatched) => {
                error!("Unmatched authorization result: {:?}", unmatched);
                return Err(Error::UnmatchedResult(format!("{:?}", unmatched)));
            }
        };

        info!(
            workspace_host,
            user_id,
            status = payload.status.as_str(),
            "Workspace access authorization"
        );

        Ok(AuthorizationResponse::success(payload))
    }

    async fn run(&self, context: AuthorizationContext) -> std::result::Result<AuthorizationContext, Message> {
        let context = host_parser::parse(context)?;
        let context = workspace_finder::find(context, self.store.as_ref()).await?;
        authorizer::authorize(context)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;

    use crate::domain::workspace::{Workspace, WorkspaceState};

    pub fn workspace(id: i64, name: &str, user_id: i64) -> Workspace {
        let now = Utc::now();
        Workspace {
            id,
            name: name.to_string(),
            user_id,
            project_id: 1,
            cluster_agent_id: 1,
            desired_state: WorkspaceState::Running,
            actual_state: WorkspaceState::Running,
            desired_state_updated_at: now,
            responded_to_agent_at: Some(now),
            url: format!("https://60001-{}.example.com", name),
            devfile: String::new(),
            processed_devfile: String::new(),
            workspaces_agent_config_version: 0,
            force_include_all_resources: false,
            created_at: now,
            updated_at: now,
        }
    }
}
