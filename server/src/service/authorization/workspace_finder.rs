//! Resolves the parsed workspace name to a stored workspace

use crate::infra::store::WorkspaceStore;
use crate::service::authorization::context::AuthorizationContext;
use crate::service::authorization::messages::{AuthorizationFailure, Message};

pub async fn find(
    mut context: AuthorizationContext,
    store: &dyn WorkspaceStore,
) -> Result<AuthorizationContext, Message> {
    let workspace_name = context
        .workspace_name
        .as_deref()
        .ok_or(Message::ContextIncomplete {
            field: "workspace_name",
        })?;

    let found = store
        .find_by_name(workspace_name)
        .await
        .map_err(|e| Message::WorkspaceStoreFailed {
            details: e.to_string(),
        })?;

    let workspace = found.ok_or_else(|| Message::failed(AuthorizationFailure::WorkspaceNotFound))?;

    context.workspace = Some(workspace);
    Ok(context)
}
