//! Decides whether the requesting user may reach the requested port
//!
//! Ownership is checked before the port so that a user who does not own the
//! workspace learns nothing about its ports.

use crate::service::authorization::context::{AuthorizationContext, AuthorizationPayload};
use crate::service::authorization::messages::{AuthorizationFailure, Message};

pub fn authorize(mut context: AuthorizationContext) -> Result<AuthorizationContext, Message> {
    let workspace = context
        .workspace
        .as_ref()
        .ok_or(Message::ContextIncomplete { field: "workspace" })?;
    let port = context
        .port
        .as_deref()
        .ok_or(Message::ContextIncomplete { field: "port" })?;

    if workspace.user_id != context.user_id {
        return Err(Message::failed(AuthorizationFailure::NotAuthorized));
    }

    if !workspace.exposes_port(port) {
        return Err(Message::failed(AuthorizationFailure::PortNotFound));
    }

    let payload = AuthorizationPayload::authorized(port.to_string(), workspace.id);
    context.response_payload = Some(payload);
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::authorization::messages::AuthorizationStatus;
    use crate::service::authorization::test_support::workspace;

    fn context(user_id: i64, port: &str, owner: i64) -> AuthorizationContext {
        let mut context = AuthorizationContext::new("host", user_id);
        context.port = Some(port.to_string());
        context.workspace_name = Some("workspace-abc123".to_string());
        context.workspace = Some(workspace(9, "workspace-abc123", owner));
        context
    }

    #[test]
    fn test_owner_on_exposed_ports() {
        for port in ["60001", "60022"] {
            let context = authorize(context(123, port, 123)).unwrap();
            let payload = context.response_payload.unwrap();
            assert_eq!(payload.status, AuthorizationStatus::Authorized);
            assert_eq!(payload.info.port.as_deref(), Some(port));
            assert_eq!(payload.info.workspace_id, Some(9));
        }
    }

    #[test]
    fn test_owner_on_unexposed_port() {
        assert_eq!(
            authorize(context(123, "10", 123)),
            Err(Message::failed(AuthorizationFailure::PortNotFound))
        );
    }

    #[test]
    fn test_ownership_checked_before_port() {
        for port in ["60001", "10", "not-a-port"] {
            assert_eq!(
                authorize(context(789, port, 123)),
                Err(Message::failed(AuthorizationFailure::NotAuthorized))
            );
        }
    }

    #[test]
    fn test_requires_resolved_workspace() {
        let mut incomplete = context(123, "60001", 123);
        incomplete.workspace = None;
        assert_eq!(
            authorize(incomplete),
            Err(Message::ContextIncomplete { field: "workspace" })
        );
    }
}
