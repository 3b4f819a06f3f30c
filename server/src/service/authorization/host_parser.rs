//! Extracts the port and workspace name from the proxied host
//!
//! Workspaces are served at `<port>-<workspace name>.<dns zone>`; the host may
//! arrive bare or as a full URL.

use url::Url;

use crate::service::authorization::context::AuthorizationContext;
use crate::service::authorization::messages::{AuthorizationFailure, Message};

pub fn parse(mut context: AuthorizationContext) -> Result<AuthorizationContext, Message> {
    let (port, workspace_name) = split_host(&context.workspace_host)
        .ok_or_else(|| Message::failed(AuthorizationFailure::InvalidHost))?;

    context.port = Some(port);
    context.workspace_name = Some(workspace_name);
    Ok(context)
}

fn split_host(workspace_host: &str) -> Option<(String, String)> {
    if workspace_host.is_empty() || workspace_host.chars().any(char::is_whitespace) {
        return None;
    }

    let uri = if workspace_host.contains("://") {
        Url::parse(workspace_host)
    } else {
        Url::parse(&format!("https://{}", workspace_host))
    }
    .ok()?;

    let hostname = uri.host_str()?;
    let first_label = hostname.split('.').next()?;
    let (port, workspace_name) = first_label.split_once('-')?;

    if port.is_empty() || workspace_name.is_empty() {
        return None;
    }

    Some((port.to_string(), workspace_name.to_string()))
}
