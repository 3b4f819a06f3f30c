//! Read interface over persisted workspaces
//!
//! The authorization pipeline only depends on this trait, so it can be driven
//! by the SQLite repository in production and by mocks in tests.

use async_trait::async_trait;

use crate::domain::workspace::Workspace;
use crate::error::Result;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    /// Find the workspace with exactly this name
    async fn find_by_name(&self, name: &str) -> Result<Option<Workspace>>;
}
