//! Infrastructure layer

pub mod agent_config_repository;
pub mod crypto;
pub mod sqlite;
pub mod store;
pub mod variable_repository;
pub mod workspace_repository;
