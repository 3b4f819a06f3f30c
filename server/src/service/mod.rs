//! Business logic services

pub mod agent_config;
pub mod authorization;
pub mod reconciliation;
pub mod workspace;
