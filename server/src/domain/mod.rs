//! Domain layer

pub mod agent_config;
pub mod quota;
pub mod variable;
pub mod workspace;
