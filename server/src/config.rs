//! Server configuration

use serde::Deserialize;

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// HTTP server host
    #[serde(default = "default_http_host")]
    pub http_host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Database URL (SQLite)
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Secret the workspace variable encryption key is derived from
    #[serde(default = "default_variable_encryption_key")]
    pub variable_encryption_key: String,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "sqlite:data/remote_dev.db?mode=rwc".to_string()
}

fn default_variable_encryption_key() -> String {
    "remote-dev-development-key".to_string()
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Config::default();

        if let Ok(val) = std::env::var("REMOTE_DEV_HTTP_HOST") {
            config.http_host = val;
        }
        if let Ok(val) = std::env::var("REMOTE_DEV_HTTP_PORT") {
            config.http_port = val
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid REMOTE_DEV_HTTP_PORT {}: {}", val, e))?;
        }
        if let Ok(val) = std::env::var("REMOTE_DEV_DATABASE_URL") {
            config.database_url = val;
        }
        if let Ok(val) = std::env::var("REMOTE_DEV_VARIABLE_ENCRYPTION_KEY") {
            config.variable_encryption_key = val;
        }

        Ok(config)
    }

    /// Whether the variable encryption key was left at its development default
    pub fn uses_default_encryption_key(&self) -> bool {
        self.variable_encryption_key == default_variable_encryption_key()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_host: default_http_host(),
            http_port: default_http_port(),
            database_url: default_database_url(),
            variable_encryption_key: default_variable_encryption_key(),
        }
    }
}
