//! Remote Development Server
//!
//! This server manages remote development workspaces: it authorizes proxied
//! connections to them, enforces the per-agent quotas on their creation and
//! reconciles their state with the cluster agents hosting them.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod domain;
mod error;
mod infra;
mod service;

pub use config::Config;
pub use error::{Error, Result};

use infra::agent_config_repository::AgentConfigRepository;
use infra::crypto::VariableCipher;
use infra::variable_repository::VariableRepository;
use infra::workspace_repository::WorkspaceRepository;
use service::agent_config::AgentConfigService;
use service::authorization::AuthorizationService;
use service::reconciliation::ReconciliationService;
use service::workspace::WorkspaceService;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub workspace_service: Arc<WorkspaceService>,
    pub agent_config_service: Arc<AgentConfigService>,
    pub reconciliation_service: Arc<ReconciliationService>,
    pub authorization_service: Arc<AuthorizationService>,
}

impl AppState {
    /// Wire repositories and services on top of a migrated pool
    pub fn build(config: Arc<Config>, pool: SqlitePool) -> Result<Self> {
        let workspace_repository = Arc::new(WorkspaceRepository::new(pool.clone()));
        let agent_config_repository = Arc::new(AgentConfigRepository::new(pool.clone()));
        let cipher = VariableCipher::from_secret(&config.variable_encryption_key)?;
        let variable_repository = Arc::new(VariableRepository::new(pool, cipher));

        Ok(Self {
            workspace_service: Arc::new(WorkspaceService::new(
                workspace_repository.clone(),
                agent_config_repository.clone(),
                variable_repository,
            )),
            agent_config_service: Arc::new(AgentConfigService::new(
                agent_config_repository.clone(),
            )),
            reconciliation_service: Arc::new(ReconciliationService::new(
                workspace_repository.clone(),
                agent_config_repository,
            )),
            authorization_service: Arc::new(AuthorizationService::new(workspace_repository)),
            config,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(Config::load()?);

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    if config.uses_default_encryption_key() {
        warn!("REMOTE_DEV_VARIABLE_ENCRYPTION_KEY is not set, using the development key");
    }

    let http_addr: SocketAddr = format!("{}:{}", config.http_host, config.http_port).parse()?;

    info!("Starting Remote Development Server");
    info!("HTTP listening on {}", http_addr);

    let pool = infra::sqlite::init(&config.database_url).await?;
    let state = AppState::build(config.clone(), pool)?;

    let app = api::http::create_router(state);

    axum::serve(
        tokio::net::TcpListener::bind(http_addr).await?,
        app.into_make_service(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
