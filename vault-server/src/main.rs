//! # Vaultd
//!
//! HTTP surface over one or more vault pipelines: a per-vault indexer and
//! SSE change feed for directories of Markdown notes.
//!
//! ## Architecture
//!
//! The server is built on Axum and owns, per configured vault:
//! - a `vault-core::VaultSupervisor` running the watcher/workers/catalog/
//!   explorer/search/broadcaster/reconciler pipeline
//! - an embedded SQLite catalog and `tantivy` search index, both local to
//!   the vault's configured paths

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use vault_core::VaultSupervisor;
use vault_server::routes::create_app;
use vault_server::state::AppState;

/// Command line arguments for the vault pipeline server.
#[derive(Parser, Debug)]
#[command(name = "vaultd")]
#[command(about = "Per-vault Markdown indexing and serving pipeline")]
struct Args {
    /// Path to a config file (TOML or, with a `.json` extension, JSON).
    #[arg(long, env = "VAULTD_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Server port (overrides config).
    #[arg(short, long, env = "SERVER_PORT")]
    port: Option<u16>,

    /// Server host (overrides config).
    #[arg(long, env = "SERVER_HOST")]
    host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vault_server=info,vault_core=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (mut config, source) = match &args.config {
        Some(path) => (vault_config::load_from_file(path)?, vault_config::ConfigSource::File(path.clone())),
        None => vault_config::load_from_env()?,
    };
    info!("configuration loaded from {source}");

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    vault_config::validate(&config)?;

    let state = AppState::new();
    for vault_cfg in config.vaults.iter().filter(|v| v.enabled).cloned() {
        let vault_id = vault_cfg.id.clone();
        let supervisor = VaultSupervisor::new(vault_cfg).await?;
        if let Err(e) = supervisor.start().await {
            error!("vault {vault_id} failed to start: {e}");
            return Err(e.into());
        }
        info!("vault {vault_id} started");
        state.insert(supervisor);
    }

    if config.vaults.is_empty() {
        warn!("no vaults configured; the server will run with an empty route surface");
    }

    let app = create_app(state.clone());
    let addr = SocketAddr::from((
        config.server.host.parse::<std::net::IpAddr>().unwrap_or_else(|_| [127, 0, 0, 1].into()),
        config.server.port,
    ));

    info!("starting vaultd on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal(state.clone()))
        .await?;

    Ok(())
}

/// Waits for Ctrl+C (or SIGTERM on unix) and stops every vault supervisor
/// before the listener drops, so in-flight watcher/worker/broadcaster
/// tasks get a chance to observe cancellation.
async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, stopping vault supervisors");
    state.stop_all().await;
}
