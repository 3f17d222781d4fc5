//! camlink-relay binary entry point.
//!
//! Usage:
//! ```bash
//! camlink-relay --config relay.toml
//! camlink-relay --bind 0.0.0.0:8080
//! ```

use anyhow::{Context, Result};
use camlink_relay::cleanup::spawn_cleanup_task;
use camlink_relay::config::Config;
use camlink_relay::http::{build_router, health};
use camlink_relay::server::CameraRelay;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_CONFIG: &str = "relay.toml";

/// Camera relay server for camlink.
#[derive(Parser, Debug)]
#[command(name = "camlink-relay")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Override the bind address from the configuration
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "camlink_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config)?;
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    tracing::info!("Starting camlink-relay v{}", env!("CARGO_PKG_VERSION"));
    health::init_start_time();

    let bind_address = config.server.bind_address.clone();
    let cleanup = config.cleanup.clone();
    let relay = Arc::new(CameraRelay::new(config));
    let cleanup_handle = spawn_cleanup_task(relay.clone(), cleanup);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!("Listening on {}", bind_address);

    axum::serve(listener, build_router(relay))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    cleanup_handle.abort();
    tracing::info!("camlink-relay stopped");
    Ok(())
}

/// Load the config file, falling back to defaults when the default file is absent.
fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG);
            if path.exists() {
                Config::from_file(&path).context("Failed to load relay.toml")
            } else {
                tracing::info!("No {} found, using defaults", DEFAULT_CONFIG);
                Ok(Config::default())
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
