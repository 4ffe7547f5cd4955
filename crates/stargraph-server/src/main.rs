//! Main entry point for the stargraph server.

use anyhow::Result;
use clap::Parser;
use stargraph_common::{init_logging, GitHubClient};
use stargraph_config::ConfigLoader;
use stargraph_server::{create_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Serve GitHub stargazer history charts as SVG
#[derive(Debug, Parser)]
#[command(name = "stargraph", version, about)]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level filter, overriding the configured one
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_logging(config.logging.logging_config())
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting stargraph {}", env!("CARGO_PKG_VERSION"));
    if config.github.token.is_none() {
        warn!("No GitHub token configured, using anonymous access");
    }

    let client = GitHubClient::new(config.github.client_config())?;
    let state = AppState::from_config(&config, Arc::new(client))?;
    let app = create_router(state);

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
