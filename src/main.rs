mod config;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use config::{CliConfig, Config};
use graph_engine::GraphDatabase;
use server::AppState;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = CliConfig::parse();

    run(&config).await?;

    info!("Server stopped");

    Ok(())
}

async fn run<C: Config>(config: &C) -> Result<()> {
    info!("Loading graph from {}", config.graph_path().display());

    let db = GraphDatabase::open(config.graph_path())
        .with_context(|| format!("Failed to load graph {}", config.graph_path().display()))?;

    let state = AppState::new(Arc::new(db), config.index_path());

    let listener = TcpListener::bind(config.bind_addr())
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;

    info!("Listening on {}", listener.local_addr()?);

    server::serve(listener, state)
        .await
        .context("HTTP server failed")
}
