//! MCP adapter binary: serves the synthesis tools over stdio.
//!
//! Unlike the HTTP adapter there is no degraded mode; a tool host that
//! spawned us can retry, so a model that fails to load is fatal here.

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cosyvoice_gateway::core::engine;
use cosyvoice_gateway::mcp::McpServer;
use cosyvoice_gateway::state::AppState;
use cosyvoice_gateway::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    // Stdout carries the protocol; all diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let config = ServiceConfig::from_env();
    config
        .ensure_audio_dirs()
        .context("failed to create audio directories")?;

    let engine = engine::load(&config).context("model load failed")?;
    info!(sample_rate = engine.sample_rate(), "model loaded");

    let state = AppState::new(config, Some(engine));
    McpServer::new(state).serve_stdio().await?;

    Ok(())
}
