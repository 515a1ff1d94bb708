use std::net::SocketAddr;

use anyhow::anyhow;
use axum::http::Method;
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cosyvoice_gateway::{core::engine, routes, state::AppState, ServiceConfig};

/// CosyVoice3 gateway - HTTP voice cloning service
#[derive(Parser, Debug)]
#[command(name = "cosyvoice-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Bind address (overrides HOST)
    #[arg(long = "host", value_name = "ADDR")]
    host: Option<String>,

    /// Bind port (overrides PORT)
    #[arg(long = "port", value_name = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let mut config = ServiceConfig::from_env();
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    config
        .ensure_audio_dirs()
        .map_err(|e| anyhow!("failed to create audio directories: {e}"))?;

    // The service still starts when the model cannot be loaded; synthesis
    // endpoints answer 503 until a restart with a working model.
    let engine = match engine::load(&config) {
        Ok(engine) => {
            info!(sample_rate = engine.sample_rate(), "model loaded");
            Some(engine)
        }
        Err(e) => {
            error!("model load failed, serving degraded: {e}");
            None
        }
    };

    let address = config.address();
    let app_state = AppState::new(config, engine);

    let cors_layer = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    let app = routes::api::create_api_router()
        .with_state(app_state)
        .layer(cors_layer);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    info!("Server listening on http://{socket_addr}");

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
    }
}
