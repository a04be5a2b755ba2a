//! Deep Researcher HTTP 服务
//!
//! 启动: cargo run --bin deep-researcher-server
//! 接口: GET /health, POST /api/v1/research, POST /api/v1/research/stream

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use deep_researcher::{
    api::{self, AppState},
    config::{load_config, ConfigOverrides},
    observability,
};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down deep-researcher API service");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("RESEARCHER_CONFIG").ok().map(PathBuf::from);
    let cfg = load_config(config_path.as_deref(), &ConfigOverrides::default())
        .context("Failed to load config")?;
    observability::init(cfg.server.json_logs);

    let state = AppState::from_config(&cfg).context("Failed to configure researcher")?;
    let app = api::router(state);

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .context("Invalid server host/port")?;
    tracing::info!(
        %addr,
        timeout_secs = cfg.server.request_timeout_secs,
        "Starting deep-researcher API service"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}
