//! REST server startup and configuration

use anyhow::{Context, Result};
use axum::serve;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::KindredConfig;
use crate::server::routing::create_router;
use crate::server::state::AppState;

/// Start the REST server on `config.server.bind`
pub async fn start_server(config: &KindredConfig) -> Result<()> {
  let addr: SocketAddr = config.server.bind;
  info!("Starting Kindred REST server on {addr}");

  let state = AppState::from_config(config).await?;
  let app = create_router(state).layer(
    ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()),
  );

  let listener =
    TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;
  info!("Server listening on {addr}");

  serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("Server error")?;
  info!("Server shutdown gracefully");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("Failed to listen for shutdown signal: {e}");
    std::future::pending::<()>().await;
  }
}
