//! HTTP server entry point.

use crate::api;
use crate::host::StudioHostState;
use crate::infrastructure::config::Settings;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;

async fn health_check() -> &'static str {
    "OK"
}

/// Runs the HTTP server exposing the tool instance API.
///
/// # Errors
///
/// Returns an error if the server fails to bind or encounters an error
/// while running.
pub async fn run_server(config: &Settings, state: Arc<StudioHostState>) -> anyhow::Result<()> {
    let control_plane = Router::new()
        .route("/health/live", get(health_check))
        .route("/health/ready", get(health_check));

    let app = control_plane.merge(api::tool_routes().with_state(state));

    let addr_str = format!("{}:{}", config.server.host, config.server.port);
    let addr: SocketAddr = addr_str.parse()?;

    tracing::info!("Studio API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
