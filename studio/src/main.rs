//! Studio core daemon entry point.

use std::process;
use std::sync::Arc;

use secrecy::ExposeSecret;
use tracing::{error, info};

use studio_core::bundle::Layout;
use studio_core::host::StudioHostState;
use studio_core::infrastructure::config::Settings;
use studio_core::infrastructure::server::run_server;
use studio_core::infrastructure::telemetry::TelemetryBuilder;
use studio_core::provisioner::VenvBuilder;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::new()?;

    TelemetryBuilder::new(
        settings.telemetry.service_name.clone(),
        env!("CARGO_PKG_VERSION"),
    )
    .with_log_level(settings.telemetry.log_level.clone())
    .init()?;

    let layout = Layout::from_settings(&settings.layout);
    let builder = Arc::new(VenvBuilder::new(settings.provisioner.python_bin.clone()));

    let state = match StudioHostState::new(
        settings.database.url.expose_secret(),
        builder,
        layout,
        settings.provisioner.workers,
    )
    .await
    {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("failed to initialize host state: {e:#}");
            process::exit(1);
        }
    };

    let server_state = Arc::clone(&state);
    let server_settings = settings.clone();
    let server = tokio::spawn(async move { run_server(&server_settings, server_state).await });

    shutdown_signal().await;
    info!("shutdown signal received, draining background jobs");
    server.abort();
    state.shutdown().await;
    info!("shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for ctrl-c: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!("failed to listen for SIGTERM: {e}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
