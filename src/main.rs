// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;
#[cfg(test)]
mod testing;

use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::application::calibration_service::CalibrationService;
use crate::application::measurement_service::MeasurementService;
use crate::application::signal_poller::SignalPoller;
use crate::infrastructure::auth::RequestSigner;
use crate::infrastructure::backend_client::HttpBackend;
use crate::infrastructure::config::load_dashboard_config;
use crate::presentation::app_state::AppState;
use crate::presentation::routes::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;
    let display_range = config.display.range()?;

    // Backend client (infrastructure layer)
    let signer = RequestSigner::new(config.backend.credentials());
    let backend = Arc::new(HttpBackend::new(
        &config.backend.base_url,
        signer,
        config.backend.timeout(),
    )?);

    // Services (application layer)
    let (poller, signals) = SignalPoller::new(backend.clone(), config.poller.interval());
    let calibration = CalibrationService::new(backend.clone(), signals, display_range);
    if let Err(e) = calibration.load().await {
        tracing::warn!("Could not load stored calibration, using seed points: {}", e);
    }
    let measurements = MeasurementService::new(backend.clone(), calibration.clone());
    let poller_handle = poller.spawn();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let state = Arc::new(AppState {
        calibration,
        measurements,
        shutdown: shutdown_rx,
    });

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        "Starting perm-dashboard on {} (backend {})",
        listener.local_addr()?,
        config.backend.base_url
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    poller_handle.cancel().await;
    Ok(())
}

/// Resolves on Ctrl-C after telling open level streams to finish, so the
/// graceful drain is not held up by connected gauges.
async fn shutdown_signal(streams: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
    streams.send_replace(true);
}
