//! Storefront entry point.

use std::sync::Arc;

use app::{AppError, Backend, BcryptHasher, Config, Services, reactor, telemetry, walkthrough};
use domain::BroadcastDispatcher;
use tokio::signal;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() -> Result<(), AppError> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                tracing::info!("received SIGINT, shutting down");
            }
            _ = terminate.recv() => {
                tracing::info!("received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        tracing::info!("received SIGINT, shutting down");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Configuration, logging and metrics
    let config = Config::from_env();
    telemetry::init_tracing(&config)?;
    let metrics_addr = telemetry::install_metrics(&config)?;
    tracing::info!(%metrics_addr, "prometheus exporter listening");

    // 2. Storage backend and services
    let backend = Backend::connect(&config).await?;
    let broadcast = BroadcastDispatcher::new();
    let services = Services::new(
        backend,
        &config,
        Arc::new(BcryptHasher::new(config.bcrypt_cost)),
        app::default_dispatcher(&broadcast),
        app::default_senders(),
    );

    // 3. Event reactor
    let reactions = reactor::spawn(broadcast.subscribe(), Arc::clone(&services.notifications));

    // 4. Drive the services once, then keep serving metrics until shutdown
    walkthrough::run(&services).await?;
    shutdown_signal().await?;

    reactions.abort();
    tracing::info!("storefront stopped");
    Ok(())
}
