//! Startup errors for the binary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] aggregate_store::StoreError),

    #[error("failed to initialise logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to install metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to install signal handler: {0}")]
    Signal(#[from] std::io::Error),

    #[error(transparent)]
    Domain(#[from] domain::DomainError),
}
