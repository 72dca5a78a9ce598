//! Process host errors

use thiserror::Error;

use domain_routing::RoutingError;

/// Errors raised while starting or running the routing engine process
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The routing engine failed to start
    #[error("Routing engine error: {0}")]
    Routing(#[from] RoutingError),

    /// A global tracing subscriber is already installed
    #[error("Tracing initialization failed: {0}")]
    Telemetry(#[from] tracing_subscriber::util::TryInitError),
}
