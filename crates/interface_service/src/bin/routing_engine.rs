//! Claims Routing Engine
//!
//! Runs the routing engine as a long-lived process and logs reroutes until
//! interrupted.
//!
//! # Usage
//!
//! ```bash
//! ROUTING_RULES_FILE=./data/routing_rules.json cargo run --bin routing-engine
//! ```
//!
//! # Environment Variables
//!
//! * `ROUTING_ENGINE` - `reactive` or `fallback` (default: reactive)
//! * `ROUTING_RULES_FILE` - JSON rule file; rules are kept in memory when unset
//! * `ROUTING_SEED_DEFAULT_RULES` - seed the standard rules into an empty store (default: true)
//! * `ROUTING_DEFAULT_TEAM` / `ROUTING_DEFAULT_ADJUSTER` - assignment when no rule matches
//! * `ROUTING_EVENT_BUFFER` - change and reroute channel capacity (default: 256)
//! * `ROUTING_RECONCILE_TIMEOUT_MS` - wait for reconciliation after a rule change (default: 5000)
//! * `ROUTING_HEALTH_INTERVAL_SECS` - seconds between health logs, 0 disables (default: 60)
//! * `ROUTING_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `ROUTING_LOG_FORMAT` - `pretty` or `json` (default: pretty)

use tokio::sync::watch;

use interface_service::{build_service, init_tracing, EngineMonitor, RoutingConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = RoutingConfig::from_env()?;
    init_tracing(&config.log_level, config.log_format)?;

    tracing::info!(engine = %config.engine, "Starting claims routing engine");

    let service = build_service(&config).await?;

    let (stop_tx, stop_rx) = watch::channel(false);
    let monitor = EngineMonitor::new(service.clone(), config.health_interval());
    let monitor = tokio::spawn(monitor.run(stop_rx));

    shutdown_signal().await;
    tracing::info!("Shutdown signal received");

    stop_tx.send_replace(true);
    monitor.await?;
    service.shutdown().await;

    tracing::info!("Routing engine shutdown complete");
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
