//! Routing Engine Process Host
//!
//! Loads `ROUTING_*` configuration, installs tracing, opens the rule store
//! and starts the configured engine. The `routing-engine` binary wires these
//! together and stops the engine cleanly on Ctrl+C or SIGTERM.

pub mod config;
pub mod error;
pub mod host;
pub mod telemetry;

pub use config::{LogFormat, RoutingConfig};
pub use error::ServiceError;
pub use host::{build_service, EngineMonitor, MonitorSummary};
pub use telemetry::init_tracing;
