//! Ports and Adapters Infrastructure
//!
//! Foundational types for the hexagonal architecture used by the routing
//! domain. The domain defines narrow port traits (for example the rule
//! persistence port) that extend [`DomainPort`]; adapters implement them for
//! a concrete backend.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │        Routing service / pipeline        │
//! └──────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌──────────────────────────────────────────┐
//! │   Port traits (RulePersistence, ...)     │
//! └──────────────────────────────────────────┘
//!            ▲                    ▲
//!   ┌────────┴───────┐   ┌────────┴────────┐
//!   │   In-memory    │   │    JSON file    │
//!   └────────────────┘   └─────────────────┘
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a persistence adapter
#[derive(Debug, Error)]
pub enum PortError {
    /// A validation error occurred
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Reading or writing the backing file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backing system is unavailable
    #[error("Service unavailable: {service}")]
    ServiceUnavailable {
        service: String,
    },

    /// Stored data could not be decoded or encoded
    #[error("Transformation error: {message}")]
    Transformation {
        message: String,
    },
}

impl PortError {
    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Creates a Validation error with field information
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        PortError::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates an Io error bound to the path being accessed
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PortError::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a Transformation error
    pub fn transformation(message: impl Into<String>) -> Self {
        PortError::Transformation {
            message: message.into(),
        }
    }

    /// True for failures that may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PortError::Io { .. } | PortError::ServiceUnavailable { .. }
        )
    }
}

/// Marker trait for all domain ports
///
/// Port traits extend this marker so implementations are thread-safe and
/// usable behind `Arc<dyn ...>` in async contexts.
pub trait DomainPort: Send + Sync + 'static {}

/// Health status for an adapter or service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterHealth {
    /// Fully operational
    Healthy,
    /// Operational with reduced capability
    Degraded,
    /// Not operational
    Unhealthy,
}

/// Health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Component identifier
    pub adapter_id: String,
    /// Current health status
    pub status: AdapterHealth,
    /// Latency of the health check in milliseconds
    pub latency_ms: u64,
    /// Optional message with additional details
    pub message: Option<String>,
    /// Timestamp of the health check
    pub checked_at: chrono::DateTime<chrono::Utc>,
}

/// Trait for components that support health checks
#[async_trait::async_trait]
pub trait HealthCheckable: Send + Sync {
    /// Performs a health check on the component
    async fn health_check(&self) -> HealthCheckResult;
}
