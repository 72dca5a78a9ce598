//! Core Kernel - Foundational types for the claims routing engine
//!
//! This crate provides the building blocks shared by the routing domain and
//! the process host:
//! - Strongly-typed identifiers
//! - Port infrastructure for swappable adapters
//! - Health reporting types

pub mod identifiers;
pub mod ports;

pub use identifiers::{NotificationId, RuleId};
pub use ports::{
    AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError,
};
