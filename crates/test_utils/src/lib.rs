//! Test Utilities Crate
//!
//! Shared test infrastructure for the claims routing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built score bundles, rule specs and services
//! - `builders`: Builder patterns for test data construction
//! - `assertions`: Assertion helpers for routing decisions and ledger entries
//! - `generators`: Property-based test data generators

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod generators;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use generators::*;
