//! Rule persistence adapters
//!
//! Implementations of [`RulePersistence`](crate::ports::RulePersistence).
//! Pick one at startup; the rule store only sees the port.
//!
//! - **InMemoryRulePersistence**: keeps the last saved rule set in memory
//! - **JsonFileRulePersistence**: one pretty-printed JSON document per store

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileRulePersistence;
pub use memory::InMemoryRulePersistence;
