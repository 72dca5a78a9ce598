//! Routing Domain Ports
//!
//! The rule store persists through a narrow port so any storage backend can
//! hold the rule set. Two adapters ship with the crate:
//!
//! - [`InMemoryRulePersistence`](crate::adapters::InMemoryRulePersistence):
//!   process-local, used by tests and by deployments that reseed on start
//! - [`JsonFileRulePersistence`](crate::adapters::JsonFileRulePersistence):
//!   a single JSON document on disk
//!
//! ```rust,ignore
//! let persistence: Arc<dyn RulePersistence> = match &config.rules_file {
//!     Some(path) => Arc::new(JsonFileRulePersistence::new(path)),
//!     None => Arc::new(InMemoryRulePersistence::new()),
//! };
//! let store = RuleStore::open(persistence, 256).await?;
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, PortError};

use crate::store::RuleSet;

/// Loads and saves the complete rule set, including its version counter
#[async_trait]
pub trait RulePersistence: DomainPort {
    /// Loads the persisted rule set; an absent store loads as empty at version 0
    async fn load(&self) -> Result<RuleSet, PortError>;

    /// Replaces the persisted rule set
    async fn save(&self, rules: &RuleSet) -> Result<(), PortError>;

    /// Short backend name for logs
    fn backend(&self) -> &'static str;
}
