//! In-memory rule persistence

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use core_kernel::{DomainPort, PortError};

use crate::ports::RulePersistence;
use crate::store::RuleSet;

/// Keeps the most recently saved rule set in process memory
#[derive(Debug, Default)]
pub struct InMemoryRulePersistence {
    saved: RwLock<RuleSet>,
    saves: AtomicUsize,
}

impl InMemoryRulePersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with a previously saved rule set
    pub fn with_rules(rules: RuleSet) -> Self {
        Self {
            saved: RwLock::new(rules),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn saved(&self) -> RuleSet {
        self.saved.read().await.clone()
    }
}

impl DomainPort for InMemoryRulePersistence {}

#[async_trait]
impl RulePersistence for InMemoryRulePersistence {
    async fn load(&self) -> Result<RuleSet, PortError> {
        Ok(self.saved.read().await.clone())
    }

    async fn save(&self, rules: &RuleSet) -> Result<(), PortError> {
        *self.saved.write().await = rules.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_returns_last_save() {
        let persistence = InMemoryRulePersistence::new();
        assert_eq!(persistence.load().await.unwrap().version(), 0);

        let rules = RuleSet::from_rules(7, vec![]);
        persistence.save(&rules).await.unwrap();

        assert_eq!(persistence.load().await.unwrap().version(), 7);
        assert_eq!(persistence.save_count(), 1);
    }
}
