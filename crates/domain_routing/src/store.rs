//! Rule Store
//!
//! Owns the rule set and its version counter. Every create, delete and
//! content-changing update increments the version by exactly one, is saved
//! through the persistence port, and is then published as a
//! [`RuleSetChanged`] event.
//!
//! # Concurrency
//!
//! Mutations run under a single writer lock covering version increment,
//! persistence and publication, so versions are strictly sequential and
//! events leave the store in version order. Readers take an `Arc` snapshot
//! of the current rule set and never observe a half-applied mutation.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info};

use core_kernel::RuleId;

use crate::adapters::InMemoryRulePersistence;
use crate::defaults::default_rules;
use crate::error::{RoutingError, RoutingResult};
use crate::events::{RuleChangeKind, RuleSetChanged};
use crate::ports::RulePersistence;
use crate::rule::{Rule, RulePatch, RuleSpec};

/// Default capacity of the rule-change broadcast channel
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Versioned collection of rules, kept in evaluation order
///
/// This is also the persisted shape: `{ "version": n, "rules": [...] }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    version: u64,
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Builds a rule set, sorting rules into evaluation order
    pub fn from_rules(version: u64, mut rules: Vec<Rule>) -> Self {
        rules.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        Self { version, rules }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Rules sorted by (priority asc, created_at asc)
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    fn next_sequence(&self) -> u64 {
        self.rules.iter().map(|r| r.sequence + 1).max().unwrap_or(0)
    }

    fn with_inserted(&self, rule: Rule) -> Self {
        let mut rules = self.rules.clone();
        rules.push(rule);
        Self::from_rules(self.version + 1, rules)
    }

    fn with_replaced(&self, rule: Rule) -> Self {
        let rules = self
            .rules
            .iter()
            .map(|r| if r.id == rule.id { rule.clone() } else { r.clone() })
            .collect();
        Self::from_rules(self.version + 1, rules)
    }

    fn without(&self, id: RuleId) -> Self {
        let rules = self.rules.iter().filter(|r| r.id != id).cloned().collect();
        Self::from_rules(self.version + 1, rules)
    }
}

struct WriterState {
    next_sequence: u64,
}

/// Thread-safe owner of the routing rules
pub struct RuleStore {
    current: RwLock<Arc<RuleSet>>,
    writer: Mutex<WriterState>,
    persistence: Arc<dyn RulePersistence>,
    changes: Option<broadcast::Sender<RuleSetChanged>>,
    event_buffer: usize,
}

impl RuleStore {
    /// Opens a store over a persistence adapter, loading the saved rule set
    pub async fn open(
        persistence: Arc<dyn RulePersistence>,
        event_buffer: usize,
    ) -> RoutingResult<Self> {
        let loaded = persistence.load().await?;
        let rules = RuleSet::from_rules(loaded.version, loaded.rules);
        info!(
            backend = persistence.backend(),
            version = rules.version(),
            rules = rules.len(),
            "Loaded routing rules"
        );
        Ok(Self::from_parts(persistence, rules, event_buffer))
    }

    /// Creates an empty store backed by process memory
    pub fn in_memory() -> Self {
        Self::from_parts(
            Arc::new(InMemoryRulePersistence::new()),
            RuleSet::default(),
            DEFAULT_EVENT_BUFFER,
        )
    }

    fn from_parts(
        persistence: Arc<dyn RulePersistence>,
        rules: RuleSet,
        event_buffer: usize,
    ) -> Self {
        let event_buffer = event_buffer.max(1);
        let (sender, _) = broadcast::channel(event_buffer);
        Self {
            writer: Mutex::new(WriterState {
                next_sequence: rules.next_sequence(),
            }),
            current: RwLock::new(Arc::new(rules)),
            persistence,
            changes: Some(sender),
            event_buffer,
        }
    }

    /// Capacity of the change feed
    pub fn event_buffer(&self) -> usize {
        self.event_buffer
    }

    /// Disables the change feed, for environments without event delivery
    ///
    /// Subscribing afterwards fails with `SubscriptionUnavailable`.
    pub fn without_change_feed(mut self) -> Self {
        self.changes = None;
        self
    }

    /// Subscribes to rule-set changes
    pub fn subscribe(&self) -> RoutingResult<broadcast::Receiver<RuleSetChanged>> {
        self.changes
            .as_ref()
            .map(|sender| sender.subscribe())
            .ok_or_else(|| {
                RoutingError::SubscriptionUnavailable(
                    "rule store has no change feed".to_string(),
                )
            })
    }

    /// Point-in-time snapshot of the rule set
    pub async fn snapshot(&self) -> Arc<RuleSet> {
        self.current.read().await.clone()
    }

    /// Rules in evaluation order
    pub async fn list(&self) -> Vec<Rule> {
        self.snapshot().await.rules().to_vec()
    }

    pub async fn get(&self, id: RuleId) -> RoutingResult<Rule> {
        self.snapshot()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RoutingError::rule_not_found(id))
    }

    pub async fn current_version(&self) -> u64 {
        self.current.read().await.version()
    }

    /// Validates and inserts a new rule
    pub async fn create(&self, spec: RuleSpec) -> RoutingResult<Rule> {
        let mut writer = self.writer.lock().await;
        self.create_locked(&mut writer, spec).await
    }

    /// Merges a patch into an existing rule
    ///
    /// A patch that leaves every field unchanged returns the stored rule
    /// without touching `updated_at`, the version or the change feed.
    pub async fn update(&self, id: RuleId, patch: RulePatch) -> RoutingResult<Rule> {
        let _writer = self.writer.lock().await;
        let current = self.snapshot().await;
        let existing = current.get(id).ok_or_else(|| RoutingError::rule_not_found(id))?;

        let mut merged = patch.merge_into(existing)?;
        if merged.same_content(existing) {
            debug!(rule_id = %id, version = current.version(), "Rule update is a no-op");
            return Ok(existing.clone());
        }
        merged.updated_at = Utc::now();

        let next = current.with_replaced(merged.clone());
        self.commit(next, vec![id], RuleChangeKind::Updated).await?;
        Ok(merged)
    }

    /// Removes a rule; deleting an absent rule is an error
    pub async fn delete(&self, id: RuleId) -> RoutingResult<()> {
        let _writer = self.writer.lock().await;
        let current = self.snapshot().await;
        if current.get(id).is_none() {
            return Err(RoutingError::rule_not_found(id));
        }
        let next = current.without(id);
        self.commit(next, vec![id], RuleChangeKind::Deleted).await
    }

    /// Creates the standard rule set when the store is empty
    ///
    /// Returns the number of rules created.
    pub async fn seed_defaults(&self) -> RoutingResult<usize> {
        let mut writer = self.writer.lock().await;
        if !self.snapshot().await.is_empty() {
            return Ok(0);
        }
        let specs = default_rules();
        let count = specs.len();
        for spec in specs {
            self.create_locked(&mut writer, spec).await?;
        }
        info!(count, "Seeded default routing rules");
        Ok(count)
    }

    async fn create_locked(
        &self,
        writer: &mut WriterState,
        spec: RuleSpec,
    ) -> RoutingResult<Rule> {
        let condition = spec.check()?.clone();
        let current = self.snapshot().await;
        let now = Utc::now();

        let rule = Rule {
            id: RuleId::new_v7(),
            name: spec.name,
            description: spec.description,
            priority: spec.priority.unwrap_or(current.len() as i64),
            enabled: spec.enabled,
            condition,
            routing_team: spec.routing_team.trim().to_string(),
            adjuster: spec.adjuster.trim().to_string(),
            sequence: writer.next_sequence,
            created_at: now,
            updated_at: now,
        };

        let next = current.with_inserted(rule.clone());
        self.commit(next, vec![rule.id], RuleChangeKind::Created).await?;
        writer.next_sequence += 1;
        Ok(rule)
    }

    /// Persists, swaps in and publishes a new rule set
    ///
    /// Must be called with the writer lock held.
    async fn commit(
        &self,
        next: RuleSet,
        changed_rule_ids: Vec<RuleId>,
        kind: RuleChangeKind,
    ) -> RoutingResult<()> {
        if let Err(e) = self.persistence.save(&next).await {
            error!(
                backend = self.persistence.backend(),
                version = next.version(),
                error = %e,
                "Failed to persist routing rules"
            );
            return Err(e.into());
        }

        let version = next.version();
        *self.current.write().await = Arc::new(next);

        info!(version, ?kind, rules = ?changed_rule_ids, "Routing rules changed");

        if let Some(sender) = &self.changes {
            let event = RuleSetChanged {
                version,
                changed_rule_ids,
                kind,
                timestamp: Utc::now(),
            };
            // No subscribers is fine; the pipeline may be stopped.
            if sender.send(event).is_err() {
                debug!(version, "Rule change published (no subscribers)");
            }
        }
        Ok(())
    }
}
