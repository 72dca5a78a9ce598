//! Routing Ledger
//!
//! Per-claim record of the last routing decision, the score bundle it was
//! computed from and a short history of reroutes. The ledger is the only
//! owner of these records; the pipeline and the fallback router mutate it
//! through [`RoutingLedger::record_or_update`] and
//! [`RoutingLedger::apply_reroute`].
//!
//! # Per-claim serialisation
//!
//! [`RoutingLedger::lock_claim`] hands out one async lock per claim id.
//! Anything that evaluates and then writes an entry holds that lock for the
//! whole read-evaluate-write sequence, so two recomputations of the same
//! claim never interleave. Different claims proceed in parallel.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::error::{RoutingError, RoutingResult};
use crate::events::RerouteCause;
use crate::matcher::RoutingDecision;
use crate::score::ScoreBundle;

/// Reroute records kept per claim; older records are dropped first
pub const MAX_REROUTE_HISTORY: usize = 20;

/// One change of assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerouteRecord {
    pub from_team: String,
    pub to_team: String,
    pub from_adjuster: String,
    pub to_adjuster: String,
    pub rules_version: u64,
    pub note: String,
    pub at: DateTime<Utc>,
}

/// Last known routing for one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub claim_id: String,
    /// Bundle the current decision was computed from
    pub score_bundle: ScoreBundle,
    pub decision: RoutingDecision,
    /// Most recent last
    #[serde(default)]
    pub history: Vec<RerouteRecord>,
}

impl LedgerEntry {
    /// True when the decision predates `version`
    pub fn is_stale_as_of(&self, version: u64) -> bool {
        self.decision.rules_version < version
    }
}

/// Ledger entries captured at one point in time
///
/// Iterating never yields an entry twice and can be repeated; later ledger
/// writes are not reflected.
#[derive(Debug, Clone, Default)]
pub struct StaleEntries {
    version: u64,
    entries: Arc<[LedgerEntry]>,
}

impl StaleEntries {
    /// Version the staleness was measured against
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LedgerEntry> {
        self.entries.iter()
    }

    pub fn claim_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.claim_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a StaleEntries {
    type Item = &'a LedgerEntry;
    type IntoIter = std::slice::Iter<'a, LedgerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Thread-safe store of ledger entries keyed by claim id
#[derive(Debug, Default)]
pub struct RoutingLedger {
    entries: RwLock<HashMap<String, LedgerEntry>>,
    claim_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RoutingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the per-claim lock for `claim_id`
    pub async fn lock_claim(&self, claim_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.claim_locks.lock().await;
            locks
                .entry(claim_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Inserts or wholesale-replaces the entry for `claim_id`
    ///
    /// Returns the decision that was replaced, if any. Reroute history is
    /// carried over untouched.
    pub async fn record_or_update(
        &self,
        claim_id: &str,
        score_bundle: ScoreBundle,
        decision: RoutingDecision,
    ) -> Option<RoutingDecision> {
        self.upsert(claim_id, score_bundle, decision, None).await
    }

    /// Replaces the entry and appends a history record if the assignment moved
    pub async fn apply_reroute(
        &self,
        claim_id: &str,
        score_bundle: ScoreBundle,
        decision: RoutingDecision,
        cause: RerouteCause,
    ) -> Option<RoutingDecision> {
        self.upsert(claim_id, score_bundle, decision, Some(cause)).await
    }

    async fn upsert(
        &self,
        claim_id: &str,
        score_bundle: ScoreBundle,
        decision: RoutingDecision,
        cause: Option<RerouteCause>,
    ) -> Option<RoutingDecision> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(claim_id) {
            Some(entry) => {
                let previous = std::mem::replace(&mut entry.decision, decision);
                entry.score_bundle = score_bundle;

                if let Some(cause) = cause {
                    push_history(entry, &previous, cause);
                }
                Some(previous)
            }
            None => {
                entries.insert(
                    claim_id.to_string(),
                    LedgerEntry {
                        claim_id: claim_id.to_string(),
                        score_bundle,
                        decision,
                        history: Vec::new(),
                    },
                );
                None
            }
        }
    }

    /// Appends a history record if the stored assignment differs from `previous`
    ///
    /// Returns true when a record was added.
    pub async fn note_reroute(
        &self,
        claim_id: &str,
        previous: &RoutingDecision,
        cause: RerouteCause,
    ) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(claim_id) {
            Some(entry) if !previous.same_assignment(&entry.decision) => {
                push_history(entry, previous, cause);
                true
            }
            _ => false,
        }
    }

    #[cfg(test)]
    pub(crate) async fn tracked_locks(&self) -> usize {
        self.claim_locks.lock().await.len()
    }

    pub async fn get(&self, claim_id: &str) -> RoutingResult<LedgerEntry> {
        self.entries
            .read()
            .await
            .get(claim_id)
            .cloned()
            .ok_or_else(|| RoutingError::claim_not_found(claim_id))
    }

    /// Entries whose decision was computed against a version older than `version`
    pub async fn entries_stale_as_of(&self, version: u64) -> StaleEntries {
        let mut stale: Vec<LedgerEntry> = self
            .entries
            .read()
            .await
            .values()
            .filter(|e| e.is_stale_as_of(version))
            .cloned()
            .collect();
        stale.sort_by(|a, b| a.claim_id.cmp(&b.claim_id));
        StaleEntries {
            version,
            entries: stale.into(),
        }
    }

    /// All claim ids, sorted
    pub async fn claim_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entries.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of claims per routing team
    pub async fn queue_summary(&self) -> BTreeMap<String, usize> {
        let mut summary = BTreeMap::new();
        for entry in self.entries.read().await.values() {
            *summary.entry(entry.decision.routing_team.clone()).or_insert(0) += 1;
        }
        summary
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn push_history(entry: &mut LedgerEntry, previous: &RoutingDecision, cause: RerouteCause) {
    if previous.same_assignment(&entry.decision) {
        return;
    }
    entry.history.push(RerouteRecord {
        from_team: previous.routing_team.clone(),
        to_team: entry.decision.routing_team.clone(),
        from_adjuster: previous.adjuster.clone(),
        to_adjuster: entry.decision.adjuster.clone(),
        rules_version: entry.decision.rules_version,
        note: cause.note(entry.decision.rules_version),
        at: entry.decision.evaluated_at,
    });
    let overflow = entry.history.len().saturating_sub(MAX_REROUTE_HISTORY);
    entry.history.drain(..overflow);
}
