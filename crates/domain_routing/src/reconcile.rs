//! Evaluate-and-write paths shared by both engines
//!
//! [`Reconciler`] owns the sequence "lock claim, snapshot rules, evaluate,
//! write ledger, notify". The reactive pipeline and the fallback router
//! differ only in when they call it.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{RoutingError, RoutingResult};
use crate::events::{ClaimRerouted, RerouteCause};
use crate::ledger::RoutingLedger;
use crate::matcher::{RoutingDecision, RuleMatcher};
use crate::score::ScoreBundle;
use crate::store::RuleStore;

/// Bound on re-evaluations when rules keep changing under a route call
const MAX_ROUTE_ATTEMPTS: usize = 8;

/// Counts from one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    /// Rule-set version entries were brought up to
    pub target_version: u64,
    /// Entries considered
    pub examined: usize,
    /// Entries re-evaluated and written
    pub updated: usize,
    /// Updated entries whose team or adjuster changed
    pub rerouted: usize,
    /// Entries already current by the time their lock was taken
    pub skipped: usize,
    /// Entries that could not be re-evaluated
    pub failed: usize,
}

impl ReconcileReport {
    fn absorb(&mut self, outcome: EntryOutcome) {
        match outcome {
            EntryOutcome::Current => self.skipped += 1,
            EntryOutcome::Updated { rerouted } => {
                self.updated += 1;
                if rerouted {
                    self.rerouted += 1;
                }
            }
        }
    }
}

/// Result of reconciling one ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    Current,
    Updated { rerouted: bool },
}

/// Shared evaluation and ledger write-back
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<RuleStore>,
    ledger: Arc<RoutingLedger>,
    matcher: RuleMatcher,
    reroutes: broadcast::Sender<ClaimRerouted>,
}

impl Reconciler {
    pub fn new(
        store: Arc<RuleStore>,
        ledger: Arc<RoutingLedger>,
        matcher: RuleMatcher,
        notification_buffer: usize,
    ) -> Self {
        let (reroutes, _) = broadcast::channel(notification_buffer.max(1));
        Self {
            store,
            ledger,
            matcher,
            reroutes,
        }
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.store
    }

    pub fn ledger(&self) -> &Arc<RoutingLedger> {
        &self.ledger
    }

    pub fn matcher(&self) -> &RuleMatcher {
        &self.matcher
    }

    pub fn subscribe_reroutes(&self) -> broadcast::Receiver<ClaimRerouted> {
        self.reroutes.subscribe()
    }

    /// Evaluates against the current rules without touching the ledger
    pub async fn preview(&self, bundle: &ScoreBundle) -> RoutingResult<RoutingDecision> {
        check_bundle(bundle)?;
        let snapshot = self.store.snapshot().await;
        Ok(self.matcher.evaluate(bundle, &snapshot))
    }

    /// Evaluates a claim and writes the decision to the ledger
    ///
    /// With a `cause`, a changed assignment is recorded in the claim's
    /// history and announced as [`ClaimRerouted`].
    ///
    /// If the rule set changes between snapshot and write, the claim is
    /// re-evaluated so the stored decision never lags a version that the
    /// pipeline may already have reconciled past.
    pub async fn route(
        &self,
        claim_id: &str,
        bundle: ScoreBundle,
        cause: Option<RerouteCause>,
    ) -> RoutingResult<RoutingDecision> {
        check_claim_id(claim_id)?;
        check_bundle(&bundle)?;

        let _claim = self.ledger.lock_claim(claim_id).await;
        let mut attempt = 0;
        let mut original: Option<RoutingDecision> = None;
        loop {
            attempt += 1;
            let snapshot = self.store.snapshot().await;
            let decision = self.matcher.evaluate(&bundle, &snapshot);

            let replaced = self
                .ledger
                .record_or_update(claim_id, bundle.clone(), decision.clone())
                .await;
            if attempt == 1 {
                original = replaced;
            }

            let current = self.store.current_version().await;
            if current == snapshot.version() || attempt >= MAX_ROUTE_ATTEMPTS {
                if current != snapshot.version() {
                    warn!(
                        claim_id,
                        decided_at = snapshot.version(),
                        current,
                        "Rules kept changing while routing; leaving entry for reconciliation"
                    );
                }
                // History and notification compare against the decision held
                // before this call, not against intermediate retries.
                if let (Some(cause), Some(original)) = (cause, original) {
                    self.ledger.note_reroute(claim_id, &original, cause).await;
                    self.notify_if_moved(claim_id, original, &decision, cause);
                }
                return Ok(decision);
            }
            debug!(claim_id, attempt, "Rules changed during routing; re-evaluating");
        }
    }

    /// Re-evaluates one ledger entry from its retained bundle
    ///
    /// Without `force`, an entry already at the current version is left
    /// alone. A bundle that can no longer be evaluated is a `StaleScore`
    /// error and the entry keeps its old decision.
    pub async fn reconcile_entry(
        &self,
        claim_id: &str,
        cause: RerouteCause,
        force: bool,
    ) -> RoutingResult<EntryOutcome> {
        // Unknown claims never get a lock; entries are never removed.
        self.ledger.get(claim_id).await?;
        let _claim = self.ledger.lock_claim(claim_id).await;
        let entry = self.ledger.get(claim_id).await?;
        let snapshot = self.store.snapshot().await;

        if !force && !entry.is_stale_as_of(snapshot.version()) {
            return Ok(EntryOutcome::Current);
        }
        if let Some(reason) = entry.score_bundle.integrity_issue() {
            return Err(RoutingError::stale_score(claim_id, reason));
        }

        let decision = self.matcher.evaluate(&entry.score_bundle, &snapshot);
        self.ledger
            .apply_reroute(claim_id, entry.score_bundle, decision.clone(), cause)
            .await;

        let rerouted = self.notify_if_moved(claim_id, entry.decision, &decision, cause);
        Ok(EntryOutcome::Updated { rerouted })
    }

    /// Reconciles every entry stale relative to `version`
    pub async fn reconcile_stale(&self, version: u64, cause: RerouteCause) -> ReconcileReport {
        let stale = self.ledger.entries_stale_as_of(version).await;
        self.reconcile_claims(stale.claim_ids(), cause, false).await
    }

    /// Re-evaluates every ledger entry regardless of version
    pub async fn reconcile_all(&self, cause: RerouteCause) -> ReconcileReport {
        let ids = self.ledger.claim_ids().await;
        self.reconcile_claims(ids, cause, true).await
    }

    async fn reconcile_claims(
        &self,
        claim_ids: Vec<String>,
        cause: RerouteCause,
        force: bool,
    ) -> ReconcileReport {
        let mut report = ReconcileReport {
            examined: claim_ids.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for claim_id in claim_ids {
            let reconciler = self.clone();
            tasks.spawn(async move {
                let result = reconciler.reconcile_entry(&claim_id, cause, force).await;
                (claim_id, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(outcome))) => report.absorb(outcome),
                Ok((claim_id, Err(e))) => {
                    report.failed += 1;
                    warn!(claim_id = %claim_id, error = %e, "Failed to reconcile ledger entry");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(error = %e, "Reconciliation task aborted");
                }
            }
        }

        report.target_version = self.store.current_version().await;
        if report.examined > 0 {
            info!(
                version = report.target_version,
                examined = report.examined,
                updated = report.updated,
                rerouted = report.rerouted,
                failed = report.failed,
                "Reconciled routing ledger"
            );
        }
        report
    }

    fn notify_if_moved(
        &self,
        claim_id: &str,
        previous: RoutingDecision,
        decision: &RoutingDecision,
        cause: RerouteCause,
    ) -> bool {
        if previous.same_assignment(decision) {
            return false;
        }
        info!(
            claim_id,
            from = %previous.routing_team,
            to = %decision.routing_team,
            version = decision.rules_version,
            "Claim rerouted"
        );
        // Nobody listening is fine.
        let _ = self
            .reroutes
            .send(ClaimRerouted::new(claim_id, previous, decision.clone(), cause));
        true
    }
}

fn check_claim_id(claim_id: &str) -> RoutingResult<()> {
    if claim_id.trim().is_empty() {
        return Err(RoutingError::validation("claim_id must not be empty"));
    }
    Ok(())
}

fn check_bundle(bundle: &ScoreBundle) -> RoutingResult<()> {
    match bundle.integrity_issue() {
        Some(issue) => Err(RoutingError::validation(issue)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::{ScoreBucket, ScoreKind};
    use crate::rule::{Condition, RulePatch, RuleSpec};
    use crate::score::SeverityLevel;

    fn reconciler() -> Reconciler {
        Reconciler::new(
            Arc::new(RuleStore::in_memory()),
            Arc::new(RoutingLedger::new()),
            RuleMatcher::default(),
            64,
        )
    }

    fn bundle(fraud: f64) -> ScoreBundle {
        ScoreBundle::new(fraud, 1.0, SeverityLevel::Low, "accident")
    }

    #[tokio::test]
    async fn test_route_rejects_blank_claim_and_bad_bundle() {
        let r = reconciler();
        assert!(r.route("  ", bundle(0.1), None).await.unwrap_err().is_validation());
        assert!(r
            .route("CLM-1", bundle(f64::NAN), None)
            .await
            .unwrap_err()
            .is_validation());
        assert!(r.ledger().is_empty().await);
    }

    #[tokio::test]
    async fn test_reconcile_entry_skips_current_and_reports_stale_score() {
        let r = reconciler();
        r.route("CLM-1", bundle(0.9), None).await.unwrap();
        let outcome = r
            .reconcile_entry("CLM-1", RerouteCause::RuleChange, false)
            .await
            .unwrap();
        assert_eq!(outcome, EntryOutcome::Current);

        // A corrupted retained bundle surfaces as StaleScore.
        let mut corrupt = bundle(0.2);
        corrupt.complexity_score = f64::NAN;
        r.ledger()
            .record_or_update("CLM-2", corrupt, r.preview(&bundle(0.2)).await.unwrap())
            .await;
        r.store()
            .create(RuleSpec::new(Condition::claim_type("accident"), "Accident Dept", "A"))
            .await
            .unwrap();

        let err = r
            .reconcile_entry("CLM-2", RerouteCause::RuleChange, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RoutingError::StaleScore { .. }));
    }

    #[tokio::test]
    async fn test_reconcile_stale_isolates_failures() {
        let r = reconciler();
        let mut rx = r.subscribe_reroutes();
        r.route("good", bundle(0.9), None).await.unwrap();
        let mut corrupt = bundle(0.9);
        corrupt.fraud_score = f64::INFINITY;
        r.ledger()
            .record_or_update("bad", corrupt, r.preview(&bundle(0.9)).await.unwrap())
            .await;

        let rule = r
            .store()
            .create(RuleSpec::new(
                Condition::score_category(ScoreKind::Fraud, ScoreBucket::High),
                "SIU (Fraud)",
                "SIU Investigator",
            ))
            .await
            .unwrap();

        let report = r.reconcile_stale(1, RerouteCause::RuleChange).await;
        assert_eq!(report.examined, 2);
        assert_eq!(report.updated, 1);
        assert_eq!(report.rerouted, 1);
        assert_eq!(report.failed, 1);

        let event = rx.try_recv().unwrap();
        assert_eq!(event.claim_id, "good");
        assert_eq!(event.new_decision.matched_rule_id, Some(rule.id));
        assert!(rx.try_recv().is_err());

        // Same-assignment update fires nothing.
        r.store()
            .update(rule.id, RulePatch::default().with_priority(5))
            .await
            .unwrap();
        let report = r.reconcile_stale(2, RerouteCause::RuleChange).await;
        assert_eq!(report.updated, 1);
        assert_eq!(report.rerouted, 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_claim_takes_no_lock() {
        let r = reconciler();
        for n in 0..5 {
            let err = r
                .reconcile_entry(&format!("missing-{}", n), RerouteCause::Manual, true)
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }
        assert_eq!(r.ledger().tracked_locks().await, 0);

        r.route("CLM-1", bundle(0.1), None).await.unwrap();
        r.reconcile_entry("CLM-1", RerouteCause::Manual, true).await.unwrap();
        assert_eq!(r.ledger().tracked_locks().await, 1);
    }

    #[tokio::test]
    async fn test_manual_route_records_single_history_entry() {
        let r = reconciler();
        r.store()
            .create(RuleSpec::new(
                Condition::score_category(ScoreKind::Fraud, ScoreBucket::High),
                "SIU (Fraud)",
                "SIU Investigator",
            ))
            .await
            .unwrap();
        r.route("CLM-1", bundle(0.1), None).await.unwrap();
        let mut rx = r.subscribe_reroutes();

        r.route("CLM-1", bundle(0.9), Some(RerouteCause::Manual)).await.unwrap();
        // Same assignment again: no record, no notification.
        r.route("CLM-1", bundle(0.95), Some(RerouteCause::Manual)).await.unwrap();

        let entry = r.ledger().get("CLM-1").await.unwrap();
        assert_eq!(entry.history.len(), 1);
        assert_eq!(entry.history[0].from_team, "Fast Track");
        assert_eq!(entry.history[0].to_team, "SIU (Fraud)");
        assert_eq!(rx.try_recv().unwrap().new_decision.routing_team, "SIU (Fraud)");
        assert!(rx.try_recv().is_err());
    }
}
