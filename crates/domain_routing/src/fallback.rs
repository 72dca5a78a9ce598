//! Fallback Router
//!
//! Pull-only engine for deployments without a rule change feed. `evaluate`
//! matches against the current rules and writes through to the ledger;
//! nothing else happens until a caller asks for `recompute` or
//! `recompute_all`. Existing claims stay pinned to the rules version they
//! were routed under.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::info;

use crate::error::RoutingResult;
use crate::events::{ClaimRerouted, RerouteCause};
use crate::matcher::RoutingDecision;
use crate::pipeline::{PipelineState, ReactiveEngine};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::score::ScoreBundle;

/// Synchronous, on-demand routing engine
pub struct FallbackRouter {
    reconciler: Reconciler,
}

impl FallbackRouter {
    pub fn new(reconciler: Reconciler) -> Self {
        info!(state = %PipelineState::Degraded, "Using fallback router; reroutes are on demand");
        Self { reconciler }
    }
}

#[async_trait]
impl ReactiveEngine for FallbackRouter {
    fn state(&self) -> PipelineState {
        PipelineState::Degraded
    }

    async fn evaluate(
        &self,
        claim_id: &str,
        bundle: ScoreBundle,
    ) -> RoutingResult<RoutingDecision> {
        self.reconciler.route(claim_id, bundle, None).await
    }

    async fn recompute(&self, claim_id: &str) -> RoutingResult<RoutingDecision> {
        self.reconciler
            .reconcile_entry(claim_id, RerouteCause::Manual, true)
            .await?;
        Ok(self.reconciler.ledger().get(claim_id).await?.decision)
    }

    async fn recompute_all(&self) -> ReconcileReport {
        let version = self.reconciler.store().current_version().await;
        self.reconciler
            .reconcile_stale(version, RerouteCause::Manual)
            .await
    }

    async fn wait_reconciled(&self, _version: u64, _timeout: Duration) -> bool {
        false
    }

    fn subscribe_reroutes(&self) -> broadcast::Receiver<ClaimRerouted> {
        self.reconciler.subscribe_reroutes()
    }

    async fn shutdown(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::ledger::RoutingLedger;
    use crate::matcher::RuleMatcher;
    use crate::rule::{Condition, RuleSpec};
    use crate::score::SeverityLevel;
    use crate::store::RuleStore;

    #[tokio::test]
    async fn test_claims_stay_pinned_until_recomputed() {
        let store = Arc::new(RuleStore::in_memory());
        let router = FallbackRouter::new(Reconciler::new(
            store.clone(),
            Arc::new(RoutingLedger::new()),
            RuleMatcher::default(),
            16,
        ));
        assert!(!router.pathway_processed());

        let bundle = ScoreBundle::new(0.2, 1.0, SeverityLevel::Low, "accident");
        let first = router.evaluate("CLM-1", bundle).await.unwrap();
        assert!(first.is_default());

        store
            .create(RuleSpec::new(Condition::claim_type("accident"), "Accident Dept", "Adj"))
            .await
            .unwrap();
        tokio::task::yield_now().await;

        let pinned = router.reconciler.ledger().get("CLM-1").await.unwrap();
        assert_eq!(pinned.decision.rules_version, 0);

        let report = router.recompute_all().await;
        assert_eq!(report.rerouted, 1);
        let entry = router.reconciler.ledger().get("CLM-1").await.unwrap();
        assert_eq!(entry.decision.routing_team, "Accident Dept");
        assert_eq!(entry.decision.rules_version, 1);
    }

    #[tokio::test]
    async fn test_recompute_unknown_claim_is_not_found() {
        let router = FallbackRouter::new(Reconciler::new(
            Arc::new(RuleStore::in_memory()),
            Arc::new(RoutingLedger::new()),
            RuleMatcher::default(),
            16,
        ));
        assert!(router.recompute("nope").await.unwrap_err().is_not_found());
    }
}
