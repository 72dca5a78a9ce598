//! Routing service
//!
//! [`RoutingService`] is the surface collaborators call: rule CRUD, the
//! preview and routing paths, manual reroutes and lifecycle. It wires the
//! rule store, ledger and the engine chosen at startup, and tags every
//! decision it hands out with whether the change feed was keeping it
//! current.
//!
//! # Example
//!
//! ```rust,ignore
//! let service = RoutingService::builder()
//!     .engine(EngineKind::Reactive)
//!     .build()
//!     .await?;
//!
//! service.create_rule(spec).await?;
//! let routed = service.route_claim("CLM-1001", bundle).await?;
//! assert!(routed.pathway_processed);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable, RuleId};

use crate::attributes::RuleAttributes;
use crate::error::RoutingResult;
use crate::events::{ClaimRerouted, RerouteCause};
use crate::fallback::FallbackRouter;
use crate::ledger::{LedgerEntry, RoutingLedger};
use crate::matcher::{RouterDefaults, RoutingDecision, RuleMatcher};
use crate::pipeline::{PipelineState, ReactiveEngine, ReactivePipeline};
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::rule::{Rule, RulePatch, RuleSpec};
use crate::score::ScoreBundle;
use crate::store::{RuleStore, DEFAULT_EVENT_BUFFER};

/// Which engine keeps routed claims current
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Push: reconcile on every rule change
    #[default]
    Reactive,
    /// Pull: reroute only when asked
    Fallback,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Reactive => f.write_str("reactive"),
            EngineKind::Fallback => f.write_str("fallback"),
        }
    }
}

/// Tuning for the reactive engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Capacity of the reroute notification channel
    pub event_buffer: usize,
    /// How long a rule mutation waits for reconciliation to catch up
    pub reconcile_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            event_buffer: DEFAULT_EVENT_BUFFER,
            reconcile_timeout: Duration::from_secs(5),
        }
    }
}

/// A decision as surfaced to collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedDecision {
    #[serde(flatten)]
    pub decision: RoutingDecision,
    /// True when the reactive pipeline was running at evaluation time
    pub pathway_processed: bool,
}

/// One item of a manual bulk reroute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerouteRequest {
    pub claim_id: String,
    #[serde(flatten)]
    pub score_bundle: ScoreBundle,
}

impl RerouteRequest {
    pub fn new(claim_id: impl Into<String>, score_bundle: ScoreBundle) -> Self {
        Self {
            claim_id: claim_id.into(),
            score_bundle,
        }
    }
}

/// Builder for [`RoutingService`]
#[derive(Default)]
pub struct RoutingServiceBuilder {
    store: Option<Arc<RuleStore>>,
    ledger: Option<Arc<RoutingLedger>>,
    defaults: RouterDefaults,
    engine: EngineKind,
    pipeline: PipelineConfig,
}

impl RoutingServiceBuilder {
    pub fn store(mut self, store: Arc<RuleStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn ledger(mut self, ledger: Arc<RoutingLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn defaults(mut self, defaults: RouterDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Wires the components and starts the chosen engine
    ///
    /// A reactive engine whose change feed is unavailable comes up degraded.
    pub async fn build(self) -> RoutingResult<RoutingService> {
        let store = self.store.unwrap_or_else(|| Arc::new(RuleStore::in_memory()));
        let ledger = self.ledger.unwrap_or_default();
        let reconciler = Reconciler::new(
            store.clone(),
            ledger.clone(),
            RuleMatcher::new(self.defaults),
            self.pipeline.event_buffer,
        );

        let engine: Arc<dyn ReactiveEngine> = match self.engine {
            EngineKind::Reactive => {
                let pipeline = ReactivePipeline::new(reconciler.clone());
                pipeline.start().await?;
                Arc::new(pipeline)
            }
            EngineKind::Fallback => Arc::new(FallbackRouter::new(reconciler.clone())),
        };

        info!(
            engine = %self.engine,
            state = %engine.state(),
            version = store.current_version().await,
            "Routing service ready"
        );

        Ok(RoutingService {
            inner: Arc::new(ServiceInner {
                store,
                ledger,
                reconciler,
                engine,
                kind: self.engine,
                config: self.pipeline,
                mutations: Mutex::new(()),
            }),
        })
    }
}

struct ServiceInner {
    store: Arc<RuleStore>,
    ledger: Arc<RoutingLedger>,
    reconciler: Reconciler,
    engine: Arc<dyn ReactiveEngine>,
    kind: EngineKind,
    config: PipelineConfig,
    /// Held across a rule mutation and its reconciliation
    mutations: Mutex<()>,
}

/// Entry point for rule management and claim routing
#[derive(Clone)]
pub struct RoutingService {
    inner: Arc<ServiceInner>,
}

impl RoutingService {
    pub fn builder() -> RoutingServiceBuilder {
        RoutingServiceBuilder::default()
    }

    pub fn store(&self) -> &Arc<RuleStore> {
        &self.inner.store
    }

    pub fn ledger(&self) -> &Arc<RoutingLedger> {
        &self.inner.ledger
    }

    pub fn engine_kind(&self) -> EngineKind {
        self.inner.kind
    }

    /// Current engine state
    pub fn mode(&self) -> PipelineState {
        self.inner.engine.state()
    }

    // ========================================================================
    // Rules
    // ========================================================================

    pub async fn list_rules(&self) -> Vec<Rule> {
        self.inner.store.list().await
    }

    pub async fn get_rule(&self, id: RuleId) -> RoutingResult<Rule> {
        self.inner.store.get(id).await
    }

    pub async fn create_rule(&self, spec: RuleSpec) -> RoutingResult<Rule> {
        let _mutation = self.inner.mutations.lock().await;
        let rule = self.inner.store.create(spec).await?;
        self.settle().await;
        Ok(rule)
    }

    pub async fn update_rule(&self, id: RuleId, patch: RulePatch) -> RoutingResult<Rule> {
        let _mutation = self.inner.mutations.lock().await;
        let rule = self.inner.store.update(id, patch).await?;
        self.settle().await;
        Ok(rule)
    }

    pub async fn delete_rule(&self, id: RuleId) -> RoutingResult<()> {
        let _mutation = self.inner.mutations.lock().await;
        self.inner.store.delete(id).await?;
        self.settle().await;
        Ok(())
    }

    pub fn rule_attributes(&self) -> RuleAttributes {
        RuleAttributes::catalog()
    }

    /// Waits for the pipeline to reconcile up to the current version
    async fn settle(&self) {
        if self.inner.engine.state() != PipelineState::Running {
            return;
        }
        let version = self.inner.store.current_version().await;
        let timeout = self.inner.config.reconcile_timeout;
        if !self.inner.engine.wait_reconciled(version, timeout).await {
            warn!(
                version,
                timeout_ms = timeout.as_millis() as u64,
                "Reconciliation did not reach rule version in time"
            );
        }
    }

    // ========================================================================
    // Routing
    // ========================================================================

    fn tag(&self, decision: RoutingDecision) -> RoutedDecision {
        RoutedDecision {
            decision,
            pathway_processed: self.inner.engine.pathway_processed(),
        }
    }

    /// Evaluates a bundle against the current rules without recording it
    pub async fn apply_routing(&self, bundle: &ScoreBundle) -> RoutingResult<RoutedDecision> {
        let decision = self.inner.reconciler.preview(bundle).await?;
        Ok(self.tag(decision))
    }

    /// Routes a claim and records the decision in the ledger
    pub async fn route_claim(
        &self,
        claim_id: &str,
        bundle: ScoreBundle,
    ) -> RoutingResult<RoutedDecision> {
        let decision = self.inner.engine.evaluate(claim_id, bundle).await?;
        Ok(self.tag(decision))
    }

    /// Re-routes the given claims with the supplied bundles
    ///
    /// Every bundle is checked before any claim is touched, so a malformed
    /// item rejects the whole request.
    pub async fn reroute_claims(
        &self,
        requests: Vec<RerouteRequest>,
    ) -> RoutingResult<Vec<RoutedDecision>> {
        for request in &requests {
            self.inner.reconciler.preview(&request.score_bundle).await?;
        }

        let mut routed = Vec::with_capacity(requests.len());
        for request in requests {
            let decision = self
                .inner
                .reconciler
                .route(&request.claim_id, request.score_bundle, Some(RerouteCause::Manual))
                .await?;
            routed.push(self.tag(decision));
        }
        info!(count = routed.len(), "Manually rerouted claims");
        Ok(routed)
    }

    /// Re-evaluates every recorded claim from its retained bundle
    pub async fn reroute_all(&self) -> ReconcileReport {
        self.inner.reconciler.reconcile_all(RerouteCause::Manual).await
    }

    /// Re-evaluates one recorded claim from its retained bundle
    pub async fn recompute(&self, claim_id: &str) -> RoutingResult<RoutedDecision> {
        let decision = self.inner.engine.recompute(claim_id).await?;
        Ok(self.tag(decision))
    }

    /// Re-evaluates every claim whose decision predates the current rules
    pub async fn recompute_all(&self) -> ReconcileReport {
        self.inner.engine.recompute_all().await
    }

    pub async fn claim(&self, claim_id: &str) -> RoutingResult<LedgerEntry> {
        self.inner.ledger.get(claim_id).await
    }

    pub async fn queue_summary(&self) -> BTreeMap<String, usize> {
        self.inner.ledger.queue_summary().await
    }

    pub fn subscribe_reroutes(&self) -> broadcast::Receiver<ClaimRerouted> {
        self.inner.engine.subscribe_reroutes()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub async fn health(&self) -> HealthCheckResult {
        let started = Instant::now();
        let state = self.mode();
        let (status, message) = match (self.inner.kind, state) {
            (_, PipelineState::Running) => (AdapterHealth::Healthy, None),
            (EngineKind::Fallback, _) => (
                AdapterHealth::Degraded,
                Some("fallback router; reroutes on demand only".to_string()),
            ),
            (EngineKind::Reactive, PipelineState::Degraded) => (
                AdapterHealth::Degraded,
                Some("rule change feed unavailable".to_string()),
            ),
            (EngineKind::Reactive, PipelineState::Stopped) => (
                AdapterHealth::Unhealthy,
                Some("routing pipeline stopped".to_string()),
            ),
        };

        HealthCheckResult {
            adapter_id: "routing-engine".to_string(),
            status,
            latency_ms: started.elapsed().as_millis() as u64,
            message,
            checked_at: Utc::now(),
        }
    }

    /// Stops the engine; routing calls keep working afterwards
    pub async fn shutdown(&self) {
        self.inner.engine.shutdown().await;
    }
}

#[async_trait]
impl HealthCheckable for RoutingService {
    async fn health_check(&self) -> HealthCheckResult {
        self.health().await
    }
}
