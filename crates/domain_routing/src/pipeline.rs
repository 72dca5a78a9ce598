//! Reactive Pipeline
//!
//! Push-based reprocessing: the pipeline subscribes to the rule store's
//! change feed and, for every `RuleSetChanged`, re-evaluates ledger entries
//! whose decision predates the new version.
//!
//! # States
//!
//! ```text
//!            start (feed ok)
//!   Stopped ─────────────────▶ Running
//!      │  ▲                      │
//!      │  │ shutdown             │ feed closed
//!      │  └──────────────────────┤
//!      │    start (no feed)      ▼
//!      └───────────────────▶ Degraded
//! ```
//!
//! In `Degraded` the same `recompute` and `recompute_all` operations are
//! available but nothing runs on its own. Matching is identical in every
//! state.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{RoutingError, RoutingResult};
use crate::events::{ClaimRerouted, RerouteCause, RuleSetChanged};
use crate::matcher::RoutingDecision;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::score::ScoreBundle;

/// How long shutdown waits for an in-flight reconciliation
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle state of a routing engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Stopped,
    Running,
    Degraded,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineState::Stopped => "stopped",
            PipelineState::Running => "running",
            PipelineState::Degraded => "degraded",
        };
        f.write_str(s)
    }
}

/// Capability shared by the push pipeline and the pull-only fallback
///
/// Callers pick one implementation at startup and never branch on which.
#[async_trait]
pub trait ReactiveEngine: Send + Sync {
    fn state(&self) -> PipelineState;

    /// True when decisions are kept current by the change feed
    fn pathway_processed(&self) -> bool {
        self.state() == PipelineState::Running
    }

    /// Routes a claim and records the decision
    async fn evaluate(&self, claim_id: &str, bundle: ScoreBundle)
        -> RoutingResult<RoutingDecision>;

    /// Re-evaluates one recorded claim from its retained bundle
    async fn recompute(&self, claim_id: &str) -> RoutingResult<RoutingDecision>;

    /// Re-evaluates every claim whose decision predates the current rules
    async fn recompute_all(&self) -> ReconcileReport;

    /// Waits until reconciliation has reached `version`
    ///
    /// Returns false on timeout or when the engine does not reconcile on
    /// its own.
    async fn wait_reconciled(&self, version: u64, timeout: Duration) -> bool;

    fn subscribe_reroutes(&self) -> broadcast::Receiver<ClaimRerouted>;

    async fn shutdown(&self);
}

/// Push-based engine driven by the rule store's change feed
pub struct ReactivePipeline {
    reconciler: Reconciler,
    state: Arc<watch::Sender<PipelineState>>,
    /// Last rule-set version fully reconciled
    cursor: Arc<watch::Sender<u64>>,
    stop: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ReactivePipeline {
    pub fn new(reconciler: Reconciler) -> Self {
        let (state, _) = watch::channel(PipelineState::Stopped);
        let (cursor, _) = watch::channel(0);
        let (stop, _) = watch::channel(false);
        Self {
            reconciler,
            state: Arc::new(state),
            cursor: Arc::new(cursor),
            stop,
            task: Mutex::new(None),
        }
    }

    /// Last reconciled rule-set version
    pub fn cursor(&self) -> u64 {
        *self.cursor.borrow()
    }

    /// Observes state transitions
    pub fn watch_state(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    /// Subscribes to rule changes and starts the reconciliation loop
    ///
    /// When the change feed cannot be subscribed to, the pipeline moves to
    /// `Degraded` instead of failing. Starting from any state other than
    /// `Stopped` is an error.
    pub async fn start(&self) -> RoutingResult<PipelineState> {
        let mut task = self.task.lock().await;
        let current = *self.state.borrow();
        if current != PipelineState::Stopped {
            return Err(RoutingError::InvalidStateTransition {
                from: current.to_string(),
                to: PipelineState::Running.to_string(),
            });
        }

        let store = self.reconciler.store();
        let changes = match store.subscribe() {
            Ok(rx) => rx,
            Err(e) => {
                warn!(error = %e, "Rule change feed unavailable; routing pipeline degraded");
                self.state.send_replace(PipelineState::Degraded);
                return Ok(PipelineState::Degraded);
            }
        };

        // Catch up on anything routed before the subscription existed.
        let version = store.current_version().await;
        self.reconciler
            .reconcile_stale(version, RerouteCause::RuleChange)
            .await;
        self.cursor.send_replace(version);

        self.stop.send_replace(false);
        self.state.send_replace(PipelineState::Running);
        info!(version, state = %PipelineState::Running, "Routing pipeline started");

        let worker = Worker {
            reconciler: self.reconciler.clone(),
            state: self.state.clone(),
            cursor: self.cursor.clone(),
        };
        *task = Some(tokio::spawn(worker.run(changes, self.stop.subscribe())));
        Ok(PipelineState::Running)
    }
}

#[async_trait]
impl ReactiveEngine for ReactivePipeline {
    fn state(&self) -> PipelineState {
        *self.state.borrow()
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

    async fn wait_reconciled(&self, version: u64, timeout: Duration) -> bool {
        if self.state() != PipelineState::Running {
            return false;
        }
        let mut cursor = self.cursor.subscribe();
        let reached = matches!(
            tokio::time::timeout(timeout, cursor.wait_for(|c| *c >= version)).await,
            Ok(Ok(_))
        );
        reached
    }

    fn subscribe_reroutes(&self) -> broadcast::Receiver<ClaimRerouted> {
        self.reconciler.subscribe_reroutes()
    }

    /// Stops the loop, letting an in-flight reconciliation finish
    async fn shutdown(&self) {
        let handle = self.task.lock().await.take();
        self.stop.send_replace(true);

        if let Some(mut handle) = handle {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut handle).await.is_err() {
                warn!("Routing pipeline did not stop in time; aborting");
                handle.abort();
            }
        }

        let previous = self.state.send_replace(PipelineState::Stopped);
        if previous != PipelineState::Stopped {
            info!(from = %previous, state = %PipelineState::Stopped, "Routing pipeline stopped");
        }
    }
}

/// State moved into the background task
struct Worker {
    reconciler: Reconciler,
    state: Arc<watch::Sender<PipelineState>>,
    cursor: Arc<watch::Sender<u64>>,
}

impl Worker {
    async fn run(
        self,
        mut changes: broadcast::Receiver<RuleSetChanged>,
        mut stop: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        debug!("Routing pipeline loop stopping");
                        break;
                    }
                }
                received = changes.recv() => match received {
                    Ok(event) => {
                        debug!(version = event.version, kind = ?event.kind, "Rule change received");
                        self.reconcile_to(event.version).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Rule change feed lagged; reconciling against current rules");
                        let version = self.reconciler.store().current_version().await;
                        self.reconcile_to(version).await;
                    }
                    Err(RecvError::Closed) => {
                        warn!("Rule change feed closed; routing pipeline degraded");
                        self.state.send_replace(PipelineState::Degraded);
                        break;
                    }
                },
            }
        }
    }

    async fn reconcile_to(&self, version: u64) {
        if version <= *self.cursor.borrow() {
            return;
        }
        self.reconciler
            .reconcile_stale(version, RerouteCause::RuleChange)
            .await;
        self.cursor.send_modify(|c| *c = (*c).max(version));
    }
}
