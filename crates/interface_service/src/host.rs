//! Engine bootstrap and the background monitor

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use core_kernel::AdapterHealth;
use domain_routing::{
    ClaimRerouted, InMemoryRulePersistence, JsonFileRulePersistence, RoutingService,
    RulePersistence, RuleStore,
};

use crate::config::RoutingConfig;
use crate::error::ServiceError;

/// Opens the rule store and starts the configured engine
///
/// Rules are persisted to `rules_file` when one is configured and held in
/// memory otherwise. An empty store is seeded with the standard rules when
/// `seed_default_rules` is set.
pub async fn build_service(config: &RoutingConfig) -> Result<RoutingService, ServiceError> {
    let persistence: Arc<dyn RulePersistence> = match &config.rules_file {
        Some(path) => Arc::new(JsonFileRulePersistence::new(path)),
        None => Arc::new(InMemoryRulePersistence::new()),
    };
    let store = RuleStore::open(persistence, config.event_buffer).await?;

    if config.seed_default_rules {
        store.seed_defaults().await?;
    }

    let service = RoutingService::builder()
        .store(Arc::new(store))
        .defaults(config.router_defaults())
        .engine(config.engine)
        .pipeline(config.pipeline())
        .build()
        .await?;

    info!(
        engine = %config.engine,
        mode = %service.mode(),
        rules = service.list_rules().await.len(),
        version = service.store().current_version().await,
        "Routing engine ready"
    );
    Ok(service)
}

/// Counters reported when the monitor stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonitorSummary {
    pub reroutes: u64,
    pub missed_reroutes: u64,
    pub health_checks: u64,
}

/// Background task that logs reroute notifications and periodic health
///
/// Reroutes are logged as they arrive. With a health interval configured,
/// the engine's health is logged on every tick and whenever it changes.
pub struct EngineMonitor {
    service: RoutingService,
    health_interval: Option<Duration>,
}

impl EngineMonitor {
    pub fn new(service: RoutingService, health_interval: Option<Duration>) -> Self {
        Self {
            service,
            health_interval,
        }
    }

    /// Runs until `stop` flips to true or its sender is dropped
    pub async fn run(self, mut stop: watch::Receiver<bool>) -> MonitorSummary {
        let mut summary = MonitorSummary::default();
        let mut reroutes = self.service.subscribe_reroutes();
        let mut ticker = interval(self.health_interval.unwrap_or(Duration::from_secs(3600)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_status: Option<AdapterHealth> = None;

        info!(health_interval = ?self.health_interval, "Engine monitor started");

        loop {
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                received = reroutes.recv() => match received {
                    Ok(event) => {
                        summary.reroutes += 1;
                        log_reroute(&event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        summary.missed_reroutes += skipped;
                        warn!(skipped, "Reroute notifications dropped");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Reroute channel closed");
                        break;
                    }
                },
                _ = ticker.tick(), if self.health_interval.is_some() => {
                    summary.health_checks += 1;
                    let health = self.service.health().await;
                    if last_status != Some(health.status) {
                        info!(
                            status = ?health.status,
                            message = health.message.as_deref().unwrap_or(""),
                            "Routing engine health changed"
                        );
                        last_status = Some(health.status);
                    } else {
                        debug!(status = ?health.status, "Routing engine health");
                    }
                }
            }
        }

        info!(
            reroutes = summary.reroutes,
            missed = summary.missed_reroutes,
            health_checks = summary.health_checks,
            "Engine monitor stopped"
        );
        summary
    }
}

fn log_reroute(event: &ClaimRerouted) {
    info!(
        claim_id = %event.claim_id,
        cause = ?event.cause,
        from_team = %event.old_decision.routing_team,
        to_team = %event.new_decision.routing_team,
        from_adjuster = %event.old_decision.adjuster,
        to_adjuster = %event.new_decision.adjuster,
        rules_version = event.new_decision.rules_version,
        "Claim rerouted"
    );
}
