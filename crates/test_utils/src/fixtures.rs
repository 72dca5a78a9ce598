//! Pre-built Test Fixtures
//!
//! Consistent, predictable score bundles, rule specs and service setups.

use std::sync::Arc;
use std::time::Duration;

use domain_routing::{
    Condition, EngineKind, PipelineConfig, RoutingService, RuleSpec, RuleStore, ScoreBucket,
    ScoreBundle, ScoreKind, SeverityLevel, ThresholdOperator,
};

/// Fixture for score bundles
pub struct ScoreFixtures;

impl ScoreFixtures {
    /// Low fraud, low complexity accident claim
    pub fn low_risk_accident() -> ScoreBundle {
        ScoreBundle::new(0.10, 1.2, SeverityLevel::Low, "accident")
    }

    /// Fraud score just over the SIU threshold
    pub fn suspicious_accident() -> ScoreBundle {
        ScoreBundle::new(0.65, 1.5, SeverityLevel::Low, "accident")
    }

    /// Mid fraud health claim
    pub fn mid_fraud_health() -> ScoreBundle {
        ScoreBundle::new(0.50, 1.0, SeverityLevel::Low, "health")
    }

    /// Complexity exactly on the lower edge of the high bucket
    pub fn complex_health() -> ScoreBundle {
        ScoreBundle::new(0.20, 3.6, SeverityLevel::Medium, "health")
    }

    /// Bundle with a score that can no longer be evaluated
    pub fn corrupted() -> ScoreBundle {
        let mut bundle = Self::low_risk_accident();
        bundle.fraud_score = f64::NAN;
        bundle
    }
}

/// Fixture for rule specs
pub struct RuleFixtures;

impl RuleFixtures {
    /// Fraud score >= 0.6 goes to SIU
    pub fn siu_threshold(priority: i64) -> RuleSpec {
        RuleSpec::new(
            Condition::fraud_threshold(ThresholdOperator::Gte, 0.6),
            "SIU",
            "SIU Investigator",
        )
        .named("High Fraud")
        .with_priority(priority)
    }

    /// High complexity goes to Complex Claims
    pub fn complexity_high(priority: i64) -> RuleSpec {
        RuleSpec::new(
            Condition::score_category(ScoreKind::Complexity, ScoreBucket::High),
            "Complex Claims",
            "Senior Adjuster",
        )
        .named("High Complexity")
        .with_priority(priority)
    }

    /// Every claim of `category` goes to `team`
    pub fn claim_type(category: &str, team: &str, priority: i64) -> RuleSpec {
        RuleSpec::new(Condition::claim_type(category), team, "Standard Adjuster")
            .named(format!("{} claims", category))
            .with_priority(priority)
    }
}

/// Fixture for claim identifiers
pub struct ClaimFixtures;

impl ClaimFixtures {
    pub fn claim_id(n: usize) -> String {
        format!("CLM-{:05}", n)
    }
}

/// Fixture for fully wired routing services
pub struct ServiceFixtures;

impl ServiceFixtures {
    /// Pipeline settings with a short reconcile wait
    pub fn pipeline_config() -> PipelineConfig {
        PipelineConfig {
            event_buffer: 64,
            reconcile_timeout: Duration::from_secs(2),
        }
    }

    /// Running reactive service over an empty in-memory store
    pub async fn reactive() -> RoutingService {
        Self::build(Arc::new(RuleStore::in_memory()), EngineKind::Reactive).await
    }

    /// Fallback service over an empty in-memory store
    pub async fn fallback() -> RoutingService {
        Self::build(Arc::new(RuleStore::in_memory()), EngineKind::Fallback).await
    }

    /// Reactive service whose store has no change feed
    pub async fn degraded() -> RoutingService {
        Self::build(
            Arc::new(RuleStore::in_memory().without_change_feed()),
            EngineKind::Reactive,
        )
        .await
    }

    pub async fn build(store: Arc<RuleStore>, engine: EngineKind) -> RoutingService {
        RoutingService::builder()
            .store(store)
            .engine(engine)
            .pipeline(Self::pipeline_config())
            .build()
            .await
            .expect("routing service should build")
    }
}
