//! Claims Routing Domain
//!
//! Routes insurance claims to handling teams by evaluating a claim's score
//! bundle against a prioritized, versioned set of rules, and keeps already
//! routed claims current when the rules change.
//!
//! # Components
//!
//! - **Categorizer**: maps raw scores to low/mid/high buckets
//! - **Rule Store**: owns the rules and the version counter, publishes changes
//! - **Rule Matcher**: picks the first enabled matching rule
//! - **Routing Ledger**: last decision and retained bundle per claim
//! - **Reactive Pipeline**: reconciles stale ledger entries on every change
//! - **Fallback Router**: the same contract, recomputing only on request
//!
//! # Examples
//!
//! ```rust
//! use domain_routing::{
//!     Condition, RuleMatcher, RuleSet, ScoreBundle, SeverityLevel, ThresholdOperator,
//! };
//!
//! let rules = RuleSet::default();
//! let bundle = ScoreBundle::new(0.65, 1.0, SeverityLevel::Low, "accident");
//!
//! // No rules: the default assignment applies
//! let decision = RuleMatcher::default().evaluate(&bundle, &rules);
//! assert!(decision.matched_rule_id.is_none());
//! assert_eq!(decision.routing_team, "Fast Track");
//!
//! let siu = Condition::fraud_threshold(ThresholdOperator::Gte, 0.6);
//! assert!(siu.check().is_ok());
//! ```

pub mod adapters;
pub mod attributes;
pub mod categorizer;
pub mod defaults;
pub mod error;
pub mod events;
pub mod fallback;
pub mod ledger;
pub mod legacy;
pub mod matcher;
pub mod pipeline;
pub mod ports;
pub mod reconcile;
pub mod rule;
pub mod score;
pub mod service;
pub mod store;

pub use adapters::{InMemoryRulePersistence, JsonFileRulePersistence};
pub use attributes::RuleAttributes;
pub use categorizer::{categorize, CategorizedScores, ScoreBucket, ScoreKind};
pub use defaults::default_rules;
pub use error::{RoutingError, RoutingResult};
pub use events::{ClaimRerouted, RerouteCause, RuleChangeKind, RuleSetChanged};
pub use fallback::FallbackRouter;
pub use ledger::{LedgerEntry, RerouteRecord, RoutingLedger, StaleEntries};
pub use legacy::LegacyRuleSpec;
pub use matcher::{RouterDefaults, RoutingDecision, RuleMatcher};
pub use pipeline::{PipelineState, ReactiveEngine, ReactivePipeline};
pub use ports::RulePersistence;
pub use reconcile::{EntryOutcome, ReconcileReport, Reconciler};
pub use rule::{Condition, Rule, RulePatch, RuleSpec, ThresholdKind, ThresholdOperator};
pub use score::{ScoreBundle, SeverityLevel};
pub use service::{
    EngineKind, PipelineConfig, RerouteRequest, RoutedDecision, RoutingService,
    RoutingServiceBuilder,
};
pub use store::{RuleSet, RuleStore};
