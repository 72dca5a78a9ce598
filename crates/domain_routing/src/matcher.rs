//! Rule matching
//!
//! Evaluation walks a rule-set snapshot in (priority, creation) order,
//! skips disabled rules and stops at the first rule whose condition holds.
//! When nothing matches, the statically configured default assignment is
//! returned with no matched rule.
//!
//! `evaluate_at` is a pure function of its inputs, which makes decisions
//! replayable for audit: the same bundle against the same rule-set version
//! always yields the same decision.
//!
//! # Example
//!
//! ```rust,ignore
//! let matcher = RuleMatcher::new(RouterDefaults::default());
//! let snapshot = store.snapshot().await;
//! let decision = matcher.evaluate(&bundle, &snapshot);
//! println!("{} / {}", decision.routing_team, decision.adjuster);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use core_kernel::RuleId;

use crate::categorizer::CategorizedScores;
use crate::rule::{Condition, Rule, ThresholdKind};
use crate::score::ScoreBundle;
use crate::store::RuleSet;

/// Assignment used when no rule matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterDefaults {
    pub team: String,
    pub adjuster: String,
}

impl Default for RouterDefaults {
    fn default() -> Self {
        Self {
            team: "Fast Track".to_string(),
            adjuster: "Standard Adjuster".to_string(),
        }
    }
}

/// Outcome of evaluating one score bundle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingDecision {
    /// Rule that matched, or `None` for the default assignment
    pub matched_rule_id: Option<RuleId>,
    pub routing_team: String,
    pub adjuster: String,
    /// Rule-set version the decision was computed against
    pub rules_version: u64,
    pub evaluated_at: DateTime<Utc>,
    /// Human readable explanation
    pub reason: String,
}

impl RoutingDecision {
    /// True when both decisions send the claim to the same place
    pub fn same_assignment(&self, other: &RoutingDecision) -> bool {
        self.routing_team == other.routing_team && self.adjuster == other.adjuster
    }

    /// True when both decisions are identical apart from evaluation time
    pub fn same_outcome(&self, other: &RoutingDecision) -> bool {
        self.matched_rule_id == other.matched_rule_id
            && self.same_assignment(other)
            && self.rules_version == other.rules_version
            && self.reason == other.reason
    }

    pub fn is_default(&self) -> bool {
        self.matched_rule_id.is_none()
    }
}

/// Selects the highest-priority enabled rule matching a score bundle
#[derive(Debug, Clone, Default)]
pub struct RuleMatcher {
    defaults: RouterDefaults,
}

impl RuleMatcher {
    pub fn new(defaults: RouterDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &RouterDefaults {
        &self.defaults
    }

    /// Evaluates `bundle` against `rules`, stamping the current time
    pub fn evaluate(&self, bundle: &ScoreBundle, rules: &RuleSet) -> RoutingDecision {
        self.evaluate_at(bundle, rules, Utc::now())
    }

    /// Evaluates `bundle` against `rules` with an explicit evaluation time
    pub fn evaluate_at(
        &self,
        bundle: &ScoreBundle,
        rules: &RuleSet,
        evaluated_at: DateTime<Utc>,
    ) -> RoutingDecision {
        let decision = match self.find_match(bundle, rules) {
            Some(rule) => RoutingDecision {
                matched_rule_id: Some(rule.id),
                routing_team: rule.routing_team.clone(),
                adjuster: rule.adjuster.clone(),
                rules_version: rules.version(),
                evaluated_at,
                reason: format!("Matched rule '{}' ({})", rule.label(), rule.condition),
            },
            None => RoutingDecision {
                matched_rule_id: None,
                routing_team: self.defaults.team.clone(),
                adjuster: self.defaults.adjuster.clone(),
                rules_version: rules.version(),
                evaluated_at,
                reason: "No rule matched; default assignment".to_string(),
            },
        };

        debug!(
            rules_version = decision.rules_version,
            matched = ?decision.matched_rule_id,
            team = %decision.routing_team,
            "Evaluated routing rules"
        );
        decision
    }

    /// Returns the first enabled rule, in evaluation order, whose condition holds
    pub fn find_match<'a>(&self, bundle: &ScoreBundle, rules: &'a RuleSet) -> Option<&'a Rule> {
        let categorized = CategorizedScores::from_bundle(bundle);
        rules
            .iter()
            .filter(|rule| rule.enabled)
            .find(|rule| condition_holds(&rule.condition, bundle, &categorized))
    }
}

/// Tests one condition against raw and categorized scores
pub fn condition_holds(
    condition: &Condition,
    bundle: &ScoreBundle,
    categorized: &CategorizedScores,
) -> bool {
    match condition {
        Condition::ScoreCategory { kind, bucket } => categorized.get(*kind) == *bucket,
        Condition::ClaimType { category } => bundle.is_category(category),
        Condition::Threshold {
            kind: ThresholdKind::Fraud,
            operator,
            value,
        } => operator.compare(bundle.fraud_score, *value),
        Condition::Combined { conditions } => conditions
            .iter()
            .all(|c| condition_holds(c, bundle, categorized)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::{ScoreBucket, ScoreKind};
    use crate::rule::ThresholdOperator;
    use crate::score::SeverityLevel;

    fn rule(priority: i64, sequence: u64, condition: Condition, team: &str) -> Rule {
        let now = Utc::now();
        Rule {
            id: RuleId::new_v7(),
            name: Some(team.to_string()),
            description: None,
            priority,
            enabled: true,
            condition,
            routing_team: team.to_string(),
            adjuster: format!("{} Adjuster", team),
            sequence,
            created_at: now,
            updated_at: now,
        }
    }

    fn bundle(fraud: f64, complexity: f64) -> ScoreBundle {
        ScoreBundle::new(fraud, complexity, SeverityLevel::Low, "accident")
    }

    #[test]
    fn test_threshold_uses_raw_score() {
        let rules = RuleSet::from_rules(
            3,
            vec![rule(
                1,
                0,
                Condition::fraud_threshold(ThresholdOperator::Gte, 0.6),
                "SIU",
            )],
        );
        let matcher = RuleMatcher::default();

        let decision = matcher.evaluate(&bundle(0.65, 1.0), &rules);
        assert_eq!(decision.routing_team, "SIU");
        assert_eq!(decision.rules_version, 3);
        assert!(decision.reason.contains("SIU"));

        let below = matcher.evaluate(&bundle(0.59, 1.0), &rules);
        assert!(below.is_default());
    }

    #[test]
    fn test_combined_requires_every_condition() {
        let combined = Condition::all_of(vec![
            Condition::score_category(ScoreKind::Fraud, ScoreBucket::Mid),
            Condition::claim_type("health"),
        ]);
        let rules = RuleSet::from_rules(1, vec![rule(5, 0, combined, "Standard Review")]);
        let matcher = RuleMatcher::default();

        let accident = matcher.evaluate(&bundle(0.5, 1.0), &rules);
        assert!(accident.is_default());

        let health = ScoreBundle::new(0.5, 1.0, SeverityLevel::Low, "health");
        assert_eq!(matcher.evaluate(&health, &rules).routing_team, "Standard Review");
    }

    #[test]
    fn test_short_circuits_on_first_match() {
        let rules = RuleSet::from_rules(
            1,
            vec![
                rule(10, 1, Condition::claim_type("accident"), "Second"),
                rule(1, 0, Condition::claim_type("accident"), "First"),
            ],
        );
        let decision = RuleMatcher::default().evaluate(&bundle(0.1, 1.0), &rules);
        assert_eq!(decision.routing_team, "First");
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let mut only = rule(1, 0, Condition::claim_type("accident"), "Accident Dept");
        only.enabled = false;
        let rules = RuleSet::from_rules(2, vec![only]);

        let matcher = RuleMatcher::new(RouterDefaults {
            team: "Triage".to_string(),
            adjuster: "Duty Adjuster".to_string(),
        });
        let decision = matcher.evaluate(&bundle(0.1, 1.0), &rules);
        assert!(decision.is_default());
        assert_eq!(decision.routing_team, "Triage");
        assert_eq!(decision.adjuster, "Duty Adjuster");
    }

    #[test]
    fn test_evaluate_at_is_pure() {
        let rules = RuleSet::from_rules(
            4,
            vec![rule(
                1,
                0,
                Condition::score_category(ScoreKind::Complexity, ScoreBucket::High),
                "Complex Claims",
            )],
        );
        let at = Utc::now();
        let matcher = RuleMatcher::default();
        let first = matcher.evaluate_at(&bundle(0.1, 3.6), &rules, at);
        let second = matcher.evaluate_at(&bundle(0.1, 3.6), &rules, at);
        assert_eq!(first, second);
        assert_eq!(first.routing_team, "Complex Claims");
    }
}
