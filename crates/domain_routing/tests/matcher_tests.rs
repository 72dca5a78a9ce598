//! Tests for rule matching
//!
//! Covers determinism, priority ordering, disabled rules and the routing
//! scenarios collaborators rely on.

use chrono::Utc;
use proptest::prelude::*;

use domain_routing::{
    Condition, RuleMatcher, RulePatch, RuleSet, RuleSpec, RuleStore, ScoreBucket, ScoreKind,
};
use test_utils::{
    assert_default_decision, assert_matched, assert_routed_to, rule_spec_strategy,
    score_bundle_strategy, RuleFixtures, ScoreFixtures, TestScoreBundleBuilder,
};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn snapshot_of(specs: Vec<RuleSpec>) -> std::sync::Arc<RuleSet> {
    let store = RuleStore::in_memory();
    for spec in specs {
        store.create(spec).await.unwrap();
    }
    store.snapshot().await
}

// ============================================================================
// Scenarios
// ============================================================================

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn test_fraud_threshold_routes_to_siu() {
        let store = RuleStore::in_memory();
        let rule = store.create(RuleFixtures::siu_threshold(1)).await.unwrap();

        let decision =
            RuleMatcher::default().evaluate(&ScoreFixtures::suspicious_accident(), &*store.snapshot().await);

        assert_routed_to(&decision, "SIU");
        assert_matched(&decision, rule.id);
        assert_eq!(decision.rules_version, 1);
    }

    #[tokio::test]
    async fn test_complexity_boundary_is_inclusive_high() {
        let rules = snapshot_of(vec![RuleFixtures::complexity_high(1)]).await;
        let bundle = TestScoreBundleBuilder::new().with_complexity(3.6).build();

        let decision = RuleMatcher::default().evaluate(&bundle, &rules);
        assert_routed_to(&decision, "Complex Claims");

        let below = TestScoreBundleBuilder::new().with_complexity(3.5).build();
        assert_default_decision(&RuleMatcher::default().evaluate(&below, &rules));
    }

    #[test]
    fn test_empty_rule_set_uses_default() {
        let decision =
            RuleMatcher::default().evaluate(&ScoreFixtures::complex_health(), &RuleSet::default());

        assert_default_decision(&decision);
        assert_routed_to(&decision, "Fast Track");
        assert_eq!(decision.adjuster, "Standard Adjuster");
        assert_eq!(decision.rules_version, 0);
    }

    #[tokio::test]
    async fn test_claim_type_comparison_ignores_case() {
        let rules = snapshot_of(vec![RuleFixtures::claim_type("Health", "Health Dept", 1)]).await;
        let bundle = TestScoreBundleBuilder::new().with_category("HEALTH").build();
        assert_routed_to(&RuleMatcher::default().evaluate(&bundle, &rules), "Health Dept");
    }

    #[tokio::test]
    async fn test_default_rule_set_routes_like_the_standard_queues() {
        let store = RuleStore::in_memory();
        store.seed_defaults().await.unwrap();
        let rules = store.snapshot().await;
        let matcher = RuleMatcher::default();

        assert_routed_to(&matcher.evaluate(&ScoreFixtures::suspicious_accident(), &rules), "SIU (Fraud)");
        assert_routed_to(&matcher.evaluate(&ScoreFixtures::mid_fraud_health(), &rules), "Standard Review");
        assert_routed_to(&matcher.evaluate(&ScoreFixtures::complex_health(), &rules), "Complex Claims");
        assert_routed_to(&matcher.evaluate(&ScoreFixtures::low_risk_accident(), &rules), "Fast Track");
    }
}

// ============================================================================
// Ordering
// ============================================================================

mod ordering {
    use super::*;

    #[tokio::test]
    async fn test_lower_priority_value_wins() {
        let rules = snapshot_of(vec![
            RuleFixtures::claim_type("accident", "Second", 5),
            RuleFixtures::claim_type("accident", "First", 2),
        ])
        .await;

        let decision = RuleMatcher::default().evaluate(&ScoreFixtures::low_risk_accident(), &rules);
        assert_routed_to(&decision, "First");
    }

    #[tokio::test]
    async fn test_equal_priority_prefers_earlier_rule() {
        let rules = snapshot_of(vec![
            RuleFixtures::claim_type("accident", "Earlier", 3),
            RuleFixtures::claim_type("accident", "Later", 3),
        ])
        .await;

        let decision = RuleMatcher::default().evaluate(&ScoreFixtures::low_risk_accident(), &rules);
        assert_routed_to(&decision, "Earlier");
    }

    #[tokio::test]
    async fn test_disabling_only_match_falls_back_to_default() {
        let store = RuleStore::in_memory();
        let rule = store.create(RuleFixtures::complexity_high(1)).await.unwrap();
        let bundle = ScoreFixtures::complex_health();
        let matcher = RuleMatcher::default();

        assert_matched(&matcher.evaluate(&bundle, &*store.snapshot().await), rule.id);

        store.update(rule.id, RulePatch::enabled(false)).await.unwrap();
        assert_default_decision(&matcher.evaluate(&bundle, &*store.snapshot().await));
    }

    #[tokio::test]
    async fn test_combined_condition_needs_every_part() {
        let spec = RuleSpec::new(
            Condition::all_of(vec![
                Condition::score_category(ScoreKind::Severity, ScoreBucket::Mid),
                Condition::score_category(ScoreKind::Complexity, ScoreBucket::High),
            ]),
            "Complex Claims",
            "Senior Adjuster",
        );
        let rules = snapshot_of(vec![spec]).await;
        let matcher = RuleMatcher::default();

        assert_routed_to(&matcher.evaluate(&ScoreFixtures::complex_health(), &rules), "Complex Claims");
        let low_severity = TestScoreBundleBuilder::new().with_complexity(4.0).build();
        assert_default_decision(&matcher.evaluate(&low_severity, &rules));
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn evaluation_is_deterministic(
        specs in prop::collection::vec(rule_spec_strategy(), 0..8),
        bundle in score_bundle_strategy(),
    ) {
        let rules = runtime().block_on(snapshot_of(specs));
        let matcher = RuleMatcher::default();
        let at = Utc::now();

        let first = matcher.evaluate_at(&bundle, &rules, at);
        let second = matcher.evaluate_at(&bundle, &rules, at);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn winner_is_first_enabled_match_in_order(
        specs in prop::collection::vec(rule_spec_strategy(), 1..8),
        bundle in score_bundle_strategy(),
    ) {
        let rules = runtime().block_on(snapshot_of(specs));
        let matcher = RuleMatcher::default();
        let decision = matcher.evaluate(&bundle, &rules);

        match decision.matched_rule_id {
            Some(id) => {
                let winner = rules.get(id).unwrap();
                prop_assert!(winner.enabled);
                // Nothing earlier in evaluation order also matched.
                for rule in rules.iter().take_while(|r| r.id != id) {
                    let single = RuleSet::from_rules(rules.version(), vec![rule.clone()]);
                    prop_assert!(matcher.find_match(&bundle, &single).is_none());
                }
            }
            None => {
                for rule in rules.iter() {
                    let single = RuleSet::from_rules(rules.version(), vec![rule.clone()]);
                    prop_assert!(matcher.find_match(&bundle, &single).is_none());
                }
            }
        }
    }
}
