//! Property-Based Test Generators
//!
//! Proptest strategies for score bundles, conditions and rule specs.

use proptest::prelude::*;

use domain_routing::{
    Condition, RuleSpec, ScoreBucket, ScoreBundle, ScoreKind, SeverityLevel, ThresholdOperator,
};

pub fn severity_strategy() -> impl Strategy<Value = SeverityLevel> {
    prop_oneof![
        Just(SeverityLevel::Low),
        Just(SeverityLevel::Medium),
        Just(SeverityLevel::High),
    ]
}

pub fn bucket_strategy() -> impl Strategy<Value = ScoreBucket> {
    prop_oneof![
        Just(ScoreBucket::Low),
        Just(ScoreBucket::Mid),
        Just(ScoreBucket::High),
    ]
}

pub fn score_kind_strategy() -> impl Strategy<Value = ScoreKind> {
    prop_oneof![
        Just(ScoreKind::Fraud),
        Just(ScoreKind::Severity),
        Just(ScoreKind::Complexity),
    ]
}

pub fn operator_strategy() -> impl Strategy<Value = ThresholdOperator> {
    prop_oneof![
        Just(ThresholdOperator::Gte),
        Just(ThresholdOperator::Gt),
        Just(ThresholdOperator::Lte),
        Just(ThresholdOperator::Lt),
    ]
}

pub fn category_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("accident".to_string()),
        Just("health".to_string()),
        Just("property".to_string()),
    ]
}

/// Finite bundles, including mildly out-of-range scores
pub fn score_bundle_strategy() -> impl Strategy<Value = ScoreBundle> {
    (
        -0.1f64..1.1,
        0.0f64..6.0,
        severity_strategy(),
        category_strategy(),
    )
        .prop_map(|(fraud, complexity, severity, category)| {
            ScoreBundle::new(fraud, complexity, severity, category)
        })
}

/// Single, non-combined condition
pub fn leaf_condition_strategy() -> impl Strategy<Value = Condition> {
    prop_oneof![
        (score_kind_strategy(), bucket_strategy())
            .prop_map(|(kind, bucket)| Condition::score_category(kind, bucket)),
        category_strategy().prop_map(Condition::claim_type),
        (operator_strategy(), 0.0f64..=1.0)
            .prop_map(|(op, value)| Condition::fraud_threshold(op, value)),
    ]
}

/// Leaf or a conjunction of up to three leaves
pub fn condition_strategy() -> impl Strategy<Value = Condition> {
    prop_oneof![
        3 => leaf_condition_strategy(),
        1 => prop::collection::vec(leaf_condition_strategy(), 1..4).prop_map(Condition::all_of),
    ]
}

/// Valid rule spec with an explicit priority in `0..10`
pub fn rule_spec_strategy() -> impl Strategy<Value = RuleSpec> {
    (condition_strategy(), 0i64..10, any::<bool>(), 0usize..4).prop_map(
        |(condition, priority, enabled, team)| {
            let teams = ["Fast Track", "Standard Review", "Complex Claims", "SIU (Fraud)"];
            let mut spec = RuleSpec::new(condition, teams[team], "Adjuster").with_priority(priority);
            spec.enabled = enabled;
            spec
        },
    )
}
