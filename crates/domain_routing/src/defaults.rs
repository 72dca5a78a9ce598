//! Standard rule set
//!
//! The ten rules a fresh deployment starts with. Fraud screening comes
//! first, then severity and complexity escalation per claim category, then
//! mid-fraud review, and finally a catch-all fast track for low fraud.

use crate::categorizer::{ScoreBucket, ScoreKind};
use crate::rule::{Condition, RuleSpec, ThresholdOperator};

const SIU_TEAM: &str = "SIU (Fraud)";
const SIU_ADJUSTER: &str = "SIU Investigator";
const COMPLEX_TEAM: &str = "Complex Claims";
const SENIOR_ADJUSTER: &str = "Senior Adjuster";
const REVIEW_TEAM: &str = "Standard Review";
const STANDARD_ADJUSTER: &str = "Standard Adjuster";

fn per_category(
    name: &str,
    description: &str,
    priority: i64,
    (kind, bucket): (ScoreKind, ScoreBucket),
    category: &str,
    team: &str,
    adjuster: &str,
) -> RuleSpec {
    let condition = Condition::all_of(vec![
        Condition::score_category(kind, bucket),
        Condition::claim_type(category),
    ]);
    RuleSpec::new(condition, team, adjuster)
        .named(name)
        .described(description)
        .with_priority(priority)
}

/// Returns the standard rule specs in creation order
pub fn default_rules() -> Vec<RuleSpec> {
    use ScoreBucket::{High, Low, Mid};
    use ScoreKind::{Complexity, Fraud, Severity};

    vec![
        RuleSpec::new(
            Condition::fraud_threshold(ThresholdOperator::Gte, 0.6),
            SIU_TEAM,
            SIU_ADJUSTER,
        )
        .named("High Fraud - All Categories")
        .described("Route high fraud claims to SIU team")
        .with_priority(1),
        per_category(
            "High Fraud - Vehicle",
            "Route high fraud vehicle claims",
            2,
            (Fraud, High),
            "accident",
            SIU_TEAM,
            SIU_ADJUSTER,
        ),
        per_category(
            "High Fraud - Health",
            "Route high fraud health claims",
            2,
            (Fraud, High),
            "health",
            SIU_TEAM,
            SIU_ADJUSTER,
        ),
        per_category(
            "High Severity - Vehicle",
            "Route high severity vehicle claims to Complex Claims",
            10,
            (Severity, High),
            "accident",
            COMPLEX_TEAM,
            SENIOR_ADJUSTER,
        ),
        per_category(
            "High Severity - Health",
            "Route high severity health claims to Complex Claims",
            10,
            (Severity, High),
            "health",
            COMPLEX_TEAM,
            SENIOR_ADJUSTER,
        ),
        per_category(
            "High Complexity - Vehicle",
            "Route high complexity vehicle claims",
            15,
            (Complexity, High),
            "accident",
            COMPLEX_TEAM,
            SENIOR_ADJUSTER,
        ),
        per_category(
            "High Complexity - Health",
            "Route high complexity health claims",
            15,
            (Complexity, High),
            "health",
            COMPLEX_TEAM,
            SENIOR_ADJUSTER,
        ),
        per_category(
            "Mid Fraud - Vehicle",
            "Route mid fraud vehicle claims",
            20,
            (Fraud, Mid),
            "accident",
            REVIEW_TEAM,
            STANDARD_ADJUSTER,
        ),
        per_category(
            "Mid Fraud - Health",
            "Route mid fraud health claims",
            20,
            (Fraud, Mid),
            "health",
            REVIEW_TEAM,
            STANDARD_ADJUSTER,
        ),
        RuleSpec::new(
            Condition::score_category(Fraud, Low),
            "Fast Track",
            STANDARD_ADJUSTER,
        )
        .named("Low Risk - Default")
        .described("Default routing for low risk claims")
        .with_priority(100),
    ]
}
