//! Catalog of values offered to rule authors

use serde::{Deserialize, Serialize};

use crate::categorizer::ScoreBucket;
use crate::legacy::LegacyConditionType;
use crate::rule::ThresholdOperator;

/// Teams a rule can route to out of the box
pub const KNOWN_TEAMS: [&str; 8] = [
    "Fast Track",
    "Standard Review",
    "Complex Claims",
    "SIU (Fraud)",
    "Litigation",
    "Subrogation",
    "Total Loss",
    "Bodily Injury",
];

/// Claim categories the upstream scorer produces
pub const KNOWN_CLAIM_TYPES: [&str; 2] = ["accident", "health"];

/// Options available when authoring a rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleAttributes {
    pub condition_types: Vec<String>,
    pub condition_values: Vec<String>,
    pub claim_types: Vec<String>,
    pub operators: Vec<String>,
    pub teams: Vec<String>,
}

impl RuleAttributes {
    pub fn catalog() -> Self {
        let condition_values = ScoreBucket::ALL
            .iter()
            .map(|b| b.as_str())
            .chain(KNOWN_CLAIM_TYPES)
            .map(String::from)
            .collect();

        Self {
            condition_types: LegacyConditionType::ALL
                .iter()
                .map(|t| t.as_str().to_string())
                .collect(),
            condition_values,
            claim_types: KNOWN_CLAIM_TYPES.iter().map(|s| s.to_string()).collect(),
            operators: ThresholdOperator::ALL
                .iter()
                .map(|op| op.symbol().to_string())
                .collect(),
            teams: KNOWN_TEAMS.iter().map(|s| s.to_string()).collect(),
        }
    }
}
