//! Score categorization
//!
//! Maps raw scores to ordinal buckets with fixed thresholds:
//!
//! | score            | low     | mid          | high    |
//! |------------------|---------|--------------|---------|
//! | fraud_score      | <= 0.33 | (0.33, 0.67] | > 0.67  |
//! | complexity_score | <= 2.0  | (2.0, 3.5]   | > 3.5   |
//! | severity_level   | Low     | Medium       | High    |
//!
//! Boundaries belong to the lower bucket. Out-of-range values clamp to the
//! nearest bucket, so there is no error path.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::score::{ScoreBundle, SeverityLevel};

/// Upper bound (inclusive) of the low fraud bucket
pub const FRAUD_LOW_MAX: f64 = 0.33;
/// Upper bound (inclusive) of the mid fraud bucket
pub const FRAUD_MID_MAX: f64 = 0.67;
/// Upper bound (inclusive) of the low complexity bucket
pub const COMPLEXITY_LOW_MAX: f64 = 2.0;
/// Upper bound (inclusive) of the mid complexity bucket
pub const COMPLEXITY_MID_MAX: f64 = 3.5;

/// Ordinal bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBucket {
    Low,
    Mid,
    High,
}

impl ScoreBucket {
    /// All buckets in ascending order
    pub const ALL: [ScoreBucket; 3] = [ScoreBucket::Low, ScoreBucket::Mid, ScoreBucket::High];

    /// Lowercase name used in rule specs
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBucket::Low => "low",
            ScoreBucket::Mid => "mid",
            ScoreBucket::High => "high",
        }
    }

    /// Parses a bucket name (`medium` is accepted for `mid`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(ScoreBucket::Low),
            "mid" | "medium" => Some(ScoreBucket::Mid),
            "high" => Some(ScoreBucket::High),
            _ => None,
        }
    }
}

impl fmt::Display for ScoreBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which score a category condition looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Fraud,
    Severity,
    Complexity,
}

impl ScoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreKind::Fraud => "fraud",
            ScoreKind::Severity => "severity",
            ScoreKind::Complexity => "complexity",
        }
    }
}

impl fmt::Display for ScoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buckets the fraud score
pub fn categorize_fraud(score: f64) -> ScoreBucket {
    if score <= FRAUD_LOW_MAX {
        ScoreBucket::Low
    } else if score <= FRAUD_MID_MAX {
        ScoreBucket::Mid
    } else {
        ScoreBucket::High
    }
}

/// Buckets the complexity score
pub fn categorize_complexity(score: f64) -> ScoreBucket {
    if score <= COMPLEXITY_LOW_MAX {
        ScoreBucket::Low
    } else if score <= COMPLEXITY_MID_MAX {
        ScoreBucket::Mid
    } else {
        ScoreBucket::High
    }
}

/// Maps the categorical severity straight onto a bucket
pub fn categorize_severity(level: SeverityLevel) -> ScoreBucket {
    match level {
        SeverityLevel::Low => ScoreBucket::Low,
        SeverityLevel::Medium => ScoreBucket::Mid,
        SeverityLevel::High => ScoreBucket::High,
    }
}

/// Buckets one score of a bundle
pub fn categorize(bundle: &ScoreBundle, kind: ScoreKind) -> ScoreBucket {
    match kind {
        ScoreKind::Fraud => categorize_fraud(bundle.fraud_score),
        ScoreKind::Severity => categorize_severity(bundle.severity_level),
        ScoreKind::Complexity => categorize_complexity(bundle.complexity_score),
    }
}

/// All three buckets of a bundle, computed once per evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategorizedScores {
    pub fraud: ScoreBucket,
    pub severity: ScoreBucket,
    pub complexity: ScoreBucket,
}

impl CategorizedScores {
    pub fn from_bundle(bundle: &ScoreBundle) -> Self {
        Self {
            fraud: categorize_fraud(bundle.fraud_score),
            severity: categorize_severity(bundle.severity_level),
            complexity: categorize_complexity(bundle.complexity_score),
        }
    }

    pub fn get(&self, kind: ScoreKind) -> ScoreBucket {
        match kind {
            ScoreKind::Fraud => self.fraud,
            ScoreKind::Severity => self.severity,
            ScoreKind::Complexity => self.complexity,
        }
    }
}
