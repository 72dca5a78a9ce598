//! Score bundles produced by the upstream scorer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level reported by the scorer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeverityLevel {
    #[serde(alias = "low", alias = "LOW")]
    Low,
    #[serde(alias = "medium", alias = "MEDIUM", alias = "Mid", alias = "mid")]
    Medium,
    #[serde(alias = "high", alias = "HIGH")]
    High,
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SeverityLevel::Low => "Low",
            SeverityLevel::Medium => "Medium",
            SeverityLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// Fraud/complexity/severity/category tuple for one claim
///
/// Immutable once produced for an evaluation. The ledger retains the bundle
/// so a claim can be re-routed without re-scoring it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBundle {
    /// Fraud likelihood, nominally in `[0, 1]`
    pub fraud_score: f64,
    /// Handling complexity, nominally in `[0, inf)`
    pub complexity_score: f64,
    /// Categorical severity
    pub severity_level: SeverityLevel,
    /// Claim category such as `accident` or `health`
    pub claim_category: String,
}

impl ScoreBundle {
    /// Creates a bundle, normalising the category to lowercase
    pub fn new(
        fraud_score: f64,
        complexity_score: f64,
        severity_level: SeverityLevel,
        claim_category: impl Into<String>,
    ) -> Self {
        Self {
            fraud_score,
            complexity_score,
            severity_level,
            claim_category: normalize_category(&claim_category.into()),
        }
    }

    /// Returns a description of why the bundle cannot be evaluated, if any
    ///
    /// Out-of-range but finite scores are fine (the categorizer clamps them).
    /// Non-finite scores and a blank category are not.
    pub fn integrity_issue(&self) -> Option<String> {
        if !self.fraud_score.is_finite() {
            return Some(format!("fraud_score is not finite: {}", self.fraud_score));
        }
        if !self.complexity_score.is_finite() {
            return Some(format!(
                "complexity_score is not finite: {}",
                self.complexity_score
            ));
        }
        if self.claim_category.trim().is_empty() {
            return Some("claim_category is empty".to_string());
        }
        None
    }

    /// Returns true when the bundle's category equals `category`, ignoring case
    pub fn is_category(&self, category: &str) -> bool {
        self.claim_category.trim().eq_ignore_ascii_case(category.trim())
    }
}

/// Lowercases and trims a claim category
pub fn normalize_category(category: &str) -> String {
    category.trim().to_ascii_lowercase()
}
