//! Flat rule specs from earlier rule files and clients
//!
//! Older clients describe a rule with a `condition_type` string plus loose
//! companion fields (`condition_value`, `operator`, `threshold`, the three
//! `*_category` fields and an optional `claim_type` filter). This module
//! turns that shape into a [`RuleSpec`] with a typed [`Condition`],
//! rejecting combinations that cannot be evaluated.
//!
//! ```rust,ignore
//! let legacy: LegacyRuleSpec = serde_json::from_value(json!({
//!     "condition_type": "fraud",
//!     "condition_value": "high",
//!     "claim_type": "accident",
//!     "routing_team": "SIU (Fraud)",
//!     "adjuster": "SIU Investigator"
//! }))?;
//! let spec = RuleSpec::try_from(legacy)?;
//! ```

use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

use crate::categorizer::{ScoreBucket, ScoreKind};
use crate::error::RoutingError;
use crate::rule::{Condition, RuleSpec, ThresholdOperator};

/// `condition_type` values understood by [`LegacyRuleSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyConditionType {
    Fraud,
    Severity,
    Complexity,
    ClaimType,
    FraudThreshold,
    Combined,
}

impl LegacyConditionType {
    pub const ALL: [LegacyConditionType; 6] = [
        LegacyConditionType::Fraud,
        LegacyConditionType::Severity,
        LegacyConditionType::Complexity,
        LegacyConditionType::ClaimType,
        LegacyConditionType::FraudThreshold,
        LegacyConditionType::Combined,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LegacyConditionType::Fraud => "fraud",
            LegacyConditionType::Severity => "severity",
            LegacyConditionType::Complexity => "complexity",
            LegacyConditionType::ClaimType => "claim_type",
            LegacyConditionType::FraudThreshold => "fraud_threshold",
            LegacyConditionType::Combined => "combined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }
}

/// Rule spec in the flat, string-typed shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyRuleSpec {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub condition_type: Option<String>,
    #[serde(default)]
    pub condition_value: Option<String>,
    /// Extra claim category filter
    #[serde(default)]
    pub claim_type: Option<String>,
    #[serde(default)]
    pub operator: Option<String>,
    /// Left untyped so a non-numeric value surfaces as a validation error
    #[serde(default)]
    pub threshold: Option<serde_json::Value>,
    #[serde(default)]
    pub fraud_category: Option<String>,
    #[serde(default)]
    pub severity_category: Option<String>,
    #[serde(default)]
    pub complexity_category: Option<String>,
    #[serde(default)]
    pub routing_team: Option<String>,
    #[serde(default)]
    pub adjuster: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn bucket(field: &str, value: &str) -> Result<ScoreBucket, RoutingError> {
    ScoreBucket::parse(value).ok_or_else(|| {
        RoutingError::validation(format!(
            "{} must be one of low, mid, high; got '{}'",
            field, value
        ))
    })
}

impl LegacyRuleSpec {
    fn category_condition(&self, kind: ScoreKind) -> Result<Condition, RoutingError> {
        let value = present(&self.condition_value).ok_or_else(|| {
            RoutingError::validation(format!("{} condition needs a condition_value", kind))
        })?;
        Ok(Condition::score_category(kind, bucket("condition_value", value)?))
    }

    fn threshold_condition(&self) -> Result<Condition, RoutingError> {
        let symbol = present(&self.operator)
            .ok_or_else(|| RoutingError::validation("fraud_threshold condition needs an operator"))?;
        let operator = ThresholdOperator::parse(symbol)
            .ok_or_else(|| RoutingError::validation(format!("unknown operator '{}'", symbol)))?;

        let value = match &self.threshold {
            Some(serde_json::Value::Number(n)) => n.as_f64(),
            Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
        .ok_or_else(|| RoutingError::validation("threshold must be a number"))?;

        let condition = Condition::fraud_threshold(operator, value);
        condition.check()?;
        Ok(condition)
    }

    fn combined_parts(&self) -> Result<Vec<Condition>, RoutingError> {
        let fields = [
            (ScoreKind::Fraud, "fraud_category", &self.fraud_category),
            (ScoreKind::Severity, "severity_category", &self.severity_category),
            (ScoreKind::Complexity, "complexity_category", &self.complexity_category),
        ];
        let mut parts = Vec::new();
        for (kind, field, value) in fields {
            if let Some(value) = present(value) {
                parts.push(Condition::score_category(kind, bucket(field, value)?));
            }
        }
        Ok(parts)
    }

    /// Builds the typed condition described by the flat fields
    pub fn condition(&self) -> Result<Condition, RoutingError> {
        let raw_type = present(&self.condition_type)
            .ok_or_else(|| RoutingError::validation("condition_type is required"))?;
        let condition_type = LegacyConditionType::parse(raw_type).ok_or_else(|| {
            RoutingError::validation(format!("unknown condition_type '{}'", raw_type))
        })?;

        let mut parts = match condition_type {
            LegacyConditionType::Fraud => vec![self.category_condition(ScoreKind::Fraud)?],
            LegacyConditionType::Severity => vec![self.category_condition(ScoreKind::Severity)?],
            LegacyConditionType::Complexity => {
                vec![self.category_condition(ScoreKind::Complexity)?]
            }
            LegacyConditionType::ClaimType => {
                let category = present(&self.condition_value)
                    .or_else(|| present(&self.claim_type))
                    .ok_or_else(|| {
                        RoutingError::validation("claim_type condition needs a category")
                    })?;
                vec![Condition::claim_type(category)]
            }
            LegacyConditionType::FraudThreshold => vec![self.threshold_condition()?],
            LegacyConditionType::Combined => self.combined_parts()?,
        };

        if condition_type != LegacyConditionType::ClaimType {
            if let Some(category) = present(&self.claim_type) {
                parts.push(Condition::claim_type(category));
            }
        }

        match parts.len() {
            0 => Err(RoutingError::validation(
                "combined condition needs at least one category field",
            )),
            1 => Ok(parts.remove(0)),
            _ => Ok(Condition::all_of(parts)),
        }
    }
}

impl TryFrom<LegacyRuleSpec> for RuleSpec {
    type Error = RoutingError;

    fn try_from(legacy: LegacyRuleSpec) -> Result<Self, Self::Error> {
        let condition = legacy.condition()?;
        let spec = RuleSpec {
            name: legacy.name.filter(|n| !n.trim().is_empty()),
            description: legacy.description.filter(|d| !d.trim().is_empty()),
            enabled: legacy.enabled.unwrap_or(true),
            priority: legacy.priority,
            condition: Some(condition),
            routing_team: legacy.routing_team.unwrap_or_else(|| "Fast Track".to_string()),
            adjuster: legacy
                .adjuster
                .unwrap_or_else(|| "Standard Adjuster".to_string()),
        };
        spec.check()?;
        Ok(spec)
    }
}
