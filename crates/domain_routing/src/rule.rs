//! Routing rules and their conditions
//!
//! A rule maps a condition over a claim's score bundle to a destination
//! team and adjuster. Conditions are a closed variant, so a rule can never
//! carry a condition/value combination that makes no sense at evaluation
//! time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use core_kernel::RuleId;

use crate::categorizer::{ScoreBucket, ScoreKind};
use crate::error::RoutingError;
use crate::score::normalize_category;

/// Comparison used by threshold conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThresholdOperator {
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "<")]
    Lt,
}

impl ThresholdOperator {
    /// All operators, in the order offered to rule authors
    pub const ALL: [ThresholdOperator; 4] = [
        ThresholdOperator::Gte,
        ThresholdOperator::Gt,
        ThresholdOperator::Lte,
        ThresholdOperator::Lt,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            ThresholdOperator::Gte => ">=",
            ThresholdOperator::Gt => ">",
            ThresholdOperator::Lte => "<=",
            ThresholdOperator::Lt => "<",
        }
    }

    /// Parses an operator symbol
    pub fn parse(symbol: &str) -> Option<Self> {
        match symbol.trim() {
            ">=" | "≥" => Some(ThresholdOperator::Gte),
            ">" => Some(ThresholdOperator::Gt),
            "<=" | "≤" => Some(ThresholdOperator::Lte),
            "<" => Some(ThresholdOperator::Lt),
            _ => None,
        }
    }

    /// Applies the comparison `lhs <op> rhs`
    pub fn compare(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            ThresholdOperator::Gte => lhs >= rhs,
            ThresholdOperator::Gt => lhs > rhs,
            ThresholdOperator::Lte => lhs <= rhs,
            ThresholdOperator::Lt => lhs < rhs,
        }
    }
}

impl fmt::Display for ThresholdOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Scores a threshold condition may compare against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdKind {
    Fraud,
}

/// Condition a rule tests against a score bundle
///
/// `Combined` is a conjunction only. OR/NOT combinators are not part of the
/// rule language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Categorized score equals a bucket
    ScoreCategory {
        kind: ScoreKind,
        bucket: ScoreBucket,
    },
    /// Claim category equals a value
    ClaimType {
        category: String,
    },
    /// Raw score compared to a fixed value
    Threshold {
        kind: ThresholdKind,
        operator: ThresholdOperator,
        value: f64,
    },
    /// Every sub-condition holds
    Combined {
        conditions: Vec<Condition>,
    },
}

impl Condition {
    pub fn score_category(kind: ScoreKind, bucket: ScoreBucket) -> Self {
        Condition::ScoreCategory { kind, bucket }
    }

    pub fn claim_type(category: impl Into<String>) -> Self {
        Condition::ClaimType {
            category: normalize_category(&category.into()),
        }
    }

    pub fn fraud_threshold(operator: ThresholdOperator, value: f64) -> Self {
        Condition::Threshold {
            kind: ThresholdKind::Fraud,
            operator,
            value,
        }
    }

    pub fn all_of(conditions: Vec<Condition>) -> Self {
        Condition::Combined { conditions }
    }

    /// Checks the condition is well formed
    pub fn check(&self) -> Result<(), RoutingError> {
        match self {
            Condition::ScoreCategory { .. } => Ok(()),
            Condition::ClaimType { category } => {
                if category.trim().is_empty() {
                    Err(RoutingError::validation("claim type condition needs a category"))
                } else {
                    Ok(())
                }
            }
            Condition::Threshold { value, .. } => {
                if !value.is_finite() || !(0.0..=1.0).contains(value) {
                    Err(RoutingError::validation(format!(
                        "threshold value must be a number in [0, 1], got {}",
                        value
                    )))
                } else {
                    Ok(())
                }
            }
            Condition::Combined { conditions } => {
                if conditions.is_empty() {
                    return Err(RoutingError::validation(
                        "combined condition needs at least one sub-condition",
                    ));
                }
                conditions.iter().try_for_each(Condition::check)
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::ScoreCategory { kind, bucket } => write!(f, "{} is {}", kind, bucket),
            Condition::ClaimType { category } => write!(f, "claim type is {}", category),
            Condition::Threshold { operator, value, .. } => {
                write!(f, "fraud score {} {}", operator, value)
            }
            Condition::Combined { conditions } => {
                let parts: Vec<String> = conditions.iter().map(|c| c.to_string()).collect();
                write!(f, "{}", parts.join(" and "))
            }
        }
    }
}

/// A stored routing rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier, never reused
    pub id: RuleId,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// Free-text description
    #[serde(default)]
    pub description: Option<String>,
    /// Lower is evaluated first
    pub priority: i64,
    /// Disabled rules never match
    pub enabled: bool,
    pub condition: Condition,
    pub routing_team: String,
    pub adjuster: String,
    /// Creation order within the store; breaks ties on equal timestamps
    pub sequence: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// Evaluation order key: priority, then creation order
    pub fn order_key(&self) -> (i64, DateTime<Utc>, u64) {
        (self.priority, self.created_at, self.sequence)
    }

    /// Compares everything a rule author can change, ignoring timestamps
    pub fn same_content(&self, other: &Rule) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.priority == other.priority
            && self.enabled == other.enabled
            && self.condition == other.condition
            && self.routing_team == other.routing_team
            && self.adjuster == other.adjuster
    }

    /// Name for logs and routing reasons
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => self.id.to_string(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

/// Fields supplied when creating a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RuleSpec {
    #[serde(default)]
    #[validate(length(max = 200, message = "name is limited to 200 characters"))]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Defaults to the current rule count when absent
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    #[validate(length(min = 1, message = "routing_team must not be empty"))]
    pub routing_team: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "adjuster must not be empty"))]
    pub adjuster: String,
}

impl RuleSpec {
    pub fn new(
        condition: Condition,
        routing_team: impl Into<String>,
        adjuster: impl Into<String>,
    ) -> Self {
        Self {
            name: None,
            description: None,
            enabled: true,
            priority: None,
            condition: Some(condition),
            routing_team: routing_team.into(),
            adjuster: adjuster.into(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Validates the spec and returns its condition
    pub fn check(&self) -> Result<&Condition, RoutingError> {
        self.validate()?;
        check_destination(&self.routing_team, &self.adjuster)?;
        let condition = self
            .condition
            .as_ref()
            .ok_or_else(|| RoutingError::validation("condition is required"))?;
        condition.check()?;
        Ok(condition)
    }
}

/// Partial update; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RulePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub routing_team: Option<String>,
    #[serde(default)]
    pub adjuster: Option<String>,
}

impl RulePatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn condition(condition: Condition) -> Self {
        Self {
            condition: Some(condition),
            ..Default::default()
        }
    }

    pub fn destination(routing_team: impl Into<String>, adjuster: impl Into<String>) -> Self {
        Self {
            routing_team: Some(routing_team.into()),
            adjuster: Some(adjuster.into()),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Merges the patch over `rule` and validates the result
    ///
    /// Timestamps are left untouched; the store decides whether the merge
    /// is a real change.
    pub fn merge_into(&self, rule: &Rule) -> Result<Rule, RoutingError> {
        let mut merged = rule.clone();
        if let Some(name) = &self.name {
            merged.name = Some(name.clone());
        }
        if let Some(description) = &self.description {
            merged.description = Some(description.clone());
        }
        if let Some(enabled) = self.enabled {
            merged.enabled = enabled;
        }
        if let Some(priority) = self.priority {
            merged.priority = priority;
        }
        if let Some(condition) = &self.condition {
            condition.check()?;
            merged.condition = condition.clone();
        }
        if let Some(team) = &self.routing_team {
            merged.routing_team = team.trim().to_string();
        }
        if let Some(adjuster) = &self.adjuster {
            merged.adjuster = adjuster.trim().to_string();
        }
        check_destination(&merged.routing_team, &merged.adjuster)?;
        Ok(merged)
    }
}

fn check_destination(team: &str, adjuster: &str) -> Result<(), RoutingError> {
    if team.trim().is_empty() {
        return Err(RoutingError::validation("routing_team must not be empty"));
    }
    if adjuster.trim().is_empty() {
        return Err(RoutingError::validation("adjuster must not be empty"));
    }
    Ok(())
}
