//! Test Data Builders
//!
//! Builders with sensible defaults so a test only names the fields it
//! cares about. Team and adjuster names default to generated values.

use fake::faker::name::en::Name;
use fake::Fake;

use domain_routing::{Condition, RuleSpec, ScoreBundle, SeverityLevel};

/// Builder for score bundles
pub struct TestScoreBundleBuilder {
    fraud_score: f64,
    complexity_score: f64,
    severity_level: SeverityLevel,
    claim_category: String,
}

impl Default for TestScoreBundleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestScoreBundleBuilder {
    pub fn new() -> Self {
        Self {
            fraud_score: 0.1,
            complexity_score: 1.0,
            severity_level: SeverityLevel::Low,
            claim_category: "accident".to_string(),
        }
    }

    pub fn with_fraud(mut self, score: f64) -> Self {
        self.fraud_score = score;
        self
    }

    pub fn with_complexity(mut self, score: f64) -> Self {
        self.complexity_score = score;
        self
    }

    pub fn with_severity(mut self, level: SeverityLevel) -> Self {
        self.severity_level = level;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.claim_category = category.into();
        self
    }

    pub fn build(self) -> ScoreBundle {
        ScoreBundle::new(
            self.fraud_score,
            self.complexity_score,
            self.severity_level,
            self.claim_category,
        )
    }
}

/// Builder for rule specs
pub struct TestRuleSpecBuilder {
    name: Option<String>,
    condition: Condition,
    routing_team: String,
    adjuster: String,
    priority: Option<i64>,
    enabled: bool,
}

impl TestRuleSpecBuilder {
    /// Starts from a condition; destination names are generated
    pub fn new(condition: Condition) -> Self {
        let adjuster: String = Name().fake();
        let team = format!("{} Team", adjuster.split_whitespace().last().unwrap_or("Claims"));
        Self {
            name: None,
            condition,
            routing_team: team,
            adjuster,
            priority: None,
            enabled: true,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn routed_to(mut self, team: impl Into<String>, adjuster: impl Into<String>) -> Self {
        self.routing_team = team.into();
        self.adjuster = adjuster.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn build(self) -> RuleSpec {
        let mut spec = RuleSpec::new(self.condition, self.routing_team, self.adjuster);
        spec.name = self.name;
        spec.priority = self.priority;
        spec.enabled = self.enabled;
        spec
    }
}
