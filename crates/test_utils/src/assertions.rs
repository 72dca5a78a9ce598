//! Custom Test Assertions
//!
//! Assertion helpers for routing decisions and ledger entries that print
//! the whole decision on failure.

use core_kernel::RuleId;
use domain_routing::{LedgerEntry, RoutingDecision};

/// Asserts the decision sends the claim to `team`
pub fn assert_routed_to(decision: &RoutingDecision, team: &str) {
    assert_eq!(
        decision.routing_team, team,
        "Expected routing to {}, got decision {:?}",
        team, decision
    );
}

/// Asserts the decision came from `rule_id`
pub fn assert_matched(decision: &RoutingDecision, rule_id: RuleId) {
    assert_eq!(
        decision.matched_rule_id,
        Some(rule_id),
        "Expected match on rule {}, got decision {:?}",
        rule_id,
        decision
    );
}

/// Asserts no rule matched
pub fn assert_default_decision(decision: &RoutingDecision) {
    assert!(
        decision.matched_rule_id.is_none(),
        "Expected default assignment, got decision {:?}",
        decision
    );
}

/// Asserts the entry was reconciled against `version`
pub fn assert_entry_at_version(entry: &LedgerEntry, version: u64) {
    assert_eq!(
        entry.decision.rules_version, version,
        "Claim {} is at rules version {}, expected {}",
        entry.claim_id, entry.decision.rules_version, version
    );
}
