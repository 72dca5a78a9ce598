//! Domain events for the routing engine
//!
//! `RuleSetChanged` is published by the rule store after every mutation that
//! changed stored state. `ClaimRerouted` is emitted when recomputation moves a
//! claim to a different team or adjuster.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use core_kernel::{NotificationId, RuleId};

use crate::matcher::RoutingDecision;

/// What kind of mutation produced a rule-set change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleChangeKind {
    Created,
    Updated,
    Deleted,
}

/// Published by the rule store on every version increment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSetChanged {
    /// Rule-set version after the mutation
    pub version: u64,
    pub changed_rule_ids: Vec<RuleId>,
    pub kind: RuleChangeKind,
    pub timestamp: DateTime<Utc>,
}

/// Why a claim's assignment was recomputed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerouteCause {
    /// Reactive reconciliation after a rule change
    RuleChange,
    /// Explicit reroute request
    Manual,
}

impl RerouteCause {
    /// Note recorded in the claim's reroute history
    pub fn note(&self, rules_version: u64) -> String {
        match self {
            RerouteCause::RuleChange => {
                format!("Auto-rerouted after rule update (rules v{})", rules_version)
            }
            RerouteCause::Manual => format!("Rerouted on request (rules v{})", rules_version),
        }
    }
}

/// A claim moved to a different team or adjuster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRerouted {
    pub notification_id: NotificationId,
    pub claim_id: String,
    pub old_decision: RoutingDecision,
    pub new_decision: RoutingDecision,
    pub cause: RerouteCause,
    pub timestamp: DateTime<Utc>,
}

impl ClaimRerouted {
    pub fn new(
        claim_id: impl Into<String>,
        old_decision: RoutingDecision,
        new_decision: RoutingDecision,
        cause: RerouteCause,
    ) -> Self {
        Self {
            notification_id: NotificationId::new_v7(),
            claim_id: claim_id.into(),
            old_decision,
            new_decision,
            cause,
            timestamp: Utc::now(),
        }
    }
}
