//! Routing domain errors
//!
//! Validation and not-found errors belong to a single CRUD call and are
//! returned to the caller. Stale-score errors are raised per ledger entry
//! during reconciliation and never abort a batch. Subscription failures
//! move the pipeline to degraded mode.

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur in the routing domain
#[derive(Debug, Error)]
pub enum RoutingError {
    /// Malformed rule spec or score bundle
    #[error("Validation error: {0}")]
    Validation(String),

    /// Referenced rule or claim does not exist
    #[error("{entity} not found: {id}")]
    NotFound {
        entity: &'static str,
        id: String,
    },

    /// A retained score bundle can no longer be evaluated
    #[error("Stale score bundle for claim {claim_id}: {reason}")]
    StaleScore {
        claim_id: String,
        reason: String,
    },

    /// The rule-change event feed cannot be subscribed to
    #[error("Rule change subscription unavailable: {0}")]
    SubscriptionUnavailable(String),

    /// Pipeline lifecycle misuse
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition {
        from: String,
        to: String,
    },

    /// Rule persistence failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PortError),
}

impl RoutingError {
    /// Creates a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        RoutingError::Validation(message.into())
    }

    /// Creates a not-found error for a rule
    pub fn rule_not_found(id: impl std::fmt::Display) -> Self {
        RoutingError::NotFound {
            entity: "Rule",
            id: id.to_string(),
        }
    }

    /// Creates a not-found error for a claim in the ledger
    pub fn claim_not_found(claim_id: impl Into<String>) -> Self {
        RoutingError::NotFound {
            entity: "Claim",
            id: claim_id.into(),
        }
    }

    /// Creates a stale-score error
    pub fn stale_score(claim_id: impl Into<String>, reason: impl Into<String>) -> Self {
        RoutingError::StaleScore {
            claim_id: claim_id.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for not-found errors
    pub fn is_not_found(&self) -> bool {
        matches!(self, RoutingError::NotFound { .. })
    }

    /// Returns true for validation errors
    pub fn is_validation(&self) -> bool {
        matches!(self, RoutingError::Validation(_))
    }
}

impl From<validator::ValidationErrors> for RoutingError {
    fn from(errors: validator::ValidationErrors) -> Self {
        RoutingError::Validation(errors.to_string())
    }
}

/// Result alias for routing operations
pub type RoutingResult<T> = Result<T, RoutingError>;
