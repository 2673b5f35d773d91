//! Error taxonomy for the DECREE evaluation engine.
//!
//! Every fallible engine operation returns `PolicyResult<T>`. None of these
//! errors is ever reinterpreted as a denial: a query either resolves to a
//! verdict or fails outright with one of the variants below.

use thiserror::Error;

/// The unified error type for DECREE.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// A rule referenced a condition that is absent from the merged registry
    /// of the policy evaluating it. This is a wiring bug, not a denial.
    #[error("unknown condition '{condition}' in policy '{policy}'")]
    UnknownCondition { policy: String, condition: String },

    /// A condition declared a cache scope outside global/user/subject/normal.
    #[error("invalid condition scope '{scope}': expected one of global, user, subject, normal")]
    InvalidScope { scope: String },

    /// A step carried an action other than enable/prevent.
    #[error("invalid rule action '{action}': expected enable or prevent")]
    InvalidAction { action: String },

    /// A subject or a parent declaration named a policy that was never registered.
    #[error("no policy registered under the name '{name}'")]
    UnknownPolicy { name: String },

    /// The same policy name was registered twice.
    #[error("policy '{name}' is already registered")]
    DuplicatePolicy { name: String },

    /// Resolving `ability` for `policy` re-entered itself through delegation.
    #[error("delegation cycle while resolving ability '{ability}' for policy {policy}")]
    DelegationCycle { policy: String, ability: String },

    /// A caller-supplied predicate or delegation function reported a fault.
    #[error("predicate for condition '{condition}' failed: {reason}")]
    PredicateFailed { condition: String, reason: String },

    /// A configuration document is missing, unreadable, or malformed.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

/// Convenience alias used throughout the DECREE crates.
pub type PolicyResult<T> = Result<T, PolicyError>;
