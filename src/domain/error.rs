//! Domain validation errors.
//!
//! Returned when a basket or universe violates a structural invariant at
//! load time. Nothing in the evaluation path returns these.

use thiserror::Error;

/// Errors that occur when domain invariants are violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Strategy tag is not one of the supported combination rules.
    #[error("unknown strategy tag '{tag}'")]
    UnknownStrategy {
        /// The tag as it appeared in the input.
        tag: String,
    },

    /// Baskets must have at least one leg.
    #[error("basket '{key}' has no legs")]
    EmptyLegs {
        /// Offending basket.
        key: String,
    },

    /// The legs do not fit the shape the strategy requires.
    #[error("basket '{key}' does not fit strategy {strategy}: {reason}")]
    LegShapeMismatch {
        key: String,
        strategy: &'static str,
        reason: String,
    },

    /// The same contract appears twice within one basket.
    #[error("basket '{key}' lists token {token_id} more than once")]
    DuplicateLeg { key: String, token_id: String },

    /// Two baskets share a key.
    #[error("duplicate basket key '{key}'")]
    DuplicateBasket { key: String },
}
