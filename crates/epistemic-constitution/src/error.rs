// epistemic-constitution/src/error.rs
// ============================================================================
// Module: Constitutional Rule Errors
// Description: Error taxonomy for the rule engine.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by [`crate::engine::RuleEngine`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// No rule exists with the given id.
    #[error("rule not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// `addRule` was called with `tier = immutable`.
    #[error("cannot add immutable rules")]
    CannotAddImmutableRules,
    /// `deactivateRule` was called against an immutable-tier rule.
    #[error("cannot deactivate immutable rules")]
    CannotDeactivateImmutableRules,
}

impl RuleError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::CannotAddImmutableRules => "cannot_add_immutable_rules",
            Self::CannotDeactivateImmutableRules => "cannot_deactivate_immutable",
        }
    }
}
