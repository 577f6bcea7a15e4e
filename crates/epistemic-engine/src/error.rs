// epistemic-engine/src/error.rs
// ============================================================================
// Module: Engine Dispatch Errors
// Description: Error taxonomy for the operation registry itself, distinct
// from the per-domain errors its handlers translate into error codes.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by [`crate::registry::dispatch`] before a handler runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No domain is registered under this name.
    #[error("unknown domain: {domain}")]
    UnknownDomain {
        /// The offending domain name.
        domain: String,
    },
    /// The domain exists but has no operation under this name.
    #[error("unknown operation: {domain}.{name}")]
    UnknownOperation {
        /// The domain the operation was looked up in.
        domain: String,
        /// The offending operation name.
        name: String,
    },
    /// The input payload did not match the operation's expected shape.
    #[error("invalid input for {domain}.{name}: {reason}")]
    InvalidInput {
        /// The domain the operation was looked up in.
        domain: String,
        /// The operation name.
        name: String,
        /// A human-readable description of the mismatch.
        reason: String,
    },
}

impl DispatchError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownDomain { .. } => "unknown_domain",
            Self::UnknownOperation { .. } => "unknown_operation",
            Self::InvalidInput { .. } => "invalid_input",
        }
    }
}
