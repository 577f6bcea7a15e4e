// epistemic-verify/src/error.rs
// ============================================================================
// Module: Verification Errors
// Description: Error taxonomy for the verification pipeline engine.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by [`crate::pipeline::PipelineEngine`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// No pipeline is registered under the given name.
    #[error("pipeline not found: {name}")]
    PipelineNotFound {
        /// The name that was looked up.
        name: String,
    },
    /// A pipeline with the given name already exists.
    #[error("pipeline already exists: {name}")]
    DuplicatePipeline {
        /// The duplicate name.
        name: String,
    },
    /// A check's `config` value could not be interpreted for its type.
    #[error("invalid config for check `{check}`: {reason}")]
    InvalidCheckConfig {
        /// Name of the offending check.
        check: String,
        /// Human-readable explanation.
        reason: String,
    },
}

impl VerifyError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::PipelineNotFound { .. } => "not_found",
            Self::DuplicatePipeline { .. } => "duplicate_pipeline",
            Self::InvalidCheckConfig { .. } => "invalid_check_config",
        }
    }
}
