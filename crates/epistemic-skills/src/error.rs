// epistemic-skills/src/error.rs
// ============================================================================
// Module: Skill Store Errors
// Description: Error taxonomy for skill creation and application recording.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by the skill store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SkillError {
    /// No skill exists with the given id.
    #[error("skill not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// A reasoning template was given an empty step sequence.
    #[error("reasoning template must have at least one step")]
    EmptySteps,
}

impl SkillError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::EmptySteps => "empty_steps",
        }
    }
}
