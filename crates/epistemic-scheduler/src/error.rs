// epistemic-scheduler/src/error.rs
// ============================================================================
// Module: Scheduler Errors
// Description: Error taxonomy for the outcome store, weight learner, and
// priority scheduler.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by [`crate::scheduler::Scheduler`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// A queued, non-terminal item already carries this fingerprint.
    #[error("duplicate fingerprint: {fingerprint}")]
    DuplicateFingerprint {
        /// The offending fingerprint.
        fingerprint: String,
    },
    /// No work item exists with the given id.
    #[error("work item not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// `work_type` is not in the scheduler's registered set.
    #[error("unknown work type: {work_type}")]
    InvalidWorkType {
        /// The offending work type.
        work_type: String,
    },
}

impl SchedulerError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DuplicateFingerprint { .. } => "duplicate_fingerprint",
            Self::NotFound { .. } => "not_found",
            Self::InvalidWorkType { .. } => "invalid_work_type",
        }
    }
}

/// Errors raised by [`crate::learner::WeightLearner::run_weight_learning`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LearnerError {
    /// Fewer than `required` outcomes were available.
    #[error("insufficient data: required {required}, available {available}")]
    InsufficientData {
        /// Minimum samples the caller asked for.
        required: usize,
        /// Samples actually available.
        available: usize,
    },
}

impl LearnerError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InsufficientData { .. } => "insufficient_data",
        }
    }
}
