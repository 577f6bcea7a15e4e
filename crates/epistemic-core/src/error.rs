// epistemic-core/src/error.rs
// ============================================================================
// Module: Core Error Taxonomy
// Description: Error types shared by the knowledge store, evidence store,
// and truth lifecycle.
// Purpose: Map every failure mode to a stable, lowercase snake_case code so
// callers at the macro boundary never need to string-match messages.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Errors in the core crate never leave state half-mutated: every fallible
//! operation documented here either fully applies or reports one of these
//! variants with no observable side effect.

use thiserror::Error;

/// Errors raised by [`crate::knowledge::KnowledgeStore`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KnowledgeError {
    /// A field was out of its declared range or otherwise malformed.
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        /// Offending field name.
        field: String,
        /// Human-readable explanation.
        reason: String,
    },
    /// The referenced knowledge unit does not exist.
    #[error("knowledge unit not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// An invariant of the knowledge model was violated.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl KnowledgeError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidField { .. } => "invalid_field",
            Self::NotFound { .. } => "not_found",
            Self::InvariantViolation(_) => "invariant_violation",
        }
    }
}

/// Errors raised by [`crate::evidence::EvidenceStore`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvidenceError {
    /// `type` was not one of the fixed evidence types.
    #[error("invalid evidence type: {0}")]
    InvalidEvidenceType(String),
    /// `direction` was not one of `supports` / `refutes` / `neutral`.
    #[error("invalid evidence direction: {0}")]
    InvalidDirection(String),
    /// `strength` fell outside `[0, 1]`.
    #[error("invalid evidence strength: {0}")]
    InvalidStrength(f64),
    /// The referenced knowledge unit does not exist.
    #[error("knowledge unit not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
}

impl EvidenceError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidEvidenceType(_) => "invalid_evidence_type",
            Self::InvalidDirection(_) => "invalid_direction",
            Self::InvalidStrength(_) => "invalid_strength",
            Self::NotFound { .. } => "not_found",
        }
    }
}

/// Errors raised by [`crate::truth::TruthLifecycle`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TruthError {
    /// The requested transition is not permitted from the unit's current
    /// lifecycle state.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition {
        /// Current state name.
        from: String,
        /// Requested state name.
        to: String,
    },
    /// The referenced knowledge unit has no lifecycle record.
    #[error("knowledge unit not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
}

impl TruthError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotFound { .. } => "not_found",
        }
    }
}
