// epistemic-coordination/src/error.rs
// ============================================================================
// Module: Coordination Errors
// Description: Error taxonomy shared by the protocol engine, interlocks,
// commitments, and the rollback coordinator.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by [`crate::protocol`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// No protocol exists with the given id.
    #[error("protocol not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// The protocol already has `MAX_PARTICIPANTS_PER_PROTOCOL` participants.
    #[error("protocol {id} is full")]
    ProtocolFull {
        /// The protocol's id.
        id: String,
    },
    /// The caller is not a participant of this protocol.
    #[error("{participant} is not a participant of protocol {protocol_id}")]
    NotAParticipant {
        /// The protocol's id.
        protocol_id: String,
        /// The caller's claimed participant id.
        participant: String,
    },
    /// The protocol is not in the state required for this operation.
    #[error("invalid protocol status for this operation: {status}")]
    InvalidStatus {
        /// The protocol's current status.
        status: String,
    },
    /// No negotiation is open on this protocol.
    #[error("no open negotiation on protocol {protocol_id}")]
    NoOpenNegotiation {
        /// The protocol's id.
        protocol_id: String,
    },
}

impl ProtocolError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ProtocolFull { .. } => "protocol_full",
            Self::NotAParticipant { .. } => "not_a_participant",
            Self::InvalidStatus { .. } => "invalid_status",
            Self::NoOpenNegotiation { .. } => "no_open_negotiation",
        }
    }
}

/// Errors raised by [`crate::interlock`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InterlockError {
    /// No interlock exists with the given id.
    #[error("interlock not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// A gate interlock was approved by someone other than its configured
    /// approver.
    #[error("{actor} is not the configured approver for gate {id}")]
    NotTheApprover {
        /// The gate's id.
        id: String,
        /// The rejected caller.
        actor: String,
    },
}

impl InterlockError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NotTheApprover { .. } => "not_the_approver",
        }
    }
}

/// Errors raised by [`crate::commitment`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    /// No commitment exists with the given id.
    #[error("commitment not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// The requested transition is not permitted by the commitment FSM.
    #[error("transition from {from} to {to} is not permitted")]
    InvalidTransition {
        /// The commitment's current state.
        from: String,
        /// The requested target state.
        to: String,
    },
}

impl CommitmentError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidTransition { .. } => "invalid_transition",
        }
    }
}

/// Errors raised by [`crate::rollback`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RollbackError {
    /// No rollback coordination exists with the given id.
    #[error("rollback not found: {id}")]
    NotFound {
        /// The id that was looked up.
        id: String,
    },
    /// `execute` was called while the coordination was not `ready`.
    #[error("rollback {id} is not ready to execute")]
    NotReady {
        /// The rollback's id.
        id: String,
    },
}

impl RollbackError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::NotReady { .. } => "not_ready",
        }
    }
}
