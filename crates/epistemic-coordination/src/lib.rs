// epistemic-coordination/src/lib.rs
// ============================================================================
// Crate: epistemic-coordination
// Description: Multi-actor coordination: protocols, interlocks, the
// plan-compatibility envelope, commitments, accountability, and rollback.
// ============================================================================

//! Actors coordinate through [`protocol`] (intent alignment, plan
//! compatibility, negotiation), [`interlock`] (mutual exclusion and
//! admission control), [`plan_envelope`] (pre-execution safety checks),
//! [`commitment`] (tracked promises with breach detection),
//! [`accountability`] (who gets credit), and [`rollback`] (coordinated
//! multi-actor undo).

pub mod accountability;
pub mod commitment;
pub mod error;
pub mod interlock;
pub mod plan_envelope;
pub mod protocol;
pub mod rollback;

pub use accountability::AccountabilityEdge;
pub use accountability::AccountabilityGraph;
pub use accountability::Attribution;
pub use accountability::EdgeKind;
pub use accountability::NodeKind;
pub use commitment::AUTO_BREACH_REASON;
pub use commitment::Commitment;
pub use commitment::CommitmentState;
pub use commitment::CommitmentStore;
pub use commitment::TransitionRecord;
pub use error::CommitmentError;
pub use error::InterlockError;
pub use error::ProtocolError;
pub use error::RollbackError;
pub use interlock::AcquireResult;
pub use interlock::Interlock;
pub use interlock::InterlockKind;
pub use interlock::InterlockStore;
pub use plan_envelope::CandidateAction;
pub use plan_envelope::EnvelopeViolation;
pub use plan_envelope::ViolationKind;
pub use plan_envelope::check_envelope;
pub use protocol::ConflictKind;
pub use protocol::MAX_PARTICIPANTS_PER_PROTOCOL;
pub use protocol::NegotiationResolution;
pub use protocol::Plan;
pub use protocol::PlanConflict;
pub use protocol::Position;
pub use protocol::PositionEvidence;
pub use protocol::PriorityInputs;
pub use protocol::PriorityRanking;
pub use protocol::Protocol;
pub use protocol::ProtocolStatus;
pub use protocol::ProtocolStore;
pub use protocol::arbitrate_priority;
pub use rollback::RollbackCoordination;
pub use rollback::RollbackStatus;
pub use rollback::RollbackStore;
pub use rollback::SlotStatus;
