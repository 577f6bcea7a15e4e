// epistemic-coordination/src/commitment.rs
// ============================================================================
// Module: Commitments
// Description: Tracked promises with a deadline, a verifier panel, and an
// auditable state transition history.
// Dependencies: epistemic-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Commitment`] is a promise an actor makes, optionally bound by a
//! deadline and checked off by a panel of verifiers. Every transition is
//! appended to the commitment's history. [`CommitmentStore::detect_breaches`]
//! sweeps for commitments whose deadline has passed without resolution.

use epistemic_core::BoundedHistory;
use epistemic_core::Instant;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::CommitmentError;

/// Lifecycle state of a [`Commitment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitmentState {
    /// Offered, awaiting acceptance.
    Proposed,
    /// Accepted by its verifiers.
    Accepted,
    /// Work toward the commitment is underway.
    InProgress,
    /// Delivered and verified.
    Fulfilled,
    /// Withdrawn by the committing actor before fulfillment.
    Withdrawn,
    /// Failed to deliver; set manually or by a deadline sweep.
    Breached,
    /// Lapsed before acceptance.
    Expired,
}

impl CommitmentState {
    /// Terminal states accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Fulfilled | Self::Withdrawn | Self::Breached | Self::Expired)
    }

    const fn key(self) -> &'static str {
        match self {
            Self::Proposed => "proposed",
            Self::Accepted => "accepted",
            Self::InProgress => "in_progress",
            Self::Fulfilled => "fulfilled",
            Self::Withdrawn => "withdrawn",
            Self::Breached => "breached",
            Self::Expired => "expired",
        }
    }

    /// Returns whether `to` is a permitted transition target from `self`.
    #[must_use]
    pub const fn allows(self, to: Self) -> bool {
        match (self, to) {
            (Self::Proposed, Self::Accepted | Self::Withdrawn | Self::Expired) => true,
            (Self::Accepted, Self::InProgress | Self::Withdrawn | Self::Breached | Self::Fulfilled) => true,
            (Self::InProgress, Self::Fulfilled | Self::Withdrawn | Self::Breached) => true,
            _ => false,
        }
    }
}

/// Reason recorded for an auto-detected breach.
pub const AUTO_BREACH_REASON: &str = "deadline_exceeded";

/// One recorded transition in a commitment's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// State transitioned from.
    pub from: CommitmentState,
    /// State transitioned to.
    pub to: CommitmentState,
    /// The actor responsible for the transition (or `"system"` for
    /// auto-detected breaches).
    pub actor: String,
    /// Supporting evidence, if any.
    pub evidence: Option<Value>,
    /// When this transition happened.
    pub recorded_at: Instant,
}

/// A tracked promise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commitment {
    /// Opaque id, prefixed `cm_`.
    pub id: String,
    /// The committing actor.
    pub actor: String,
    /// Free-form description of what was promised.
    pub text: String,
    /// Optional deadline.
    pub deadline: Option<Instant>,
    /// The panel of actors that can accept/verify this commitment.
    pub verifiers: Vec<String>,
    /// Current state.
    pub state: CommitmentState,
    /// Full transition history, oldest first.
    pub history: Vec<TransitionRecord>,
    /// When this commitment was registered.
    pub created_at: Instant,
}

impl epistemic_core::Indexed for Commitment {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

/// Bounded, indexed store of [`Commitment`]s.
pub struct CommitmentStore {
    store: epistemic_core::BoundedIndexedStore<Commitment>,
    breach_log: BoundedHistory<String>,
}

/// Default ceiling for the commitment store before FIFO eviction kicks in.
pub const DEFAULT_CEILING: usize = 20_000;
const BREACH_LOG_CEILING: usize = 5_000;

impl CommitmentStore {
    /// Creates an empty commitment store with the given ceiling (0 =
    /// unbounded).
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            store: epistemic_core::BoundedIndexedStore::new(ceiling).with_index("actor", |c: &Commitment| vec![c.actor.clone()]),
            breach_log: BoundedHistory::new(BREACH_LOG_CEILING),
        }
    }

    /// Registers a new commitment in [`CommitmentState::Proposed`].
    pub fn register(
        &mut self,
        actor: impl Into<String>,
        text: impl Into<String>,
        deadline: Option<Instant>,
        verifiers: Vec<String>,
        services: &Services,
    ) -> Commitment {
        let commitment = Commitment {
            id: services.new_id("cm"),
            actor: actor.into(),
            text: text.into(),
            deadline,
            verifiers,
            state: CommitmentState::Proposed,
            history: Vec::new(),
            created_at: services.now(),
        };
        self.store.put(commitment.clone());
        commitment
    }

    /// Looks up a commitment by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Commitment> {
        self.store.get(id)
    }

    /// Transitions a commitment per its FSM, appending a history entry.
    ///
    /// # Errors
    ///
    /// Returns [`CommitmentError::NotFound`] if no such commitment exists,
    /// or [`CommitmentError::InvalidTransition`] if the transition is not
    /// permitted from the commitment's current state.
    pub fn transition(
        &mut self,
        id: &str,
        to: CommitmentState,
        actor: impl Into<String>,
        evidence: Option<Value>,
        services: &Services,
    ) -> Result<Commitment, CommitmentError> {
        let mut commitment = self.store.get(id).cloned().ok_or_else(|| CommitmentError::NotFound { id: id.to_string() })?;
        if !commitment.state.allows(to) {
            return Err(CommitmentError::InvalidTransition {
                from: commitment.state.key().to_string(),
                to: to.key().to_string(),
            });
        }
        commitment.history.push(TransitionRecord {
            from: commitment.state,
            to,
            actor: actor.into(),
            evidence,
            recorded_at: services.now(),
        });
        commitment.state = to;
        self.store.put(commitment.clone());
        Ok(commitment)
    }

    /// Scans every non-terminal commitment with a past deadline and marks
    /// it [`CommitmentState::Breached`] with reason [`AUTO_BREACH_REASON`].
    /// Returns the ids of commitments newly marked breached.
    pub fn detect_breaches(&mut self, services: &Services) -> Vec<String> {
        let now = services.now();
        let candidates: Vec<String> = self
            .store
            .list()
            .filter(|c| !c.state.is_terminal())
            .filter(|c| c.deadline.is_some_and(|deadline| now > deadline))
            .map(|c| c.id.clone())
            .collect();

        let mut breached = Vec::new();
        for id in candidates {
            if let Some(mut commitment) = self.store.get(&id).cloned() {
                commitment.history.push(TransitionRecord {
                    from: commitment.state,
                    to: CommitmentState::Breached,
                    actor: "system".to_string(),
                    evidence: Some(Value::String(AUTO_BREACH_REASON.to_string())),
                    recorded_at: now,
                });
                commitment.state = CommitmentState::Breached;
                self.store.put(commitment);
                self.breach_log.push(id.clone());
                breached.push(id);
            }
        }
        breached
    }

    /// Returns every commitment belonging to `actor`.
    #[must_use]
    pub fn for_actor(&self, actor: &str) -> Vec<&Commitment> {
        self.store.by_index("actor", actor).iter().filter_map(|id| self.store.get(id)).collect()
    }

    /// Number of breaches recorded by [`Self::detect_breaches`] so far
    /// (subject to the breach log's own eviction ceiling).
    #[must_use]
    pub fn breach_log_len(&self) -> usize {
        self.breach_log.len()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use epistemic_core::ManualClock;

    use super::*;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    #[test]
    fn valid_lifecycle_reaches_fulfilled() {
        let services = services();
        let mut store = CommitmentStore::new(0);
        let commitment = store.register("alice", "ship the report", None, vec!["bob".to_string()], &services);

        store.transition(&commitment.id, CommitmentState::Accepted, "bob", None, &services).unwrap();
        store.transition(&commitment.id, CommitmentState::InProgress, "alice", None, &services).unwrap();
        let fulfilled = store
            .transition(&commitment.id, CommitmentState::Fulfilled, "bob", Some(serde_json::json!({"report": "ok"})), &services)
            .unwrap();

        assert_eq!(fulfilled.state, CommitmentState::Fulfilled);
        assert_eq!(fulfilled.history.len(), 3);
    }

    #[test]
    fn skipping_straight_to_fulfilled_is_rejected() {
        let services = services();
        let mut store = CommitmentStore::new(0);
        let commitment = store.register("alice", "ship the report", None, vec!["bob".to_string()], &services);

        let err = store.transition(&commitment.id, CommitmentState::Fulfilled, "bob", None, &services).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn past_deadline_auto_breaches() {
        let clock = Arc::new(ManualClock::new(Instant::from_millis(0)));
        let services = Services::with_clock(clock.clone());
        let mut store = CommitmentStore::new(0);
        let commitment = store.register("alice", "ship by noon", Some(Instant::from_millis(100)), Vec::new(), &services);

        clock.advance(200);
        let breached = store.detect_breaches(&services);
        assert_eq!(breached, vec![commitment.id.clone()]);
        assert_eq!(store.get(&commitment.id).unwrap().state, CommitmentState::Breached);
    }

    #[test]
    fn fulfilled_commitments_are_not_swept() {
        let clock = Arc::new(ManualClock::new(Instant::from_millis(0)));
        let services = Services::with_clock(clock.clone());
        let mut store = CommitmentStore::new(0);
        let commitment = store.register("alice", "ship by noon", Some(Instant::from_millis(100)), vec!["bob".to_string()], &services);
        store.transition(&commitment.id, CommitmentState::Accepted, "bob", None, &services).unwrap();
        store.transition(&commitment.id, CommitmentState::Fulfilled, "bob", None, &services).unwrap();

        clock.advance(200);
        assert!(store.detect_breaches(&services).is_empty());
    }
}
