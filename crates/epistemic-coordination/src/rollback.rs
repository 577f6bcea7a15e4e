// epistemic-coordination/src/rollback.rs
// ============================================================================
// Module: Rollback Coordinator
// Description: Multi-actor rollback coordination: every participant
// checkpoints before any of them rolls back.
// Dependencies: epistemic-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`RollbackCoordination`] holds one checkpoint slot per participating
//! actor. It moves from `initiated` to `ready` once every actor has
//! recorded a checkpoint, and [`RollbackCoordination::execute`] — callable
//! only while `ready` — marks every slot rolled back and the coordination
//! `completed`.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use epistemic_core::Instant;
use epistemic_core::Services;

use crate::error::RollbackError;

/// Status of a [`RollbackCoordination`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackStatus {
    /// Waiting for every actor to checkpoint.
    Initiated,
    /// Every actor has checkpointed; `execute` may be called.
    Ready,
    /// Every actor has rolled back.
    Completed,
}

/// Status of a single actor's rollback slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// Waiting for this actor to record a checkpoint.
    Pending,
    /// A checkpoint has been recorded for this actor.
    Checkpointed,
    /// This actor's checkpoint has been restored.
    RolledBack,
}

/// One actor's rollback slot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackSlot {
    /// The actor this slot belongs to.
    pub actor: String,
    /// Current slot status.
    pub status: SlotStatus,
    /// The actor-supplied checkpoint snapshot, once recorded.
    pub snapshot: Option<Value>,
}

/// A multi-actor rollback coordination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackCoordination {
    /// Opaque id, prefixed `rb_`.
    pub id: String,
    /// Free-form reason for the rollback.
    pub reason: String,
    /// Current status.
    pub status: RollbackStatus,
    /// One slot per participating actor.
    pub slots: Vec<RollbackSlot>,
    /// When this coordination was initiated.
    pub created_at: Instant,
}

impl epistemic_core::Indexed for RollbackCoordination {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

impl RollbackCoordination {
    fn slot_mut(&mut self, actor: &str) -> Option<&mut RollbackSlot> {
        self.slots.iter_mut().find(|s| s.actor == actor)
    }

    fn recompute_status(&mut self) {
        match self.status {
            RollbackStatus::Initiated if self.slots.iter().all(|s| matches!(s.status, SlotStatus::Checkpointed | SlotStatus::RolledBack)) => {
                self.status = RollbackStatus::Ready;
            }
            RollbackStatus::Ready if self.slots.iter().all(|s| matches!(s.status, SlotStatus::RolledBack)) => {
                self.status = RollbackStatus::Completed;
            }
            _ => {}
        }
    }

    /// Records `actor`'s checkpoint snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::NotFound`] if `actor` has no slot in this
    /// coordination.
    pub fn checkpoint(&mut self, actor: &str, snapshot: Value) -> Result<(), RollbackError> {
        let id = self.id.clone();
        let slot = self.slot_mut(actor).ok_or_else(|| RollbackError::NotFound { id: id.clone() })?;
        slot.status = SlotStatus::Checkpointed;
        slot.snapshot = Some(snapshot);
        self.recompute_status();
        Ok(())
    }

    /// Rolls back every slot, moving the coordination to `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::NotReady`] unless every actor has already
    /// checkpointed.
    pub fn execute(&mut self) -> Result<(), RollbackError> {
        if self.status != RollbackStatus::Ready {
            return Err(RollbackError::NotReady { id: self.id.clone() });
        }
        for slot in &mut self.slots {
            slot.status = SlotStatus::RolledBack;
        }
        self.status = RollbackStatus::Completed;
        Ok(())
    }
}

/// Bounded, indexed store of [`RollbackCoordination`]s.
pub struct RollbackStore {
    store: epistemic_core::BoundedIndexedStore<RollbackCoordination>,
}

/// Default ceiling for the rollback store before FIFO eviction kicks in.
pub const DEFAULT_CEILING: usize = 2_000;

impl RollbackStore {
    /// Creates an empty rollback store with the given ceiling (0 =
    /// unbounded).
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            store: epistemic_core::BoundedIndexedStore::new(ceiling),
        }
    }

    /// Initiates a new rollback coordination across `actors`.
    pub fn initiate(&mut self, reason: impl Into<String>, actors: Vec<String>, services: &Services) -> RollbackCoordination {
        let coordination = RollbackCoordination {
            id: services.new_id("rb"),
            reason: reason.into(),
            status: RollbackStatus::Initiated,
            slots: actors
                .into_iter()
                .map(|actor| RollbackSlot {
                    actor,
                    status: SlotStatus::Pending,
                    snapshot: None,
                })
                .collect(),
            created_at: services.now(),
        };
        self.store.put(coordination.clone());
        coordination
    }

    /// Looks up a coordination by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RollbackCoordination> {
        self.store.get(id)
    }

    /// Mutates the coordination with the given id via `f`, persisting the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`RollbackError::NotFound`] if no such coordination exists,
    /// or whatever error `f` returns.
    pub fn with_mut<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut RollbackCoordination) -> Result<T, RollbackError>,
    ) -> Result<T, RollbackError> {
        let mut coordination = self.store.get(id).cloned().ok_or_else(|| RollbackError::NotFound { id: id.to_string() })?;
        let result = f(&mut coordination)?;
        self.store.put(coordination);
        Ok(result)
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
    fn becomes_ready_only_once_every_actor_checkpoints() {
        let services = services();
        let mut store = RollbackStore::new(0);
        let coordination = store.initiate("bad deploy", vec!["a".to_string(), "b".to_string()], &services);

        store.with_mut(&coordination.id, |c| c.checkpoint("a", serde_json::json!({"state": 1}))).unwrap();
        assert_eq!(store.get(&coordination.id).unwrap().status, RollbackStatus::Initiated);

        store.with_mut(&coordination.id, |c| c.checkpoint("b", serde_json::json!({"state": 2}))).unwrap();
        assert_eq!(store.get(&coordination.id).unwrap().status, RollbackStatus::Ready);
    }

    #[test]
    fn execute_before_ready_is_rejected() {
        let services = services();
        let mut store = RollbackStore::new(0);
        let coordination = store.initiate("bad deploy", vec!["a".to_string()], &services);

        let err = store.with_mut(&coordination.id, RollbackCoordination::execute).unwrap_err();
        assert_eq!(err.code(), "not_ready");
    }

    #[test]
    fn execute_rolls_back_every_slot() {
        let services = services();
        let mut store = RollbackStore::new(0);
        let coordination = store.initiate("bad deploy", vec!["a".to_string(), "b".to_string()], &services);
        store.with_mut(&coordination.id, |c| c.checkpoint("a", Value::Null)).unwrap();
        store.with_mut(&coordination.id, |c| c.checkpoint("b", Value::Null)).unwrap();

        store.with_mut(&coordination.id, RollbackCoordination::execute).unwrap();
        let final_state = store.get(&coordination.id).unwrap();
        assert_eq!(final_state.status, RollbackStatus::Completed);
        assert!(final_state.slots.iter().all(|s| s.status == SlotStatus::RolledBack));
    }
}
