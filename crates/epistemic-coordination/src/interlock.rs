// epistemic-coordination/src/interlock.rs
// ============================================================================
// Module: Interlocks
// Description: Mutual exclusion, ordered admission, barriers, approval
// gates, and timed locks shared by coordinating actors.
// Dependencies: epistemic-core
// ============================================================================

//! ## Overview
//! An [`Interlock`] gates concurrent access among actors per one of five
//! disciplines: [`InterlockKind::Mutex`] (single holder, FIFO queue),
//! [`InterlockKind::Ordered`] (admits only in nondecreasing sequence-key
//! order), [`InterlockKind::Barrier`] (releases once N distinct actors have
//! arrived), [`InterlockKind::Gate`] (closed until an approver opens it),
//! and [`InterlockKind::Timeout`] (a mutex that force-releases its holder
//! once held past a configured duration).

use std::collections::BTreeSet;
use std::collections::VecDeque;

use epistemic_core::Instant;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;

use crate::error::InterlockError;

/// The admission discipline an [`Interlock`] enforces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum InterlockKind {
    /// At most one holder at a time; waiters queue FIFO.
    Mutex,
    /// At most one holder at a time; waiters are admitted only if their
    /// declared sequence key is not lower than the last admitted key.
    Ordered,
    /// Releases every waiter, all at once, once `arrivals` distinct actors
    /// have called `acquire` in the current round.
    Barrier {
        /// Number of distinct actors required to release the barrier.
        arrivals: usize,
    },
    /// Closed to every acquirer until `approver` calls
    /// [`Interlock::approve_gate`]; then admits waiters up to `max_holders`.
    Gate {
        /// The only actor allowed to approve this gate.
        approver: String,
        /// Maximum concurrent holders once approved.
        max_holders: usize,
    },
    /// Behaves as [`InterlockKind::Mutex`], but a holder exceeding
    /// `hold_millis` is force-released on the next acquire attempt.
    Timeout {
        /// Maximum hold duration in milliseconds.
        hold_millis: u64,
    },
}

/// Outcome of [`Interlock::acquire`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquireResult {
    /// Whether the caller was admitted immediately.
    pub acquired: bool,
    /// The caller's position in the wait queue if not admitted (0 = next).
    pub queue_position: Option<usize>,
}

#[derive(Debug, Clone)]
struct Holder {
    actor: String,
    acquired_at: Instant,
    sequence_key: i64,
}

/// An interlock instance.
#[derive(Debug, Clone)]
pub struct Interlock {
    /// Opaque id, prefixed `il_`.
    pub id: String,
    /// The admission discipline.
    pub kind: InterlockKind,
    current_holders: Vec<Holder>,
    waiters: VecDeque<(String, i64)>,
    barrier_arrived: BTreeSet<String>,
    barrier_released: bool,
    gate_approved: bool,
}

impl Interlock {
    /// Creates a new interlock of the given kind.
    #[must_use]
    pub fn new(kind: InterlockKind, services: &Services) -> Self {
        Self {
            id: services.new_id("il"),
            kind,
            current_holders: Vec::new(),
            waiters: VecDeque::new(),
            barrier_arrived: BTreeSet::new(),
            barrier_released: false,
            gate_approved: false,
        }
    }

    fn max_holders(&self) -> usize {
        match &self.kind {
            InterlockKind::Mutex | InterlockKind::Ordered | InterlockKind::Timeout { .. } => 1,
            InterlockKind::Gate { max_holders, .. } => *max_holders,
            InterlockKind::Barrier { .. } => usize::MAX,
        }
    }

    fn expire_timed_out_holder(&mut self, now: Instant) {
        if let InterlockKind::Timeout { hold_millis } = &self.kind {
            self.current_holders.retain(|h| now.millis_since(h.acquired_at) <= *hold_millis);
        }
    }

    fn promote_waiters(&mut self, now: Instant) {
        while self.current_holders.len() < self.max_holders() {
            let Some((actor, sequence_key)) = self.waiters.front().cloned() else {
                break;
            };
            if matches!(self.kind, InterlockKind::Ordered) {
                let last_admitted = self.current_holders.iter().map(|h| h.sequence_key).max();
                if let Some(last) = last_admitted {
                    if sequence_key < last {
                        break;
                    }
                }
            }
            self.waiters.pop_front();
            self.current_holders.push(Holder {
                actor,
                acquired_at: now,
                sequence_key,
            });
        }
    }

    /// Attempts to admit `actor`, queueing it if the interlock is full.
    /// `sequence_key` is consulted only by [`InterlockKind::Ordered`].
    pub fn acquire(&mut self, actor: impl Into<String>, sequence_key: i64, now: Instant) -> AcquireResult {
        let actor = actor.into();
        self.expire_timed_out_holder(now);

        if let InterlockKind::Barrier { arrivals } = &self.kind {
            self.barrier_arrived.insert(actor.clone());
            if self.barrier_arrived.len() >= *arrivals {
                self.barrier_released = true;
            }
            return AcquireResult {
                acquired: self.barrier_released,
                queue_position: None,
            };
        }

        if matches!(self.kind, InterlockKind::Gate { .. }) && !self.gate_approved {
            if !self.waiters.iter().any(|(a, _)| a == &actor) {
                self.waiters.push_back((actor, sequence_key));
            }
            return AcquireResult {
                acquired: false,
                queue_position: Some(self.waiters.len().saturating_sub(1)),
            };
        }

        if self.current_holders.len() < self.max_holders()
            && (!matches!(self.kind, InterlockKind::Ordered) || self.ordered_admits(sequence_key))
        {
            self.current_holders.push(Holder {
                actor,
                acquired_at: now,
                sequence_key,
            });
            return AcquireResult {
                acquired: true,
                queue_position: None,
            };
        }

        if !self.waiters.iter().any(|(a, _)| a == &actor) {
            self.waiters.push_back((actor, sequence_key));
        }
        AcquireResult {
            acquired: false,
            queue_position: Some(self.waiters.len().saturating_sub(1)),
        }
    }

    fn ordered_admits(&self, sequence_key: i64) -> bool {
        self.current_holders.iter().map(|h| h.sequence_key).max().is_none_or(|last| sequence_key >= last)
    }

    /// Releases `actor`'s hold, promoting queued waiters where the
    /// discipline allows it.
    pub fn release(&mut self, actor: &str, now: Instant) {
        self.current_holders.retain(|h| h.actor != actor);
        self.waiters.retain(|(a, _)| a != actor);
        self.promote_waiters(now);
    }

    /// Approves a [`InterlockKind::Gate`], opening it to queued waiters.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::NotTheApprover`] if `actor` is not the
    /// configured approver.
    pub fn approve_gate(&mut self, actor: &str, now: Instant) -> Result<(), InterlockError> {
        let InterlockKind::Gate { approver, .. } = &self.kind else {
            return Ok(());
        };
        if approver != actor {
            return Err(InterlockError::NotTheApprover {
                id: self.id.clone(),
                actor: actor.to_string(),
            });
        }
        self.gate_approved = true;
        self.promote_waiters(now);
        Ok(())
    }

    /// Returns the actors currently holding this interlock.
    #[must_use]
    pub fn holders(&self) -> Vec<&str> {
        self.current_holders.iter().map(|h| h.actor.as_str()).collect()
    }
}

/// Bounded registry of [`Interlock`]s.
pub struct InterlockStore {
    store: epistemic_core::BoundedIndexedStore<Interlock>,
}

impl epistemic_core::Indexed for Interlock {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

/// Default ceiling for the interlock store before FIFO eviction kicks in.
pub const DEFAULT_CEILING: usize = 10_000;

impl InterlockStore {
    /// Creates an empty interlock store with the given ceiling (0 =
    /// unbounded).
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            store: epistemic_core::BoundedIndexedStore::new(ceiling),
        }
    }

    /// Creates and registers a new interlock.
    pub fn create(&mut self, kind: InterlockKind, services: &Services) -> Interlock {
        let interlock = Interlock::new(kind, services);
        self.store.put(interlock.clone());
        interlock
    }

    /// Looks up an interlock by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Interlock> {
        self.store.get(id)
    }

    /// Mutates the interlock with the given id via `f`, persisting the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`InterlockError::NotFound`] if no such interlock exists, or
    /// whatever error `f` returns.
    pub fn with_mut<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Interlock) -> Result<T, InterlockError>,
    ) -> Result<T, InterlockError> {
        let mut record = self.store.get(id).cloned().ok_or_else(|| InterlockError::NotFound { id: id.to_string() })?;
        let result = f(&mut record)?;
        self.store.put(record);
        Ok(result)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
