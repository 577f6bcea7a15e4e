// epistemic-core/src/truth.rs
// ============================================================================
// Module: Truth Lifecycle
// Description: Per-knowledge-unit state machine and stagnation detection.
// Purpose: Track the epistemic maturity of a knowledge unit independently of
// its evidence-derived status.
// Dependencies: crate::bounded_store, crate::error, crate::ids
// ============================================================================

//! ## Overview
//! Every knowledge unit carries a truth-lifecycle state, distinct from the
//! evidence-derived [`crate::evidence::EpistemicStatus`]: `born`, `challenged`,
//! `stabilized`, `decaying`, `dead`, with `rolled_back` reachable as a
//! terminal transition from any non-`dead` state, and `dead -> born` (rebirth)
//! permitted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

use crate::bounded_store::BoundedHistory;
use crate::error::TruthError;
use crate::ids::Instant;
use crate::ids::Services;

/// Per-unit transition history ceiling.
pub const HISTORY_CEILING: usize = 100;

// ============================================================================
// SECTION: State
// ============================================================================

/// A knowledge unit's position in the truth lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruthState {
    /// Newly created, not yet challenged.
    Born,
    /// Under active dispute.
    Challenged,
    /// Survived challenge, considered reliable.
    Stabilized,
    /// Losing relevance or support over time.
    Decaying,
    /// No longer considered live.
    Dead,
    /// Explicitly reverted; terminal.
    RolledBack,
}

impl TruthState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Born => "born",
            Self::Challenged => "challenged",
            Self::Stabilized => "stabilized",
            Self::Decaying => "decaying",
            Self::Dead => "dead",
            Self::RolledBack => "rolled_back",
        }
    }

    /// Returns `true` if `to` is a permitted transition from `self`.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        match (self, to) {
            // rolled_back reachable from any non-dead, non-rolled_back state.
            (Self::RolledBack, _) => false,
            (_, Self::RolledBack) => !matches!(self, Self::Dead),
            (Self::Dead, Self::Born) => true,
            (Self::Dead, _) => false,
            (Self::Born, Self::Challenged | Self::Stabilized | Self::Decaying | Self::Dead) => true,
            (Self::Challenged, Self::Stabilized | Self::Decaying | Self::Dead) => true,
            (Self::Stabilized, Self::Challenged | Self::Decaying | Self::Dead) => true,
            (Self::Decaying, Self::Challenged | Self::Stabilized | Self::Dead) => true,
            _ => false,
        }
    }
}

/// A single recorded transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TruthTransition {
    /// State transitioned from.
    pub from: TruthState,
    /// State transitioned to.
    pub to: TruthState,
    /// Caller-supplied reason.
    pub reason: String,
    /// Actor responsible for the transition.
    pub actor: String,
    /// Instant the transition was recorded.
    pub recorded_at: Instant,
}

struct UnitLifecycle {
    state: TruthState,
    last_activity: Instant,
    history: BoundedHistory<TruthTransition>,
}

/// Result of [`TruthLifecycle::detect_stagnation`] for one knowledge unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StagnationFlag {
    /// Age past the threshold, in milliseconds.
    pub idle_millis: u64,
    /// `min(1, age / (10 * threshold))`.
    pub score: f64,
}

// ============================================================================
// SECTION: Lifecycle Store
// ============================================================================

/// Tracks the truth-lifecycle state of every knowledge unit that has been
/// born into it.
#[derive(Default)]
pub struct TruthLifecycle {
    units: BTreeMap<String, UnitLifecycle>,
}

impl TruthLifecycle {
    /// Creates an empty lifecycle store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the birth of `ku_id`. Re-birthing an already-tracked unit is a
    /// no-op that does not reset its history.
    pub fn birth(&mut self, ku_id: impl Into<String>, services: &Services) {
        let ku_id = ku_id.into();
        self.units.entry(ku_id).or_insert_with(|| UnitLifecycle {
            state: TruthState::Born,
            last_activity: services.now(),
            history: BoundedHistory::new(HISTORY_CEILING),
        });
    }

    /// Returns the current state of `ku_id`.
    #[must_use]
    pub fn state(&self, ku_id: &str) -> Option<TruthState> {
        self.units.get(ku_id).map(|u| u.state)
    }

    /// Attempts to transition `ku_id` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`TruthError::NotFound`] if `ku_id` has no recorded birth, or
    /// [`TruthError::InvalidTransition`] if `to` is not reachable from the
    /// unit's current state.
    pub fn transition(
        &mut self,
        ku_id: &str,
        to: TruthState,
        reason: impl Into<String>,
        actor: impl Into<String>,
        services: &Services,
    ) -> Result<TruthState, TruthError> {
        let unit = self.units.get_mut(ku_id).ok_or_else(|| TruthError::NotFound { id: ku_id.to_string() })?;
        if !unit.state.can_transition_to(to) {
            return Err(TruthError::InvalidTransition {
                from: unit.state.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        let now = services.now();
        unit.history.push(TruthTransition {
            from: unit.state,
            to,
            reason: reason.into(),
            actor: actor.into(),
            recorded_at: now,
        });
        unit.state = to;
        unit.last_activity = now;
        Ok(to)
    }

    /// Returns the transition history for `ku_id`, oldest first.
    pub fn history(&self, ku_id: &str) -> impl Iterator<Item = &TruthTransition> {
        self.units.get(ku_id).into_iter().flat_map(|u| u.history.iter())
    }

    /// Flags every non-dead, non-rolled-back unit whose last activity is
    /// more than `threshold_millis` behind `now`.
    #[must_use]
    pub fn detect_stagnation(&self, threshold_millis: u64, now: Instant) -> BTreeMap<String, StagnationFlag> {
        let mut flags = BTreeMap::new();
        if threshold_millis == 0 {
            return flags;
        }
        for (id, unit) in &self.units {
            if matches!(unit.state, TruthState::Dead | TruthState::RolledBack) {
                continue;
            }
            let idle = now.millis_since(unit.last_activity);
            if idle > threshold_millis {
                #[allow(clippy::cast_precision_loss, reason = "stagnation score is a bounded display ratio, not an exact count")]
                let score = (idle as f64 / (10.0 * threshold_millis as f64)).min(1.0);
                flags.insert(id.clone(), StagnationFlag { idle_millis: idle, score });
            }
        }
        flags
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ManualClock;
    use std::sync::Arc;

    fn services() -> (Services, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Instant::from_millis(0)));
        (Services::with_clock(clock.clone()), clock)
    }

    #[test]
    fn birth_starts_in_born_state() {
        let (services, _clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        lifecycle.birth("ku_1", &services);
        assert_eq!(lifecycle.state("ku_1"), Some(TruthState::Born));
    }

    #[test]
    fn happy_path_transitions_are_accepted() {
        let (services, _clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        lifecycle.birth("ku_1", &services);
        lifecycle.transition("ku_1", TruthState::Challenged, "disputed", "reviewer", &services).unwrap();
        lifecycle.transition("ku_1", TruthState::Stabilized, "survived review", "reviewer", &services).unwrap();
        lifecycle.transition("ku_1", TruthState::Decaying, "stale", "scheduler", &services).unwrap();
        lifecycle.transition("ku_1", TruthState::Dead, "superseded", "scheduler", &services).unwrap();
        assert_eq!(lifecycle.state("ku_1"), Some(TruthState::Dead));
        assert_eq!(lifecycle.history("ku_1").count(), 4);
    }

    #[test]
    fn rebirth_from_dead_is_allowed() {
        let (services, _clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        lifecycle.birth("ku_1", &services);
        lifecycle.transition("ku_1", TruthState::Dead, "x", "a", &services).unwrap();
        lifecycle.transition("ku_1", TruthState::Born, "revived", "a", &services).unwrap();
        assert_eq!(lifecycle.state("ku_1"), Some(TruthState::Born));
    }

    #[test]
    fn rolled_back_reachable_from_any_non_dead_state() {
        let (services, _clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        lifecycle.birth("ku_1", &services);
        lifecycle.transition("ku_1", TruthState::Challenged, "x", "a", &services).unwrap();
        lifecycle.transition("ku_1", TruthState::RolledBack, "bad call", "a", &services).unwrap();
        assert_eq!(lifecycle.state("ku_1"), Some(TruthState::RolledBack));
    }

    #[test]
    fn rolled_back_is_terminal() {
        let (services, _clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        lifecycle.birth("ku_1", &services);
        lifecycle.transition("ku_1", TruthState::RolledBack, "x", "a", &services).unwrap();
        let err = lifecycle.transition("ku_1", TruthState::Born, "y", "a", &services).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn dead_cannot_go_anywhere_but_born() {
        let (services, _clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        lifecycle.birth("ku_1", &services);
        lifecycle.transition("ku_1", TruthState::Dead, "x", "a", &services).unwrap();
        let err = lifecycle.transition("ku_1", TruthState::Challenged, "y", "a", &services).unwrap_err();
        assert_eq!(err.code(), "invalid_transition");
    }

    #[test]
    fn unknown_unit_is_not_found() {
        let (services, _clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        let err = lifecycle.transition("ku_missing", TruthState::Dead, "x", "a", &services).unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn stagnation_is_flagged_past_threshold_with_bounded_score() {
        let (services, clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        lifecycle.birth("ku_1", &services);
        clock.advance(1_000);
        let flags = lifecycle.detect_stagnation(500, clock.now());
        let flag = flags.get("ku_1").unwrap();
        assert_eq!(flag.idle_millis, 1_000);
        assert!((flag.score - 0.2).abs() < 1e-9);
    }

    #[test]
    fn dead_units_are_excluded_from_stagnation() {
        let (services, clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        lifecycle.birth("ku_1", &services);
        lifecycle.transition("ku_1", TruthState::Dead, "x", "a", &services).unwrap();
        clock.advance(10_000);
        let flags = lifecycle.detect_stagnation(500, clock.now());
        assert!(flags.is_empty());
    }

    #[test]
    fn stagnation_score_saturates_at_one() {
        let (services, clock) = services();
        let mut lifecycle = TruthLifecycle::new();
        lifecycle.birth("ku_1", &services);
        clock.advance(1_000_000);
        let flags = lifecycle.detect_stagnation(10, clock.now());
        assert!((flags.get("ku_1").unwrap().score - 1.0).abs() < 1e-9);
    }
}
