// epistemic-core/src/evidence.rs
// ============================================================================
// Module: Evidence Store
// Description: Evidence records attached to knowledge units, and the pure
// status-derivation function.
// Purpose: Own evidence independently of knowledge units (lookup via a
// target -> evidence index) and derive each unit's epistemic status.
// Dependencies: crate::bounded_store, crate::error, crate::ids, serde_json
// ============================================================================

//! ## Overview
//! Evidence is owned by [`EvidenceStore`], not by the knowledge units it
//! targets; knowledge units hold no direct pointers. [`EvidenceStore::derive_status`]
//! is a pure function of a unit's evidence set plus any sticky maintenance
//! status from that evidence plus any sticky maintenance action.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::bounded_store::BoundedHistory;
use crate::bounded_store::BoundedIndexedStore;
use crate::bounded_store::Indexed;
use crate::error::EvidenceError;
use crate::ids::Instant;
use crate::ids::Services;

/// Default ceiling for the evidence store.
pub const DEFAULT_CEILING: usize = 250_000;

/// Maintenance history ceiling per knowledge unit.
pub const MAINTENANCE_HISTORY_CEILING: usize = 100;

// ============================================================================
// SECTION: Evidence Types
// ============================================================================

/// Evidence type, one of a fixed enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceType {
    /// A link to an external source.
    SourceLink,
    /// The result of an automated test.
    TestResult,
    /// A reference from another knowledge unit.
    CrossReference,
    /// A citation.
    Citation,
    /// A replication of a prior result.
    Replication,
    /// Feedback from a user.
    UserFeedback,
}

impl EvidenceType {
    /// Parses an evidence type from its wire name.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::InvalidEvidenceType`] for unknown names.
    pub fn parse(value: &str) -> Result<Self, EvidenceError> {
        match value {
            "source_link" => Ok(Self::SourceLink),
            "test_result" => Ok(Self::TestResult),
            "cross_reference" => Ok(Self::CrossReference),
            "citation" => Ok(Self::Citation),
            "replication" => Ok(Self::Replication),
            "user_feedback" => Ok(Self::UserFeedback),
            other => Err(EvidenceError::InvalidEvidenceType(other.to_string())),
        }
    }
}

/// Direction an [`EvidenceRecord`] bears on its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// The evidence supports the target.
    Supports,
    /// The evidence refutes the target.
    Refutes,
    /// The evidence is neutral.
    Neutral,
}

impl Direction {
    /// Parses a direction from its wire name.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::InvalidDirection`] for unknown names.
    pub fn parse(value: &str) -> Result<Self, EvidenceError> {
        match value {
            "supports" => Ok(Self::Supports),
            "refutes" => Ok(Self::Refutes),
            "neutral" => Ok(Self::Neutral),
            other => Err(EvidenceError::InvalidDirection(other.to_string())),
        }
    }
}

/// A single evidence record attached to a knowledge unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Opaque identifier, `ev_...`.
    pub id: String,
    /// The knowledge unit this evidence targets.
    pub target: String,
    /// Evidence type.
    pub evidence_type: EvidenceType,
    /// Direction of effect on the target.
    pub direction: Direction,
    /// Strength in `[0, 1]`.
    pub strength: f64,
    /// Free-form payload (e.g. `{"result": "pass"}` for test results).
    pub data: Value,
    /// Identifier of whoever/whatever produced this evidence.
    pub source: String,
    /// Instant the evidence was recorded.
    pub recorded_at: Instant,
}

impl Indexed for EvidenceRecord {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

// ============================================================================
// SECTION: Derived Status
// ============================================================================

/// Derived epistemic status of a knowledge unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpistemicStatus {
    /// No evidence attached.
    Unverified,
    /// Supporting evidence only, net positive strength.
    Believed,
    /// At least one passing test result.
    Tested,
    /// Tested plus at least one supporting cross-reference.
    Verified,
    /// Both supports and refutes present with comparable strength.
    Disputed,
    /// Explicitly deprecated by a maintenance action (sticky).
    Deprecated,
    /// Explicitly retracted by a maintenance action (sticky).
    Retracted,
}

/// A sticky maintenance status set by [`EvidenceStore::deprecate`] or
/// [`EvidenceStore::retract`], plus the reasoning trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceEntry {
    /// The sticky status that was set.
    pub status: EpistemicStatus,
    /// Reason given by the caller.
    pub reason: String,
    /// Optional successor unit id (for deprecation).
    pub successor_id: Option<String>,
    /// Optional evidence id that triggered a retraction.
    pub evidence_id: Option<String>,
    /// Instant the maintenance action was recorded.
    pub recorded_at: Instant,
}

#[derive(Debug, Clone, Default)]
struct MaintenanceState {
    sticky: Option<EpistemicStatus>,
    history: Option<BoundedHistory<MaintenanceEntry>>,
}

// ============================================================================
// SECTION: Evidence Store
// ============================================================================

/// Holds evidence records keyed by id with a target -> evidence index, plus
/// sticky maintenance status per knowledge unit.
pub struct EvidenceStore {
    store: BoundedIndexedStore<EvidenceRecord>,
    maintenance: BTreeMap<String, MaintenanceState>,
}

impl EvidenceStore {
    /// Creates a new evidence store with the given ceiling
    /// (`0` means unbounded; see [`DEFAULT_CEILING`]).
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        let store = BoundedIndexedStore::new(ceiling)
            .with_index("target", |e: &EvidenceRecord| vec![e.target.clone()]);
        Self {
            store,
            maintenance: BTreeMap::new(),
        }
    }

    /// Attaches a new evidence record to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`EvidenceError::InvalidEvidenceType`], [`EvidenceError::InvalidDirection`],
    /// or [`EvidenceError::InvalidStrength`] if the input is malformed.
    #[allow(clippy::too_many_arguments, reason = "mirrors the evidence attachment contract verbatim")]
    pub fn attach(
        &mut self,
        target: impl Into<String>,
        evidence_type: EvidenceType,
        direction: Direction,
        strength: f64,
        data: Value,
        source: impl Into<String>,
        services: &Services,
    ) -> Result<EvidenceRecord, EvidenceError> {
        if !(0.0..=1.0).contains(&strength) {
            return Err(EvidenceError::InvalidStrength(strength));
        }
        let record = EvidenceRecord {
            id: services.new_id("ev"),
            target: target.into(),
            evidence_type,
            direction,
            strength,
            data,
            source: source.into(),
            recorded_at: services.now(),
        };
        self.store.put(record.clone());
        Ok(record)
    }

    /// Returns every evidence record attached to `ku_id`.
    #[must_use]
    pub fn evidence_for(&self, ku_id: &str) -> Vec<&EvidenceRecord> {
        self.store
            .by_index("target", ku_id)
            .into_iter()
            .filter_map(|id| self.store.get(&id))
            .collect()
    }

    /// Derives the epistemic status of `ku_id` from its evidence set and any
    /// sticky maintenance status.
    ///
    /// This is a pure function of the currently stored evidence: replaying
    /// the same evidence set always derives the same status.
    #[must_use]
    pub fn derive_status(&self, ku_id: &str) -> EpistemicStatus {
        if let Some(sticky) = self.maintenance.get(ku_id).and_then(|m| m.sticky) {
            return sticky;
        }
        let evidence = self.evidence_for(ku_id);
        if evidence.is_empty() {
            return EpistemicStatus::Unverified;
        }

        let supports_strength: f64 = evidence
            .iter()
            .filter(|e| e.direction == Direction::Supports)
            .map(|e| e.strength)
            .sum();
        let refutes_strength: f64 = evidence
            .iter()
            .filter(|e| e.direction == Direction::Refutes)
            .map(|e| e.strength)
            .sum();

        if supports_strength > 0.0
            && refutes_strength > 0.0
            && (supports_strength - refutes_strength).abs()
                <= 0.3 * supports_strength.max(refutes_strength)
        {
            return EpistemicStatus::Disputed;
        }

        let has_passing_test = evidence.iter().any(|e| {
            e.evidence_type == EvidenceType::TestResult
                && e.data.get("result").and_then(Value::as_str) == Some("pass")
        });
        let has_supporting_cross_reference = evidence
            .iter()
            .any(|e| e.evidence_type == EvidenceType::CrossReference && e.direction == Direction::Supports);

        if has_passing_test && has_supporting_cross_reference {
            EpistemicStatus::Verified
        } else if has_passing_test {
            EpistemicStatus::Tested
        } else {
            EpistemicStatus::Believed
        }
    }

    /// Sets the `deprecated` sticky status on `ku_id` and records a
    /// maintenance history entry.
    pub fn deprecate(
        &mut self,
        ku_id: &str,
        reason: impl Into<String>,
        successor_id: Option<String>,
        services: &Services,
    ) {
        self.set_sticky(
            ku_id,
            EpistemicStatus::Deprecated,
            reason.into(),
            successor_id,
            None,
            services,
        );
    }

    /// Sets the `retracted` sticky status on `ku_id` and records a
    /// maintenance history entry.
    pub fn retract(
        &mut self,
        ku_id: &str,
        reason: impl Into<String>,
        evidence_id: Option<String>,
        services: &Services,
    ) {
        self.set_sticky(
            ku_id,
            EpistemicStatus::Retracted,
            reason.into(),
            None,
            evidence_id,
            services,
        );
    }

    fn set_sticky(
        &mut self,
        ku_id: &str,
        status: EpistemicStatus,
        reason: String,
        successor_id: Option<String>,
        evidence_id: Option<String>,
        services: &Services,
    ) {
        let entry = self.maintenance.entry(ku_id.to_string()).or_default();
        entry.sticky = Some(status);
        let history = entry
            .history
            .get_or_insert_with(|| BoundedHistory::new(MAINTENANCE_HISTORY_CEILING));
        history.push(MaintenanceEntry {
            status,
            reason,
            successor_id,
            evidence_id,
            recorded_at: services.now(),
        });
    }

    /// Returns the maintenance history for `ku_id`, oldest first.
    pub fn maintenance_history(&self, ku_id: &str) -> impl Iterator<Item = &MaintenanceEntry> {
        self.maintenance
            .get(ku_id)
            .and_then(|m| m.history.as_ref())
            .into_iter()
            .flat_map(BoundedHistory::iter)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ManualClock;
    use serde_json::json;
    use std::sync::Arc;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    #[test]
    fn empty_evidence_is_unverified() {
        let store = EvidenceStore::new(0);
        assert_eq!(store.derive_status("ku_1"), EpistemicStatus::Unverified);
    }

    #[test]
    fn supports_only_is_believed() {
        let services = services();
        let mut store = EvidenceStore::new(0);
        store
            .attach(
                "ku_1",
                EvidenceType::SourceLink,
                Direction::Supports,
                0.6,
                json!({}),
                "src",
                &services,
            )
            .unwrap();
        assert_eq!(store.derive_status("ku_1"), EpistemicStatus::Believed);
    }

    #[test]
    fn passing_test_is_tested() {
        let services = services();
        let mut store = EvidenceStore::new(0);
        store
            .attach(
                "ku_1",
                EvidenceType::TestResult,
                Direction::Supports,
                0.8,
                json!({"result": "pass"}),
                "ci",
                &services,
            )
            .unwrap();
        assert_eq!(store.derive_status("ku_1"), EpistemicStatus::Tested);
    }

    #[test]
    fn passing_test_plus_cross_reference_is_verified() {
        let services = services();
        let mut store = EvidenceStore::new(0);
        store
            .attach(
                "ku_1",
                EvidenceType::TestResult,
                Direction::Supports,
                0.8,
                json!({"result": "pass"}),
                "ci",
                &services,
            )
            .unwrap();
        store
            .attach(
                "ku_1",
                EvidenceType::CrossReference,
                Direction::Supports,
                0.5,
                json!({}),
                "ku_2",
                &services,
            )
            .unwrap();
        assert_eq!(store.derive_status("ku_1"), EpistemicStatus::Verified);
    }

    #[test]
    fn comparable_supports_and_refutes_is_disputed() {
        let services = services();
        let mut store = EvidenceStore::new(0);
        store
            .attach("ku_1", EvidenceType::SourceLink, Direction::Supports, 0.5, json!({}), "a", &services)
            .unwrap();
        store
            .attach("ku_1", EvidenceType::SourceLink, Direction::Refutes, 0.45, json!({}), "b", &services)
            .unwrap();
        assert_eq!(store.derive_status("ku_1"), EpistemicStatus::Disputed);
    }

    #[test]
    fn lopsided_refutes_is_not_disputed() {
        let services = services();
        let mut store = EvidenceStore::new(0);
        store
            .attach("ku_1", EvidenceType::SourceLink, Direction::Supports, 0.9, json!({}), "a", &services)
            .unwrap();
        store
            .attach("ku_1", EvidenceType::SourceLink, Direction::Refutes, 0.1, json!({}), "b", &services)
            .unwrap();
        assert_eq!(store.derive_status("ku_1"), EpistemicStatus::Believed);
    }

    #[test]
    fn deprecate_is_sticky_over_new_evidence() {
        let services = services();
        let mut store = EvidenceStore::new(0);
        store.deprecate("ku_1", "superseded", None, &services);
        store
            .attach(
                "ku_1",
                EvidenceType::TestResult,
                Direction::Supports,
                1.0,
                json!({"result": "pass"}),
                "ci",
                &services,
            )
            .unwrap();
        assert_eq!(store.derive_status("ku_1"), EpistemicStatus::Deprecated);
        assert_eq!(store.maintenance_history("ku_1").count(), 1);
    }

    #[test]
    fn invalid_strength_is_rejected() {
        let services = services();
        let mut store = EvidenceStore::new(0);
        let err = store
            .attach("ku_1", EvidenceType::SourceLink, Direction::Supports, 1.5, json!({}), "a", &services)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_strength");
    }

    #[test]
    fn status_derivation_is_idempotent_under_replay() {
        let services = services();
        let mut store = EvidenceStore::new(0);
        store
            .attach("ku_1", EvidenceType::SourceLink, Direction::Supports, 0.6, json!({}), "a", &services)
            .unwrap();
        let first = store.derive_status("ku_1");
        let second = store.derive_status("ku_1");
        assert_eq!(first, second);
    }
}
