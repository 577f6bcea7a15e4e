// epistemic-scheduler/src/outcome.rs
// ============================================================================
// Module: Outcome Store & Role Affinity
// Description: Append-only record of what happened after a work item was
// dispatched, plus the role/work-type affinity table derived from it.
// Dependencies: epistemic-core, serde
// ============================================================================

//! ## Overview
//! Every dispatched [`crate::work_item::WorkItem`] eventually produces an
//! [`OutcomeRecord`]: a signal name (e.g. `"user_accepted"`), whether that
//! signal counts as positive, and the numeric signal values that were true
//! at dispatch time (impact, risk, urgency, confidence, ...). The weight
//! learner in [`crate::learner`] correlates those values against the
//! positive/negative split to retune scheduling weights; [`AffinityTable`]
//! tracks which role tends to succeed at which work type.

use std::collections::BTreeMap;

use epistemic_core::BoundedIndexedStore;
use epistemic_core::Indexed;
use epistemic_core::Instant;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;

/// Default ceiling for the outcome store before FIFO eviction kicks in.
pub const DEFAULT_CEILING: usize = 100_000;

/// A single recorded consequence of a dispatched work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Opaque id, prefixed `oc_`.
    pub id: String,
    /// The work item this outcome is about.
    pub work_item_id: String,
    /// The allocation (assignment) this outcome is about, if tracked.
    pub allocation_id: Option<String>,
    /// The actor (role or agent identity) the work was assigned to.
    pub emergent_id: String,
    /// The work item's type, carried for affinity lookups.
    pub work_type: String,
    /// Outcome category, e.g. `"user_accepted"` or `"user_rejected"`.
    pub signal: String,
    /// Whether `signal` counts as a positive outcome.
    pub positive: bool,
    /// Named numeric signal values observed at dispatch time.
    pub signal_values: BTreeMap<String, f64>,
    /// When this outcome was recorded.
    pub recorded_at: Instant,
}

impl Indexed for OutcomeRecord {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

/// Inputs for [`OutcomeStore::record`].
#[derive(Debug, Clone)]
pub struct NewOutcome {
    /// The work item this outcome is about.
    pub work_item_id: String,
    /// The allocation this outcome is about, if tracked.
    pub allocation_id: Option<String>,
    /// The actor the work was assigned to.
    pub emergent_id: String,
    /// The work item's type.
    pub work_type: String,
    /// Outcome category name.
    pub signal: String,
    /// Whether `signal` counts as positive.
    pub positive: bool,
    /// Named numeric signal values observed at dispatch time.
    pub signal_values: BTreeMap<String, f64>,
}

/// Append-only, indexed store of [`OutcomeRecord`]s plus the role/work-type
/// affinity table derived from them.
pub struct OutcomeStore {
    records: BoundedIndexedStore<OutcomeRecord>,
    affinity: AffinityTable,
}

impl OutcomeStore {
    /// Creates an empty outcome store with the given ceiling (0 = unbounded).
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            records: BoundedIndexedStore::new(ceiling)
                .with_index("work_item_id", |r: &OutcomeRecord| vec![r.work_item_id.clone()])
                .with_index("allocation_id", |r: &OutcomeRecord| {
                    r.allocation_id.clone().into_iter().collect()
                })
                .with_index("emergent_id", |r: &OutcomeRecord| vec![r.emergent_id.clone()])
                .with_index("work_type", |r: &OutcomeRecord| vec![r.work_type.clone()])
                .with_index("signal", |r: &OutcomeRecord| vec![r.signal.clone()]),
            affinity: AffinityTable::default(),
        }
    }

    /// Records a new outcome, folding it into the affinity table.
    pub fn record(&mut self, new: NewOutcome, services: &Services) -> OutcomeRecord {
        let record = OutcomeRecord {
            id: services.new_id("oc"),
            work_item_id: new.work_item_id,
            allocation_id: new.allocation_id,
            emergent_id: new.emergent_id,
            work_type: new.work_type,
            signal: new.signal,
            positive: new.positive,
            signal_values: new.signal_values,
            recorded_at: services.now(),
        };
        self.affinity.observe(&record.emergent_id, &record.work_type, record.positive);
        self.records.put(record.clone());
        record
    }

    /// Every outcome recorded against `work_item_id`.
    #[must_use]
    pub fn for_work_item(&self, work_item_id: &str) -> Vec<&OutcomeRecord> {
        self.records
            .by_index("work_item_id", work_item_id)
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Every outcome recorded for `emergent_id`, most commonly used for
    /// affinity recomputation and audits.
    #[must_use]
    pub fn for_actor(&self, emergent_id: &str) -> Vec<&OutcomeRecord> {
        self.records
            .by_index("emergent_id", emergent_id)
            .iter()
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Returns outcomes in insertion order, most recent last. `lookback` of
    /// `0` returns every retained outcome.
    #[must_use]
    pub fn recent(&self, lookback: usize) -> Vec<&OutcomeRecord> {
        let all: Vec<&OutcomeRecord> = self.records.list().collect();
        if lookback == 0 || lookback >= all.len() {
            return all;
        }
        all[all.len() - lookback..].to_vec()
    }

    /// The current role/work-type affinity table.
    #[must_use]
    pub const fn affinity(&self) -> &AffinityTable {
        &self.affinity
    }

    /// Number of outcomes currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no outcomes have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// SECTION: Role/Work-Type Affinity
// ============================================================================

/// Success/total tally for one (role, work type) pair.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct AffinityCounter {
    successes: u64,
    total: u64,
}

impl AffinityCounter {
    fn rate(self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(u32::try_from(self.successes).unwrap_or(u32::MAX))
                / f64::from(u32::try_from(self.total).unwrap_or(u32::MAX))
        }
    }
}

/// Confidence bucket for an assignment recommendation, derived from sample
/// size: `high` at 20 or more samples, `medium` at 10 or more, else `low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Fewer than 10 samples.
    Low,
    /// 10 to 19 samples.
    Medium,
    /// 20 or more samples.
    High,
}

impl Confidence {
    fn from_total(total: u64) -> Self {
        if total >= 20 {
            Self::High
        } else if total >= 10 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// A recommended role for a work type, with its observed success rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRecommendation {
    /// The candidate role/actor.
    pub role: String,
    /// Observed positive-outcome rate for this (role, work type) pair.
    pub rate: f64,
    /// Total samples backing `rate`.
    pub total: u64,
    /// Confidence bucket derived from `total`.
    pub confidence: Confidence,
}

/// Tracks observed success rates for every (role, work type) pair seen.
#[derive(Debug, Clone, Default)]
pub struct AffinityTable {
    counters: BTreeMap<(String, String), AffinityCounter>,
}

impl AffinityTable {
    fn observe(&mut self, role: &str, work_type: &str, positive: bool) {
        let counter = self.counters.entry((role.to_string(), work_type.to_string())).or_default();
        counter.total += 1;
        if positive {
            counter.successes += 1;
        }
    }

    /// Ranked recommendations for `work_type`, restricted to roles meeting
    /// `min_samples`, ordered by descending rate.
    #[must_use]
    pub fn recommendations_for(&self, work_type: &str, min_samples: u64) -> Vec<AssignmentRecommendation> {
        let mut recs: Vec<AssignmentRecommendation> = self
            .counters
            .iter()
            .filter(|((_, wt), counter)| wt == work_type && counter.total >= min_samples)
            .map(|((role, _), counter)| AssignmentRecommendation {
                role: role.clone(),
                rate: counter.rate(),
                total: counter.total,
                confidence: Confidence::from_total(counter.total),
            })
            .collect();
        recs.sort_by(|a, b| b.rate.partial_cmp(&a.rate).unwrap_or(std::cmp::Ordering::Equal));
        recs
    }

    /// Every work type with at least one ranked recommendation at
    /// `min_samples`.
    #[must_use]
    pub fn recommendations(&self, min_samples: u64) -> BTreeMap<String, Vec<AssignmentRecommendation>> {
        let mut out: BTreeMap<String, Vec<AssignmentRecommendation>> = BTreeMap::new();
        for (role, work_type) in self.counters.keys() {
            out.entry(work_type.clone())
                .or_insert_with(|| self.recommendations_for(work_type, min_samples));
            let _ = role;
        }
        out.retain(|_, recs| !recs.is_empty());
        out
    }

    /// The single best role for `work_type` at `min_samples`, if any role
    /// meets the sample threshold.
    #[must_use]
    pub fn best_role_for(&self, work_type: &str, min_samples: u64) -> Option<AssignmentRecommendation> {
        self.recommendations_for(work_type, min_samples).into_iter().next()
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

    fn outcome(work_type: &str, role: &str, positive: bool) -> NewOutcome {
        NewOutcome {
            work_item_id: "wi_1".to_string(),
            allocation_id: None,
            emergent_id: role.to_string(),
            work_type: work_type.to_string(),
            signal: if positive { "user_accepted" } else { "user_rejected" }.to_string(),
            positive,
            signal_values: BTreeMap::new(),
        }
    }

    #[test]
    fn record_indexes_by_every_declared_key() {
        let services = services();
        let mut store = OutcomeStore::new(0);
        store.record(outcome("review", "reviewer_a", true), &services);
        assert_eq!(store.for_actor("reviewer_a").len(), 1);
        assert_eq!(store.for_work_item("wi_1").len(), 1);
    }

    #[test]
    fn affinity_rate_reflects_observed_successes() {
        let services = services();
        let mut store = OutcomeStore::new(0);
        for _ in 0..8 {
            store.record(outcome("review", "reviewer_a", true), &services);
        }
        for _ in 0..2 {
            store.record(outcome("review", "reviewer_a", false), &services);
        }
        let best = store.affinity().best_role_for("review", 10).expect("has samples");
        assert!((best.rate - 0.8).abs() < 1e-9);
        assert_eq!(best.confidence, Confidence::Medium);
    }

    #[test]
    fn recommendations_require_min_samples() {
        let services = services();
        let mut store = OutcomeStore::new(0);
        store.record(outcome("review", "reviewer_a", true), &services);
        assert!(store.affinity().best_role_for("review", 10).is_none());
    }

    #[test]
    fn recent_respects_lookback_window() {
        let services = services();
        let mut store = OutcomeStore::new(0);
        for i in 0..5 {
            store.record(outcome("review", &format!("r{i}"), true), &services);
        }
        let last_two = store.recent(2);
        assert_eq!(last_two.len(), 2);
        assert_eq!(last_two[1].emergent_id, "r4");
    }
}
