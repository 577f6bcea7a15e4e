// epistemic-scheduler/src/learner.rs
// ============================================================================
// Module: Weight Learner
// Description: Correlates recorded outcome signal values against the
// positive/negative split to retune per-signal scheduling weights.
// Dependencies: epistemic-core, epistemic-scheduler::outcome
// ============================================================================

//! ## Overview
//! For every signal present across recent outcomes, the learner compares the
//! average value among positive outcomes to the average among negative
//! outcomes. A signal that reads consistently higher on acceptance than on
//! rejection earns a small positive nudge; the reverse earns a small
//! negative one. Adjustments are capped, rounded, and only applied once
//! both sub-samples clear a minimum size, so a handful of outcomes cannot
//! swing a weight on noise.

use std::collections::BTreeMap;

use epistemic_core::BoundedHistory;
use epistemic_core::Instant;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;

use crate::error::LearnerError;
use crate::outcome::OutcomeStore;

/// Default ceiling for the weight-update audit history (trims to half on
/// overflow, i.e. effectively 50 retained entries once it first trims).
pub const DEFAULT_HISTORY_CEILING: usize = 100;

/// Minimum per-side sample count before a signal is eligible for adjustment.
const MIN_SUBSAMPLE: usize = 3;

/// Adjustments smaller than this are treated as noise and dropped.
const MIN_ADJUSTMENT_MAGNITUDE: f64 = 0.001;

/// Scales the raw positive/negative average gap down to a per-round step.
const ADJUSTMENT_SCALE: f64 = 0.1;

/// Weight bounds enforced after every adjustment.
const WEIGHT_BOUNDS: (f64, f64) = (-0.5, 0.5);

fn clamp(value: f64, bounds: (f64, f64)) -> f64 {
    value.max(bounds.0).min(bounds.1)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// One weight-learning round, recorded for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightUpdateEntry {
    /// Opaque id, prefixed `wu_`.
    pub id: String,
    /// Weights before this round.
    pub old_weights: BTreeMap<String, f64>,
    /// Weights after this round.
    pub new_weights: BTreeMap<String, f64>,
    /// Number of outcomes the round was computed over.
    pub samples_used: usize,
    /// When this round ran.
    pub recorded_at: Instant,
}

/// Owns the live weight map and its audit trail. Does not own the outcome
/// store or the scheduler; `run_weight_learning` borrows an [`OutcomeStore`]
/// for input and returns the new weights for the caller to apply.
pub struct WeightLearner {
    weights: BTreeMap<String, f64>,
    history: BoundedHistory<WeightUpdateEntry>,
}

impl WeightLearner {
    /// Creates a learner seeded with `initial_weights`.
    #[must_use]
    pub fn new(initial_weights: BTreeMap<String, f64>) -> Self {
        Self {
            weights: initial_weights,
            history: BoundedHistory::new(DEFAULT_HISTORY_CEILING),
        }
    }

    /// The current weight map.
    #[must_use]
    pub const fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// The weight-update audit trail, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &WeightUpdateEntry> {
        self.history.iter()
    }

    /// Runs one round of weight learning over the `lookback` most recent
    /// outcomes (all retained outcomes if `lookback` is `0`).
    ///
    /// # Errors
    ///
    /// Returns [`LearnerError::InsufficientData`] if fewer than `min_samples`
    /// outcomes are available.
    pub fn run_weight_learning(
        &mut self,
        outcomes: &OutcomeStore,
        min_samples: usize,
        max_adjustment: f64,
        lookback: usize,
        services: &Services,
    ) -> Result<WeightUpdateEntry, LearnerError> {
        let window = outcomes.recent(lookback);
        if window.len() < min_samples {
            return Err(LearnerError::InsufficientData {
                required: min_samples,
                available: window.len(),
            });
        }

        let mut signal_names: Vec<String> = window
            .iter()
            .flat_map(|o| o.signal_values.keys().cloned())
            .collect();
        signal_names.sort();
        signal_names.dedup();

        let old_weights = self.weights.clone();
        for signal in &signal_names {
            let positives: Vec<f64> = window
                .iter()
                .filter(|o| o.positive)
                .filter_map(|o| o.signal_values.get(signal).copied())
                .collect();
            let negatives: Vec<f64> = window
                .iter()
                .filter(|o| !o.positive)
                .filter_map(|o| o.signal_values.get(signal).copied())
                .collect();
            if positives.len() < MIN_SUBSAMPLE || negatives.len() < MIN_SUBSAMPLE {
                continue;
            }
            let avg_pos = positives.iter().sum::<f64>() / positives.len() as f64;
            let avg_neg = negatives.iter().sum::<f64>() / negatives.len() as f64;
            let raw_adjustment = (avg_pos - avg_neg) * ADJUSTMENT_SCALE;
            let adjustment = clamp(raw_adjustment, (-max_adjustment, max_adjustment));
            if adjustment.abs() <= MIN_ADJUSTMENT_MAGNITUDE {
                continue;
            }
            let old = *self.weights.get(signal).unwrap_or(&0.0);
            let new = round3(clamp(old + adjustment, WEIGHT_BOUNDS));
            self.weights.insert(signal.clone(), new);
        }

        let entry = WeightUpdateEntry {
            id: services.new_id("wu"),
            old_weights,
            new_weights: self.weights.clone(),
            samples_used: window.len(),
            recorded_at: services.now(),
        };
        self.history.push(entry.clone());
        Ok(entry)
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
    use crate::outcome::NewOutcome;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    fn record(store: &mut OutcomeStore, services: &Services, positive: bool, impact: f64, risk: f64) {
        let mut signal_values = BTreeMap::new();
        signal_values.insert("impact".to_string(), impact);
        signal_values.insert("risk".to_string(), risk);
        store.record(
            NewOutcome {
                work_item_id: "wi_1".to_string(),
                allocation_id: None,
                emergent_id: "role_a".to_string(),
                work_type: "review".to_string(),
                signal: if positive { "user_accepted" } else { "user_rejected" }.to_string(),
                positive,
                signal_values,
            },
            services,
        );
    }

    #[test]
    fn correlated_signal_lifts_its_weight() {
        let services = services();
        let mut store = OutcomeStore::new(0);
        for _ in 0..15 {
            record(&mut store, &services, true, 0.9, 0.2);
        }
        for _ in 0..10 {
            record(&mut store, &services, false, 0.2, 0.8);
        }

        let mut weights = BTreeMap::new();
        weights.insert("impact".to_string(), 0.0);
        weights.insert("risk".to_string(), 0.0);
        let mut learner = WeightLearner::new(weights);

        let entry = learner.run_weight_learning(&store, 10, 0.1, 0, &services).expect("enough samples");
        assert!(entry.new_weights["impact"] >= entry.old_weights["impact"]);
        assert!(entry.new_weights["risk"] <= entry.old_weights["risk"]);
    }

    #[test]
    fn insufficient_samples_is_rejected() {
        let services = services();
        let mut store = OutcomeStore::new(0);
        record(&mut store, &services, true, 0.9, 0.2);
        let mut learner = WeightLearner::new(BTreeMap::new());
        let err = learner.run_weight_learning(&store, 10, 0.1, 0, &services).unwrap_err();
        assert_eq!(err.code(), "insufficient_data");
    }

    #[test]
    fn weights_never_exceed_bounds() {
        let services = services();
        let mut store = OutcomeStore::new(0);
        for _ in 0..30 {
            record(&mut store, &services, true, 1.0, 0.0);
        }
        for _ in 0..30 {
            record(&mut store, &services, false, 0.0, 1.0);
        }
        let mut weights = BTreeMap::new();
        weights.insert("impact".to_string(), 0.48);
        let mut learner = WeightLearner::new(weights);
        for _ in 0..10 {
            let _ = learner.run_weight_learning(&store, 10, 0.5, 0, &services);
        }
        assert!(learner.weights()["impact"] <= 0.5);
    }

    #[test]
    fn history_records_each_round() {
        let services = services();
        let mut store = OutcomeStore::new(0);
        for _ in 0..10 {
            record(&mut store, &services, true, 0.9, 0.2);
        }
        for _ in 0..10 {
            record(&mut store, &services, false, 0.2, 0.8);
        }
        let mut learner = WeightLearner::new(BTreeMap::new());
        learner.run_weight_learning(&store, 5, 0.1, 0, &services).unwrap();
        assert_eq!(learner.history().count(), 1);
    }
}
