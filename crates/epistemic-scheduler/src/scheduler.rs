// epistemic-scheduler/src/scheduler.rs
// ============================================================================
// Module: Priority Scheduler
// Description: Fingerprint-deduplicated priority queue over `WorkItem`s,
// driven by learned per-signal weights and role affinity.
// Dependencies: epistemic-core, epistemic-scheduler::{outcome, work_item}
// ============================================================================

//! ## Overview
//! Priority is a weighted sum of an item's signal values. `enqueue` rejects
//! duplicate fingerprints still in flight and inserts in priority order,
//! breaking ties by creation order. `rescore` recomputes every queued
//! item's priority against the current weights and reorders the queue;
//! it is idempotent; running it twice back to back produces the same
//! order. `assign` consults the learned [`crate::outcome::AffinityTable`]
//! before falling back to an item's declared default role.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;

use crate::error::SchedulerError;
use crate::outcome::AffinityTable;
use crate::work_item::NewWorkItem;
use crate::work_item::WorkItem;
use crate::work_item::WorkItemState;

/// Minimum observed success rate for a learned affinity to override an
/// item's declared default role.
pub const DEFAULT_MIN_AFFINITY_RATE: f64 = 0.6;

fn score(signals: &BTreeMap<String, f64>, weights: &BTreeMap<String, f64>) -> f64 {
    signals.iter().map(|(name, value)| weights.get(name).copied().unwrap_or(0.0) * value).sum()
}

/// Orders two queue slots: higher priority first, earlier creation first on
/// a tie.
fn queue_order(a: &WorkItem, b: &WorkItem) -> std::cmp::Ordering {
    b.priority
        .partial_cmp(&a.priority)
        .unwrap_or(std::cmp::Ordering::Equal)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Outcome of resolving a work item, recorded for audit via
/// [`Scheduler::complete`]/[`Scheduler::fail`]/[`Scheduler::cancel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedWorkItem {
    /// The resolved item, with its final state set.
    pub item: WorkItem,
}

/// Priority-queue scheduler over [`WorkItem`]s.
pub struct Scheduler {
    items: BTreeMap<String, WorkItem>,
    queued_order: Vec<String>,
    fingerprint_active: BTreeMap<String, String>,
    known_work_types: BTreeSet<String>,
    weights: BTreeMap<String, f64>,
}

impl Scheduler {
    /// Creates a scheduler. An empty `known_work_types` accepts any work
    /// type; a non-empty set rejects anything outside it.
    #[must_use]
    pub fn new(known_work_types: BTreeSet<String>, weights: BTreeMap<String, f64>) -> Self {
        Self {
            items: BTreeMap::new(),
            queued_order: Vec::new(),
            fingerprint_active: BTreeMap::new(),
            known_work_types,
            weights,
        }
    }

    /// Replaces the live weight map, e.g. after a weight-learning round.
    pub fn set_weights(&mut self, weights: BTreeMap<String, f64>) {
        self.weights = weights;
    }

    /// The live weight map.
    #[must_use]
    pub const fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    /// Looks up a work item by id, including terminal ones.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WorkItem> {
        self.items.get(id)
    }

    /// Lists queued items in current dispatch order (highest priority
    /// first).
    #[must_use]
    pub fn queued(&self) -> Vec<&WorkItem> {
        self.queued_order.iter().filter_map(|id| self.items.get(id)).collect()
    }

    fn insert_sorted(&mut self, id: String) {
        let item = match self.items.get(&id) {
            Some(item) => item.clone(),
            None => return,
        };
        let position = self
            .queued_order
            .iter()
            .filter_map(|existing| self.items.get(existing))
            .position(|existing| queue_order(&item, existing) == std::cmp::Ordering::Less)
            .unwrap_or(self.queued_order.len());
        self.queued_order.insert(position, id);
    }

    /// Enqueues a new work item.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidWorkType`] if `known_work_types` is
    /// non-empty and does not contain `new.work_type`, or
    /// [`SchedulerError::DuplicateFingerprint`] if a non-terminal item
    /// already carries `new.fingerprint`.
    pub fn enqueue(&mut self, new: NewWorkItem, services: &Services) -> Result<WorkItem, SchedulerError> {
        if !self.known_work_types.is_empty() && !self.known_work_types.contains(&new.work_type) {
            return Err(SchedulerError::InvalidWorkType {
                work_type: new.work_type,
            });
        }
        if self.fingerprint_active.contains_key(&new.fingerprint) {
            return Err(SchedulerError::DuplicateFingerprint {
                fingerprint: new.fingerprint,
            });
        }

        let priority = score(&new.signals, &self.weights);
        let item = WorkItem {
            id: services.new_id("wi"),
            work_type: new.work_type,
            fingerprint: new.fingerprint.clone(),
            payload: new.payload,
            signals: new.signals,
            default_role: new.default_role,
            assigned_role: None,
            state: WorkItemState::Queued,
            priority,
            created_at: services.now(),
        };

        self.fingerprint_active.insert(new.fingerprint, item.id.clone());
        self.items.insert(item.id.clone(), item.clone());
        self.insert_sorted(item.id.clone());
        Ok(item)
    }

    /// Pops the highest-priority queued item and marks it in flight.
    pub fn pop(&mut self) -> Option<WorkItem> {
        if self.queued_order.is_empty() {
            return None;
        }
        let id = self.queued_order.remove(0);
        let item = self.items.get_mut(&id)?;
        item.state = WorkItemState::InFlight;
        Some(item.clone())
    }

    fn resolve(&mut self, id: &str, state: WorkItemState) -> Result<WorkItem, SchedulerError> {
        let item = self.items.get_mut(id).ok_or_else(|| SchedulerError::NotFound {
            id: id.to_string(),
        })?;
        item.state = state;
        let fingerprint = item.fingerprint.clone();
        let resolved = item.clone();
        self.queued_order.retain(|queued_id| queued_id != id);
        self.fingerprint_active.remove(&fingerprint);
        Ok(resolved)
    }

    /// Marks an item completed. Removes it from the queue and clears its
    /// fingerprint reservation.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotFound`] if no such item exists.
    pub fn complete(&mut self, id: &str) -> Result<WorkItem, SchedulerError> {
        self.resolve(id, WorkItemState::Completed)
    }

    /// Marks an item failed. Removes it from the queue and clears its
    /// fingerprint reservation.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotFound`] if no such item exists.
    pub fn fail(&mut self, id: &str) -> Result<WorkItem, SchedulerError> {
        self.resolve(id, WorkItemState::Failed)
    }

    /// Withdraws an item before resolution. Removes it from the queue and
    /// clears its fingerprint reservation.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotFound`] if no such item exists.
    pub fn cancel(&mut self, id: &str) -> Result<WorkItem, SchedulerError> {
        self.resolve(id, WorkItemState::Cancelled)
    }

    /// Recomputes priority for every queued item against the current
    /// weights and reorders the queue. Idempotent: calling this twice in a
    /// row produces the same order both times.
    pub fn rescore(&mut self) {
        for id in &self.queued_order {
            if let Some(item) = self.items.get_mut(id) {
                item.priority = score(&item.signals, &self.weights);
            }
        }
        let weights = &self.weights;
        let items = &self.items;
        self.queued_order.sort_by(|a, b| {
            let item_a = items.get(a);
            let item_b = items.get(b);
            match (item_a, item_b) {
                (Some(item_a), Some(item_b)) => queue_order(item_a, item_b),
                _ => std::cmp::Ordering::Equal,
            }
        });
        let _ = weights;
    }

    /// Chooses a role for `item`: the best learned affinity for its work
    /// type if it meets `min_samples` and `min_rate`, else the item's
    /// declared default role.
    #[must_use]
    pub fn assign(
        &self,
        item: &WorkItem,
        affinity: &AffinityTable,
        min_samples: u64,
        min_rate: f64,
    ) -> Option<String> {
        if let Some(best) = affinity.best_role_for(&item.work_type, min_samples) {
            if best.rate >= min_rate {
                return Some(best.role);
            }
        }
        item.default_role.clone()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use epistemic_core::Instant;
    use epistemic_core::ManualClock;

    use super::*;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    fn item(fingerprint: &str, impact: f64) -> NewWorkItem {
        let mut signals = BTreeMap::new();
        signals.insert("impact".to_string(), impact);
        NewWorkItem {
            work_type: "review".to_string(),
            fingerprint: fingerprint.to_string(),
            payload: serde_json::json!({}),
            signals,
            default_role: Some("reviewer".to_string()),
        }
    }

    fn weights() -> BTreeMap<String, f64> {
        let mut w = BTreeMap::new();
        w.insert("impact".to_string(), 1.0);
        w
    }

    #[test]
    fn enqueue_orders_by_priority_descending() {
        let services = services();
        let mut scheduler = Scheduler::new(BTreeSet::new(), weights());
        scheduler.enqueue(item("a", 0.2), &services).unwrap();
        scheduler.enqueue(item("b", 0.9), &services).unwrap();
        scheduler.enqueue(item("c", 0.5), &services).unwrap();

        let popped = scheduler.pop().unwrap();
        assert_eq!(popped.fingerprint, "b");
    }

    #[test]
    fn duplicate_fingerprint_while_active_is_rejected() {
        let services = services();
        let mut scheduler = Scheduler::new(BTreeSet::new(), weights());
        scheduler.enqueue(item("a", 0.2), &services).unwrap();
        let err = scheduler.enqueue(item("a", 0.9), &services).unwrap_err();
        assert_eq!(err.code(), "duplicate_fingerprint");
    }

    #[test]
    fn fingerprint_is_released_after_completion() {
        let services = services();
        let mut scheduler = Scheduler::new(BTreeSet::new(), weights());
        let enqueued = scheduler.enqueue(item("a", 0.2), &services).unwrap();
        scheduler.complete(&enqueued.id).unwrap();
        scheduler.enqueue(item("a", 0.4), &services).unwrap();
    }

    #[test]
    fn unknown_work_type_is_rejected() {
        let services = services();
        let mut known = BTreeSet::new();
        known.insert("design".to_string());
        let mut scheduler = Scheduler::new(known, weights());
        let err = scheduler.enqueue(item("a", 0.2), &services).unwrap_err();
        assert_eq!(err.code(), "invalid_work_type");
    }

    #[test]
    fn rescore_is_idempotent() {
        let services = services();
        let mut scheduler = Scheduler::new(BTreeSet::new(), weights());
        scheduler.enqueue(item("a", 0.2), &services).unwrap();
        scheduler.enqueue(item("b", 0.9), &services).unwrap();
        scheduler.set_weights({
            let mut w = BTreeMap::new();
            w.insert("impact".to_string(), -1.0);
            w
        });
        scheduler.rescore();
        let first_order: Vec<String> = scheduler.queued().iter().map(|i| i.id.clone()).collect();
        scheduler.rescore();
        let second_order: Vec<String> = scheduler.queued().iter().map(|i| i.id.clone()).collect();
        assert_eq!(first_order, second_order);
    }

    #[test]
    fn assign_falls_back_to_default_role_without_affinity_data() {
        let services = services();
        let mut scheduler = Scheduler::new(BTreeSet::new(), weights());
        let enqueued = scheduler.enqueue(item("a", 0.2), &services).unwrap();
        let affinity = AffinityTable::default();
        let role = scheduler.assign(&enqueued, &affinity, 10, 0.6);
        assert_eq!(role.as_deref(), Some("reviewer"));
    }

    #[test]
    fn not_found_is_returned_for_unknown_id() {
        let mut scheduler = Scheduler::new(BTreeSet::new(), weights());
        let err = scheduler.complete("missing").unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
