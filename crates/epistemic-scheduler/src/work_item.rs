// epistemic-scheduler/src/work_item.rs
// ============================================================================
// Module: Work Item
// Description: The unit the priority scheduler queues, dispatches, and
// resolves.
// Dependencies: serde, serde_json
// ============================================================================

use std::collections::BTreeMap;

use epistemic_core::Instant;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Lifecycle state of a [`WorkItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemState {
    /// Waiting in the priority queue.
    Queued,
    /// Popped and dispatched; not yet resolved.
    InFlight,
    /// Resolved successfully.
    Completed,
    /// Resolved unsuccessfully.
    Failed,
    /// Withdrawn before resolution.
    Cancelled,
}

impl WorkItemState {
    /// Returns `true` for a state that will never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Caller-supplied fields for [`crate::scheduler::Scheduler::enqueue`].
#[derive(Debug, Clone)]
pub struct NewWorkItem {
    /// The work type; validated against the scheduler's registered set.
    pub work_type: String,
    /// Dedup key: a second enqueue with the same fingerprint while a
    /// non-terminal item already holds it is rejected.
    pub fingerprint: String,
    /// Opaque payload carried through to the consumer.
    pub payload: Value,
    /// Named numeric signals (impact, risk, urgency, confidence, ...) used
    /// to compute priority against the scheduler's learned weights.
    pub signals: BTreeMap<String, f64>,
    /// Role to assign if no learned affinity clears the confidence bar.
    pub default_role: Option<String>,
}

/// A unit of work tracked by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    /// Opaque id, prefixed `wi_`.
    pub id: String,
    /// The work type.
    pub work_type: String,
    /// Dedup fingerprint.
    pub fingerprint: String,
    /// Opaque payload.
    pub payload: Value,
    /// Named numeric signals used to compute priority.
    pub signals: BTreeMap<String, f64>,
    /// Fallback role if no learned affinity applies.
    pub default_role: Option<String>,
    /// Role actually assigned at dispatch time, if any.
    pub assigned_role: Option<String>,
    /// Current lifecycle state.
    pub state: WorkItemState,
    /// Weighted sum of `signals`, recomputed on enqueue and by `rescore`.
    pub priority: f64,
    /// When the item was enqueued.
    pub created_at: Instant,
}

impl epistemic_core::Indexed for WorkItem {
    fn primary_id(&self) -> &str {
        &self.id
    }
}
