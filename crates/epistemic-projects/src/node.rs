// epistemic-projects/src/node.rs
// ============================================================================
// Module: Project Node
// Description: A DAG node's state machine and its checkpoint history.
// Dependencies: epistemic-core, serde_json
// ============================================================================

use std::collections::BTreeSet;

use epistemic_core::Instant;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Lifecycle state of a [`ProjectNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Waiting on prerequisites.
    Pending,
    /// All prerequisites completed; eligible to start.
    Ready,
    /// Being worked.
    InProgress,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully.
    Failed,
    /// A prerequisite failed, transitively.
    Blocked,
    /// Reverted by a rollback.
    RolledBack,
}

/// A snapshot attached to a node by `checkpoint`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Opaque id, prefixed `cp_`.
    pub id: String,
    /// The node this checkpoint was taken against.
    pub node_id: String,
    /// Caller-supplied snapshot payload.
    pub snapshot: Value,
    /// The project's history index at the moment this checkpoint was taken.
    pub history_index: u64,
    /// When this checkpoint was taken.
    pub taken_at: Instant,
}

/// One node of a project's DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectNode {
    /// Opaque id, prefixed `nd_`.
    pub id: String,
    /// Prerequisite node ids that must complete before this one is ready.
    pub prerequisites: BTreeSet<String>,
    /// Current lifecycle state.
    pub state: NodeState,
    /// Caller-supplied result payload, set on completion.
    pub result: Option<Value>,
    /// Reason recorded on failure.
    pub failure_reason: Option<String>,
    /// The project history index at this node's most recent state change.
    pub last_transition_index: u64,
    /// Insertion order within the project.
    pub sequence: u64,
}

impl epistemic_core::Indexed for ProjectNode {
    fn primary_id(&self) -> &str {
        &self.id
    }
}
