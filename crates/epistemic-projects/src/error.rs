// epistemic-projects/src/error.rs
// ============================================================================
// Module: Project Errors
// Description: Error taxonomy for the project DAG engine.
// Dependencies: thiserror
// ============================================================================

use thiserror::Error;

/// Errors raised by the project DAG engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProjectError {
    /// No project exists with the given id.
    #[error("project not found: {id}")]
    ProjectNotFound {
        /// The id that was looked up.
        id: String,
    },
    /// No node exists with the given id within its project.
    #[error("node not found: {id}")]
    NodeNotFound {
        /// The id that was looked up.
        id: String,
    },
    /// A declared prerequisite does not exist in the project.
    #[error("missing prerequisite: {id}")]
    MissingPrerequisite {
        /// The missing prerequisite's id.
        id: String,
    },
    /// Adding the requested edges would create a cycle.
    #[error("adding this node would create a cycle")]
    CycleDetected,
    /// The project is not in the state required for this operation.
    #[error("invalid project state for this operation: {state}")]
    InvalidProjectState {
        /// The project's current state.
        state: String,
    },
    /// The node is not in the state required for this operation.
    #[error("invalid node state for this operation: {state}")]
    InvalidNodeState {
        /// The node's current state.
        state: String,
    },
    /// No checkpoint exists with the given id.
    #[error("checkpoint not found: {id}")]
    CheckpointNotFound {
        /// The id that was looked up.
        id: String,
    },
}

impl ProjectError {
    /// Stable lowercase snake_case error code for this variant.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ProjectNotFound { .. } => "project_not_found",
            Self::NodeNotFound { .. } => "node_not_found",
            Self::MissingPrerequisite { .. } => "missing_prerequisite",
            Self::CycleDetected => "cycle_detected",
            Self::InvalidProjectState { .. } => "invalid_project_state",
            Self::InvalidNodeState { .. } => "invalid_node_state",
            Self::CheckpointNotFound { .. } => "checkpoint_not_found",
        }
    }
}
