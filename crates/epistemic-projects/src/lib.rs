// epistemic-projects/src/lib.rs
// ============================================================================
// Crate: epistemic-projects
// Description: The project DAG engine: nodes, prerequisites, checkpoints,
// and rollback.
// ============================================================================

//! Projects own a DAG of nodes linked by prerequisite references. Node
//! completion cascades readiness to dependents; node failure cascades
//! blocking to transitive dependents; checkpoints let a project roll back
//! to an earlier point in its history.

pub mod error;
pub mod node;
pub mod project;

pub use error::ProjectError;
pub use node::Checkpoint;
pub use node::NodeState;
pub use node::ProjectNode;
pub use project::Project;
pub use project::ProjectState;
pub use project::ProjectStore;
