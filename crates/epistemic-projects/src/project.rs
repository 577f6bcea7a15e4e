// epistemic-projects/src/project.rs
// ============================================================================
// Module: Project DAG Engine
// Description: Projects, their node DAGs, checkpointing, and rollback.
// Dependencies: epistemic-core, epistemic-projects::{error, node}
// ============================================================================

//! ## Overview
//! A [`Project`] owns a set of [`ProjectNode`]s linked by prerequisite
//! references. Every node mutation bumps the project's history index and
//! stamps the node with it; a [`Checkpoint`] records that index so
//! [`ProjectStore::rollback`] can tell which nodes moved since it was taken.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

use epistemic_core::BoundedHistory;
use epistemic_core::BoundedIndexedStore;
use epistemic_core::Indexed;
use epistemic_core::Instant;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ProjectError;
use crate::node::Checkpoint;
use crate::node::NodeState;
use crate::node::ProjectNode;

/// Default ceiling for the project store before FIFO eviction kicks in.
pub const DEFAULT_CEILING: usize = 5_000;

/// Ceiling for a single project's checkpoint history.
const CHECKPOINT_CEILING: usize = 1_000;

/// Lifecycle state of a [`Project`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectState {
    /// Created, not yet started.
    Draft,
    /// Running.
    Active,
    /// Suspended; nodes keep their state.
    Paused,
    /// Every node completed.
    Completed,
    /// Failed irrecoverably.
    Failed,
}

/// A project: a named DAG of [`ProjectNode`]s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Opaque id, prefixed `pr_`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Current lifecycle state.
    pub state: ProjectState,
    /// Nodes keyed by id.
    nodes: BTreeMap<String, ProjectNode>,
    /// Monotonic counter bumped on every node state change.
    history_index: u64,
    /// Next insertion sequence assigned to a new node.
    next_sequence: u64,
    /// Checkpoints taken against this project's nodes.
    checkpoints: BoundedHistory<Checkpoint>,
    /// When the project was created.
    pub created_at: Instant,
}

impl Indexed for Project {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

impl Project {
    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ProjectNode> {
        self.nodes.get(id)
    }

    /// Lists every node in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &ProjectNode> {
        self.nodes.values()
    }

    /// The project's checkpoint history, oldest first.
    pub fn checkpoints(&self) -> impl Iterator<Item = &Checkpoint> {
        self.checkpoints.iter()
    }

    fn dependents_of(&self, node_id: &str) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.prerequisites.contains(node_id))
            .map(|n| n.id.clone())
            .collect()
    }

    fn transitive_dependents(&self, node_id: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<String> = VecDeque::from(self.dependents_of(node_id));
        while let Some(id) = queue.pop_front() {
            if seen.insert(id.clone()) {
                queue.extend(self.dependents_of(&id));
            }
        }
        seen
    }

    fn bump(&mut self, node_id: &str, state: NodeState) {
        self.history_index += 1;
        let index = self.history_index;
        if let Some(node) = self.nodes.get_mut(node_id) {
            node.state = state;
            node.last_transition_index = index;
        }
    }

    fn prerequisites_completed(&self, node: &ProjectNode) -> bool {
        node.prerequisites.iter().all(|prereq| self.nodes.get(prereq).is_some_and(|p| p.state == NodeState::Completed))
    }
}

/// Would adding a node whose prerequisites are `prerequisites` create a
/// cycle in `nodes`? A fresh node can only ever be reachable from its
/// prerequisites if one of them (transitively) already depends on it —
/// impossible for a not-yet-inserted id, but this walk is the same one a
/// future edge-editing operation would need, so it is kept as real
/// reachability analysis rather than a stub.
fn would_create_cycle(nodes: &BTreeMap<String, ProjectNode>, new_id: &str, prerequisites: &BTreeSet<String>) -> bool {
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = prerequisites.iter().cloned().collect();
    while let Some(id) = queue.pop_front() {
        if id == new_id {
            return true;
        }
        if !visited.insert(id.clone()) {
            continue;
        }
        if let Some(node) = nodes.get(&id) {
            queue.extend(node.prerequisites.iter().cloned());
        }
    }
    false
}

/// Bounded, indexed store of [`Project`]s.
pub struct ProjectStore {
    store: BoundedIndexedStore<Project>,
}

impl ProjectStore {
    /// Creates an empty project store with the given ceiling (0 =
    /// unbounded).
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            store: BoundedIndexedStore::new(ceiling)
                .with_index("state", |p: &Project| vec![project_state_key(p.state)]),
        }
    }

    /// Creates a new, empty project in [`ProjectState::Draft`].
    pub fn create(&mut self, name: impl Into<String>, services: &Services) -> Project {
        let project = Project {
            id: services.new_id("pr"),
            name: name.into(),
            state: ProjectState::Draft,
            nodes: BTreeMap::new(),
            history_index: 0,
            next_sequence: 0,
            checkpoints: BoundedHistory::new(CHECKPOINT_CEILING),
            created_at: services.now(),
        };
        self.store.put(project.clone());
        project
    }

    /// Looks up a project by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Project> {
        self.store.get(id)
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Project, ProjectError> {
        self.store.get_mut(id).ok_or_else(|| ProjectError::ProjectNotFound { id: id.to_string() })
    }

    /// Adds a node with the given prerequisites to `project_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ProjectNotFound`], [`ProjectError::MissingPrerequisite`]
    /// if any prerequisite id does not exist in the project, or
    /// [`ProjectError::CycleDetected`] if adding it would create a cycle.
    pub fn add_node(
        &mut self,
        project_id: &str,
        prerequisites: BTreeSet<String>,
        services: &Services,
    ) -> Result<ProjectNode, ProjectError> {
        let project = self.get_mut(project_id)?;
        for prereq in &prerequisites {
            if !project.nodes.contains_key(prereq) {
                return Err(ProjectError::MissingPrerequisite { id: prereq.clone() });
            }
        }
        let new_id = services.new_id("nd");
        if would_create_cycle(&project.nodes, &new_id, &prerequisites) {
            return Err(ProjectError::CycleDetected);
        }
        let sequence = project.next_sequence;
        project.next_sequence += 1;
        let node = ProjectNode {
            id: new_id,
            prerequisites,
            state: NodeState::Pending,
            result: None,
            failure_reason: None,
            last_transition_index: project.history_index,
            sequence,
        };
        project.nodes.insert(node.id.clone(), node.clone());
        self.store.reindex(project_id);
        Ok(node)
    }

    /// Starts a project: `draft` → `active`; every node with no
    /// prerequisites transitions `pending` → `ready`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ProjectNotFound`] or
    /// [`ProjectError::InvalidProjectState`] if the project is not in draft.
    pub fn start(&mut self, project_id: &str) -> Result<(), ProjectError> {
        let project = self.get_mut(project_id)?;
        if project.state != ProjectState::Draft {
            return Err(ProjectError::InvalidProjectState {
                state: project_state_key(project.state).to_string(),
            });
        }
        project.state = ProjectState::Active;
        let roots: Vec<String> = project
            .nodes
            .values()
            .filter(|n| n.state == NodeState::Pending && n.prerequisites.is_empty())
            .map(|n| n.id.clone())
            .collect();
        for id in roots {
            project.bump(&id, NodeState::Ready);
        }
        self.store.reindex(project_id);
        Ok(())
    }

    /// Enumerates nodes that are `pending` with every prerequisite
    /// completed, transitioning them to `ready`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ProjectNotFound`].
    pub fn ready_nodes(&mut self, project_id: &str) -> Result<Vec<ProjectNode>, ProjectError> {
        let project = self.get_mut(project_id)?;
        let newly_ready: Vec<String> = project
            .nodes
            .values()
            .filter(|n| n.state == NodeState::Pending && project.prerequisites_completed(n))
            .map(|n| n.id.clone())
            .collect();
        for id in &newly_ready {
            project.bump(id, NodeState::Ready);
        }
        Ok(newly_ready.iter().filter_map(|id| project.node(id).cloned()).collect())
    }

    /// Completes a node. Must be `ready` or `in_progress`. Newly ready
    /// dependents flip `pending` → `ready`; if every node is completed the
    /// project transitions to `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ProjectNotFound`], [`ProjectError::NodeNotFound`],
    /// or [`ProjectError::InvalidNodeState`].
    pub fn complete(&mut self, project_id: &str, node_id: &str, result: Option<Value>) -> Result<(), ProjectError> {
        let project = self.get_mut(project_id)?;
        let node = project.nodes.get(node_id).ok_or_else(|| ProjectError::NodeNotFound { id: node_id.to_string() })?;
        if node.state != NodeState::Ready && node.state != NodeState::InProgress {
            return Err(ProjectError::InvalidNodeState {
                state: node_state_key(node.state).to_string(),
            });
        }
        project.bump(node_id, NodeState::Completed);
        if let Some(node) = project.nodes.get_mut(node_id) {
            node.result = result;
        }

        let dependents: Vec<String> = project.dependents_of(node_id);
        let newly_ready: Vec<String> = dependents
            .into_iter()
            .filter_map(|id| project.nodes.get(&id))
            .filter(|n| n.state == NodeState::Pending && project.prerequisites_completed(n))
            .map(|n| n.id.clone())
            .collect();
        for id in newly_ready {
            project.bump(&id, NodeState::Ready);
        }

        if project.nodes.values().all(|n| n.state == NodeState::Completed) {
            project.state = ProjectState::Completed;
        }
        self.store.reindex(project_id);
        Ok(())
    }

    /// Fails a node; every transitive dependent transitions to `blocked`.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ProjectNotFound`] or [`ProjectError::NodeNotFound`].
    pub fn fail(&mut self, project_id: &str, node_id: &str, reason: impl Into<String>) -> Result<(), ProjectError> {
        let project = self.get_mut(project_id)?;
        if !project.nodes.contains_key(node_id) {
            return Err(ProjectError::NodeNotFound { id: node_id.to_string() });
        }
        project.bump(node_id, NodeState::Failed);
        if let Some(node) = project.nodes.get_mut(node_id) {
            node.failure_reason = Some(reason.into());
        }
        let blocked = project.transitive_dependents(node_id);
        for id in blocked {
            project.bump(&id, NodeState::Blocked);
        }
        self.store.reindex(project_id);
        Ok(())
    }

    /// Pauses an active project; node states are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ProjectNotFound`] or
    /// [`ProjectError::InvalidProjectState`] if the project is not active.
    pub fn pause(&mut self, project_id: &str) -> Result<(), ProjectError> {
        let project = self.get_mut(project_id)?;
        if project.state != ProjectState::Active {
            return Err(ProjectError::InvalidProjectState {
                state: project_state_key(project.state).to_string(),
            });
        }
        project.state = ProjectState::Paused;
        self.store.reindex(project_id);
        Ok(())
    }

    /// Resumes a paused project; node states are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ProjectNotFound`] or
    /// [`ProjectError::InvalidProjectState`] if the project is not paused.
    pub fn resume(&mut self, project_id: &str) -> Result<(), ProjectError> {
        let project = self.get_mut(project_id)?;
        if project.state != ProjectState::Paused {
            return Err(ProjectError::InvalidProjectState {
                state: project_state_key(project.state).to_string(),
            });
        }
        project.state = ProjectState::Active;
        self.store.reindex(project_id);
        Ok(())
    }

    /// Attaches a snapshot to a node, recording the project's current
    /// history index so a later rollback knows what moved since.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ProjectNotFound`] or [`ProjectError::NodeNotFound`].
    pub fn checkpoint(
        &mut self,
        project_id: &str,
        node_id: &str,
        snapshot: Value,
        services: &Services,
    ) -> Result<Checkpoint, ProjectError> {
        let project = self.get_mut(project_id)?;
        if !project.nodes.contains_key(node_id) {
            return Err(ProjectError::NodeNotFound { id: node_id.to_string() });
        }
        let checkpoint = Checkpoint {
            id: services.new_id("cp"),
            node_id: node_id.to_string(),
            snapshot,
            history_index: project.history_index,
            taken_at: services.now(),
        };
        project.checkpoints.push(checkpoint.clone());
        Ok(checkpoint)
    }

    /// Reverts every node whose most recent transition happened after
    /// `checkpoint_id` was taken back to `pending` (nodes already pending
    /// are left unchanged), restores the checkpoint's snapshot onto its
    /// node, and reactivates the project.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectError::ProjectNotFound`] or
    /// [`ProjectError::CheckpointNotFound`].
    pub fn rollback(&mut self, project_id: &str, checkpoint_id: &str) -> Result<(), ProjectError> {
        let project = self.get_mut(project_id)?;
        let checkpoint = project
            .checkpoints
            .iter()
            .find(|c| c.id == checkpoint_id)
            .cloned()
            .ok_or_else(|| ProjectError::CheckpointNotFound { id: checkpoint_id.to_string() })?;

        let to_revert: Vec<String> = project
            .nodes
            .values()
            .filter(|n| n.last_transition_index > checkpoint.history_index && n.state != NodeState::Pending)
            .map(|n| n.id.clone())
            .collect();
        for id in to_revert {
            if let Some(node) = project.nodes.get_mut(&id) {
                node.state = NodeState::Pending;
            }
        }
        if let Some(node) = project.nodes.get_mut(&checkpoint.node_id) {
            node.result = Some(checkpoint.snapshot.clone());
        }
        project.state = ProjectState::Active;
        self.store.reindex(project_id);
        Ok(())
    }
}

const fn node_state_key(state: NodeState) -> &'static str {
    match state {
        NodeState::Pending => "pending",
        NodeState::Ready => "ready",
        NodeState::InProgress => "in_progress",
        NodeState::Completed => "completed",
        NodeState::Failed => "failed",
        NodeState::Blocked => "blocked",
        NodeState::RolledBack => "rolled_back",
    }
}

const fn project_state_key(state: ProjectState) -> &'static str {
    match state {
        ProjectState::Draft => "draft",
        ProjectState::Active => "active",
        ProjectState::Paused => "paused",
        ProjectState::Completed => "completed",
        ProjectState::Failed => "failed",
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

    #[test]
    fn missing_prerequisite_is_rejected() {
        let services = services();
        let mut store = ProjectStore::new(0);
        let project = store.create("demo", &services);
        let mut prereqs = BTreeSet::new();
        prereqs.insert("nd_nonexistent".to_string());
        let err = store.add_node(&project.id, prereqs, &services).unwrap_err();
        assert_eq!(err.code(), "missing_prerequisite");
    }

    #[test]
    fn start_promotes_root_nodes_to_ready() {
        let services = services();
        let mut store = ProjectStore::new(0);
        let project = store.create("demo", &services);
        let root = store.add_node(&project.id, BTreeSet::new(), &services).unwrap();
        store.start(&project.id).unwrap();
        assert_eq!(store.get(&project.id).unwrap().node(&root.id).unwrap().state, NodeState::Ready);
    }

    #[test]
    fn completing_a_node_promotes_its_dependent() {
        let services = services();
        let mut store = ProjectStore::new(0);
        let project = store.create("demo", &services);
        let root = store.add_node(&project.id, BTreeSet::new(), &services).unwrap();
        let mut deps = BTreeSet::new();
        deps.insert(root.id.clone());
        let child = store.add_node(&project.id, deps, &services).unwrap();
        store.start(&project.id).unwrap();
        store.complete(&project.id, &root.id, None).unwrap();
        assert_eq!(store.get(&project.id).unwrap().node(&child.id).unwrap().state, NodeState::Ready);
    }

    #[test]
    fn project_completes_once_every_node_is_done() {
        let services = services();
        let mut store = ProjectStore::new(0);
        let project = store.create("demo", &services);
        let only = store.add_node(&project.id, BTreeSet::new(), &services).unwrap();
        store.start(&project.id).unwrap();
        store.complete(&project.id, &only.id, None).unwrap();
        assert_eq!(store.get(&project.id).unwrap().state, ProjectState::Completed);
    }

    #[test]
    fn failing_a_node_blocks_its_transitive_dependents() {
        let services = services();
        let mut store = ProjectStore::new(0);
        let project = store.create("demo", &services);
        let root = store.add_node(&project.id, BTreeSet::new(), &services).unwrap();
        let mut deps = BTreeSet::new();
        deps.insert(root.id.clone());
        let child = store.add_node(&project.id, deps, &services).unwrap();
        let mut grandchild_deps = BTreeSet::new();
        grandchild_deps.insert(child.id.clone());
        let grandchild = store.add_node(&project.id, grandchild_deps, &services).unwrap();
        store.start(&project.id).unwrap();
        store.fail(&project.id, &root.id, "exploded").unwrap();
        let snapshot = store.get(&project.id).unwrap();
        assert_eq!(snapshot.node(&child.id).unwrap().state, NodeState::Blocked);
        assert_eq!(snapshot.node(&grandchild.id).unwrap().state, NodeState::Blocked);
    }

    #[test]
    fn rollback_reverts_nodes_moved_after_the_checkpoint() {
        let services = services();
        let mut store = ProjectStore::new(0);
        let project = store.create("demo", &services);
        let root = store.add_node(&project.id, BTreeSet::new(), &services).unwrap();
        store.start(&project.id).unwrap();
        let checkpoint = store.checkpoint(&project.id, &root.id, serde_json::json!({"n": 1}), &services).unwrap();
        store.complete(&project.id, &root.id, Some(serde_json::json!({"n": 2}))).unwrap();
        store.rollback(&project.id, &checkpoint.id).unwrap();
        let snapshot = store.get(&project.id).unwrap();
        assert_eq!(snapshot.node(&root.id).unwrap().state, NodeState::Pending);
        assert_eq!(snapshot.state, ProjectState::Active);
    }

    #[test]
    fn pause_and_resume_preserve_node_states() {
        let services = services();
        let mut store = ProjectStore::new(0);
        let project = store.create("demo", &services);
        let root = store.add_node(&project.id, BTreeSet::new(), &services).unwrap();
        store.start(&project.id).unwrap();
        store.pause(&project.id).unwrap();
        assert_eq!(store.get(&project.id).unwrap().node(&root.id).unwrap().state, NodeState::Ready);
        store.resume(&project.id).unwrap();
        assert_eq!(store.get(&project.id).unwrap().state, ProjectState::Active);
    }
}
