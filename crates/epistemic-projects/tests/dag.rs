// Integration test: a diamond-shaped DAG runs through start, completion
// cascades, and a mid-run failure blocks the right nodes.

use std::collections::BTreeSet;
use std::sync::Arc;

use epistemic_core::Instant;
use epistemic_core::ManualClock;
use epistemic_core::Services;
use epistemic_projects::NodeState;
use epistemic_projects::ProjectState;
use epistemic_projects::ProjectStore;

fn services() -> Services {
    Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
}

#[test]
fn diamond_dag_completes_once_every_branch_joins() {
    let services = services();
    let mut store = ProjectStore::new(0);
    let project = store.create("diamond", &services);

    let root = store.add_node(&project.id, BTreeSet::new(), &services).unwrap();
    let mut left_deps = BTreeSet::new();
    left_deps.insert(root.id.clone());
    let left = store.add_node(&project.id, left_deps, &services).unwrap();
    let mut right_deps = BTreeSet::new();
    right_deps.insert(root.id.clone());
    let right = store.add_node(&project.id, right_deps, &services).unwrap();
    let mut join_deps = BTreeSet::new();
    join_deps.insert(left.id.clone());
    join_deps.insert(right.id.clone());
    let join = store.add_node(&project.id, join_deps, &services).unwrap();

    store.start(&project.id).unwrap();
    store.complete(&project.id, &root.id, None).unwrap();

    let snapshot = store.get(&project.id).unwrap();
    assert_eq!(snapshot.node(&left.id).unwrap().state, NodeState::Ready);
    assert_eq!(snapshot.node(&right.id).unwrap().state, NodeState::Ready);
    assert_eq!(snapshot.node(&join.id).unwrap().state, NodeState::Pending);

    store.complete(&project.id, &left.id, None).unwrap();
    assert_eq!(store.get(&project.id).unwrap().node(&join.id).unwrap().state, NodeState::Pending);

    store.complete(&project.id, &right.id, None).unwrap();
    assert_eq!(store.get(&project.id).unwrap().node(&join.id).unwrap().state, NodeState::Ready);

    store.complete(&project.id, &join.id, None).unwrap();
    assert_eq!(store.get(&project.id).unwrap().state, ProjectState::Completed);
}

#[test]
fn failure_mid_fanout_blocks_only_its_own_branch() {
    let services = services();
    let mut store = ProjectStore::new(0);
    let project = store.create("diamond", &services);

    let root = store.add_node(&project.id, BTreeSet::new(), &services).unwrap();
    let mut left_deps = BTreeSet::new();
    left_deps.insert(root.id.clone());
    let left = store.add_node(&project.id, left_deps, &services).unwrap();
    let mut right_deps = BTreeSet::new();
    right_deps.insert(root.id.clone());
    let right = store.add_node(&project.id, right_deps, &services).unwrap();

    store.start(&project.id).unwrap();
    store.complete(&project.id, &root.id, None).unwrap();
    store.fail(&project.id, &left.id, "boom").unwrap();

    let snapshot = store.get(&project.id).unwrap();
    assert_eq!(snapshot.node(&left.id).unwrap().state, NodeState::Failed);
    assert_eq!(snapshot.node(&right.id).unwrap().state, NodeState::Ready);
}
