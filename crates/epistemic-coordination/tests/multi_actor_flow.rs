// Integration test: a protocol negotiates a plan, a shared resource gate
// blocks execution, and a vetoed protocol triggers a coordinated rollback.

use std::collections::BTreeSet;
use std::sync::Arc;

use epistemic_config::CommitmentConfig;
use epistemic_core::Instant;
use epistemic_core::ManualClock;
use epistemic_core::Services;
use epistemic_coordination::AccountabilityEdge;
use epistemic_coordination::AccountabilityGraph;
use epistemic_coordination::CommitmentState;
use epistemic_coordination::CommitmentStore;
use epistemic_coordination::ConflictKind;
use epistemic_coordination::EdgeKind;
use epistemic_coordination::InterlockKind;
use epistemic_coordination::InterlockStore;
use epistemic_coordination::NodeKind;
use epistemic_coordination::Plan;
use epistemic_coordination::PlanEffect;
use epistemic_coordination::ProtocolStore;
use epistemic_coordination::RollbackStore;

fn services() -> Services {
    Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
}

#[test]
fn protocol_detects_a_contradiction_before_plans_execute() {
    let services = services();
    let mut store = ProtocolStore::new(0);
    let protocol = store.create("consensus", "ops", &services);

    store
        .with_mut(&protocol.id, |p| {
            p.join("release", None)?;
            p.submit_plan(Plan {
                participant: "ops".to_string(),
                resources: BTreeSet::new(),
                inputs: BTreeSet::new(),
                outputs: BTreeSet::new(),
                effects: vec![PlanEffect {
                    target: "feature_flag".to_string(),
                    direction: "enable".to_string(),
                }],
            })?;
            p.submit_plan(Plan {
                participant: "release".to_string(),
                resources: BTreeSet::new(),
                inputs: BTreeSet::new(),
                outputs: BTreeSet::new(),
                effects: vec![PlanEffect {
                    target: "feature_flag".to_string(),
                    direction: "disable".to_string(),
                }],
            })
        })
        .unwrap();

    let conflicts = store.get(&protocol.id).unwrap().check_plan_compatibility();
    assert!(conflicts.iter().any(|c| c.kind == ConflictKind::Contradiction));
}

#[test]
fn deployment_lock_and_commitment_breach_drive_a_rollback() {
    let clock = Arc::new(ManualClock::new(Instant::from_millis(0)));
    let services = Services::with_clock(clock.clone());

    let mut locks = InterlockStore::new(0);
    let deploy_lock = locks.create(InterlockKind::Mutex, &services);
    let held = locks.with_mut(&deploy_lock.id, |l| Ok(l.acquire("region_a", 0, services.now()))).unwrap();
    assert!(held.acquired);
    let blocked = locks.with_mut(&deploy_lock.id, |l| Ok(l.acquire("region_b", 0, services.now()))).unwrap();
    assert!(!blocked.acquired);

    let mut commitments = CommitmentStore::new(0);
    let commitment = commitments.register(
        "region_a",
        "finish the deploy by the deadline",
        Some(Instant::from_millis(50)),
        vec!["oncall".to_string()],
        &services,
    );
    clock.advance(100);
    let breached = commitments.detect_breaches(&services);
    assert_eq!(breached, vec![commitment.id.clone()]);
    assert_eq!(commitments.get(&commitment.id).unwrap().state, CommitmentState::Breached);

    let mut rollbacks = RollbackStore::new(0);
    let coordination = rollbacks.initiate("deploy breached its deadline", vec!["region_a".to_string(), "region_b".to_string()], &services);
    rollbacks.with_mut(&coordination.id, |c| c.checkpoint("region_a", serde_json::json!({"version": 41}))).unwrap();
    rollbacks.with_mut(&coordination.id, |c| c.checkpoint("region_b", serde_json::json!({"version": 41}))).unwrap();
    rollbacks.with_mut(&coordination.id, epistemic_coordination::RollbackCoordination::execute).unwrap();

    assert_eq!(rollbacks.get(&coordination.id).unwrap().status, epistemic_coordination::RollbackStatus::Completed);

    let mut graph = AccountabilityGraph::new();
    graph.record(AccountabilityEdge {
        from: NodeKind::Actor("region_a".to_string()),
        to: NodeKind::Outcome("deploy".to_string()),
        kind: EdgeKind::Executed,
        weight: 1.0,
        evidence: Vec::new(),
    });
    let attributions = graph.compute_attribution(&CommitmentConfig::default());
    assert_eq!(attributions.len(), 1);
    assert_eq!(attributions[0].actor, "region_a");
}
