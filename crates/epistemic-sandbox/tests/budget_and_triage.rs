use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use epistemic_config::SandboxConfig;
use epistemic_core::Instant;
use epistemic_core::ManualClock;
use epistemic_core::Services;
use epistemic_sandbox::AlertSeverity;
use epistemic_sandbox::QosPriority;
use epistemic_sandbox::ResourcePool;
use epistemic_sandbox::ResourceType;
use epistemic_sandbox::SandboxKind;
use epistemic_sandbox::SandboxStore;

#[test]
fn a_sandbox_exhausts_its_budget_and_gets_killed_past_its_time_limit() {
    let clock = Arc::new(ManualClock::new(Instant::from_millis(0)));
    let services = Services::with_clock(clock.clone());
    let mut sandboxes = SandboxStore::new(0);

    let id = sandboxes.create(SandboxKind::Agent, QosPriority::Normal, 5.0, 10, 2_000, BTreeSet::from(["read_ku".to_string()]), &services);

    sandboxes.with_mut(&id, |sandbox| sandbox.consume_budget(3.0, services.now())).unwrap().unwrap();
    let denied = sandboxes.with_mut(&id, |sandbox| sandbox.check_permission("write_ku", services.now())).unwrap();
    assert!(!denied);

    let err = sandboxes.with_mut(&id, |sandbox| sandbox.consume_budget(4.0, services.now())).unwrap().unwrap_err();
    assert_eq!(err.code(), "budget_exceeded");

    clock.advance(2_500);
    let killed = sandboxes.enforce_time_limits(services.now());
    assert_eq!(killed, vec![id]);
}

#[test]
fn resource_pressure_raises_alerts_and_triage_protects_critical_sandboxes() {
    let services = Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))));

    let mut totals = BTreeMap::new();
    totals.insert(ResourceType::Compute, 10.0);
    let mut pool = ResourcePool::new(&totals);
    pool.reserve(ResourceType::Compute, 9.1, &services).unwrap();

    let config = SandboxConfig::default();
    let alerts = pool.alerts(services.now(), &config);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, AlertSeverity::High);

    let mut sandboxes = SandboxStore::new(0);
    let critical = sandboxes.create(SandboxKind::Agent, QosPriority::Critical, 10.0, 10, 30_000, BTreeSet::new(), &services);
    sandboxes.create(SandboxKind::Agent, QosPriority::Background, 10.0, 10, 30_000, BTreeSet::new(), &services);
    sandboxes.create(SandboxKind::Agent, QosPriority::Normal, 10.0, 10, 30_000, BTreeSet::new(), &services);

    let suspended = sandboxes.perform_triage(1, services.now());
    assert_eq!(suspended.len(), 2);
    assert_eq!(sandboxes.get(&critical).unwrap().status(), epistemic_sandbox::SandboxStatus::Active);
}
