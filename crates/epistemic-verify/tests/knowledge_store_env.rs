// Integration test: running checks against a real `KnowledgeStore` as the
// `CheckEnv`, exercising contradiction_scan and cross_reference against
// actual edges rather than the `NoEdges` stub.

use std::collections::BTreeSet;

use epistemic_core::Direction;
use epistemic_core::EdgeType;
use epistemic_core::Instant;
use epistemic_core::KnowledgeStore;
use epistemic_core::ManualClock;
use epistemic_core::NewKnowledgeUnit;
use epistemic_core::Services;
use epistemic_core::Tier;
use epistemic_verify::CheckDefinition;
use epistemic_verify::CheckSeverity;
use epistemic_verify::CheckType;
use epistemic_verify::PipelineDefinition;
use epistemic_verify::PipelineEngine;
use serde_json::json;

fn services() -> Services {
    Services::with_clock(std::sync::Arc::new(ManualClock::new(Instant::from_millis(0))))
}

fn new_unit(title: &str) -> NewKnowledgeUnit {
    NewKnowledgeUnit {
        title: title.to_string(),
        body: "a body of knowledge".to_string(),
        tier: Tier::Regular,
        tags: BTreeSet::from(["physics".to_string()]),
        resonance: 0.5,
        coherence: 0.5,
        stability: 0.5,
    }
}

#[test]
fn contradiction_scan_fails_once_a_contradicting_edge_exists() {
    let services = services();
    let mut knowledge = KnowledgeStore::new(0);
    let a = knowledge.create(new_unit("claim a"), &services).unwrap();
    let b = knowledge.create(new_unit("claim b"), &services).unwrap();
    knowledge.add_edge(&a.id, &b.id, EdgeType::Contradicts, &services).unwrap();

    let mut engine = PipelineEngine::new(0);
    engine
        .create_pipeline(PipelineDefinition {
            name: "scan".to_string(),
            domain_filter: None,
            checks: vec![CheckDefinition {
                name: "contradictions".to_string(),
                check_type: CheckType::ContradictionScan,
                config: json!({}),
                severity: CheckSeverity::Error,
                enabled: true,
            }],
        })
        .unwrap();

    let a = knowledge.get(&a.id).unwrap().clone();
    let (run, evidence) = engine.run_pipeline("scan", &a, &knowledge, &services).unwrap();
    assert_eq!(run.outcome, epistemic_verify::RunOutcome::Fail);
    assert_eq!(evidence.direction, Direction::Refutes);
}

#[test]
fn cross_reference_passes_once_a_supporting_edge_arrives() {
    let services = services();
    let mut knowledge = KnowledgeStore::new(0);
    let target = knowledge.create(new_unit("core claim"), &services).unwrap();
    let supporter = knowledge.create(new_unit("supporting claim"), &services).unwrap();
    knowledge.add_edge(&supporter.id, &target.id, EdgeType::Supports, &services).unwrap();

    let mut engine = PipelineEngine::new(0);
    engine
        .create_pipeline(PipelineDefinition {
            name: "xref".to_string(),
            domain_filter: None,
            checks: vec![CheckDefinition {
                name: "supported".to_string(),
                check_type: CheckType::CrossReference,
                config: json!({ "min_count": 1 }),
                severity: CheckSeverity::Warning,
                enabled: true,
            }],
        })
        .unwrap();

    let target = knowledge.get(&target.id).unwrap().clone();
    let (run, _evidence) = engine.run_pipeline("xref", &target, &knowledge, &services).unwrap();
    assert_eq!(run.outcome, epistemic_verify::RunOutcome::Pass);
}
