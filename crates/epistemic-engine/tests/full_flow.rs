// Integration test: a knowledge unit is created, evidence is attached and
// verified through a pipeline, a matching work item is scheduled and
// completed, and the resulting outcome retunes the scheduler's weights.

use std::sync::Arc;

use epistemic_config::EngineConfig;
use epistemic_core::Instant;
use epistemic_core::ManualClock;
use epistemic_core::Services;
use epistemic_core::TruthState;
use epistemic_engine::EngineContext;
use serde_json::Value;
use serde_json::json;

fn services() -> Services {
    Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
}

fn ctx() -> EngineContext {
    EngineContext::with_services(EngineConfig::default(), ["review".to_string()].into_iter().collect(), services())
}

#[test]
fn ku_lifecycle_through_evidence_and_verification() {
    let mut ctx = ctx();

    let create_result = epistemic_engine::dispatch(
        &mut ctx,
        "ku",
        "create",
        json!({
            "title": "cache eviction policy",
            "body": "LRU with a size-based ceiling",
            "tier": "regular",
            "tags": ["cache"],
        }),
    );
    assert!(create_result.ok, "{create_result:?}");
    let ku_id = create_result.data["unit"]["id"].as_str().unwrap().to_string();

    assert_eq!(ctx.truth.state(&ku_id), Some(TruthState::Born));

    let attach_result = epistemic_engine::dispatch(
        &mut ctx,
        "evidence",
        "attach",
        json!({
            "target": ku_id,
            "evidence_type": "test_result",
            "direction": "supports",
            "strength": 0.9,
            "source": "benchmark_suite",
        }),
    );
    assert!(attach_result.ok, "{attach_result:?}");

    let status_result = epistemic_engine::dispatch(&mut ctx, "evidence", "status", json!({ "target": ku_id }));
    assert!(status_result.ok);

    let pipeline_definition = json!({
        "name": "baseline",
        "domain_filter": null,
        "checks": [
            {
                "name": "quality-consistency",
                "check_type": "consistency",
                "config": {},
                "severity": "error",
                "enabled": true,
            },
        ],
    });
    let create_pipeline = epistemic_engine::dispatch(&mut ctx, "verification", "createPipeline", pipeline_definition);
    assert!(create_pipeline.ok, "{create_pipeline:?}");
    let run_result = epistemic_engine::dispatch(&mut ctx, "verification", "runPipeline", json!({ "pipeline": "baseline", "ku_id": ku_id }));
    assert!(run_result.ok, "{run_result:?}");
    assert!(run_result.data["derivedEvidence"].is_object(), "{run_result:?}");

    let records = ctx.evidence.evidence_for(&ku_id);
    assert!(records.iter().any(|record| record.source == "baseline"));
}

#[test]
fn scheduler_outcome_round_trip_retunes_weights() {
    let mut ctx = ctx();

    let enqueue_result = epistemic_engine::dispatch(
        &mut ctx,
        "scheduler",
        "enqueue",
        json!({
            "work_type": "review",
            "fingerprint": "wi-1",
            "signals": { "impact": 0.9 },
        }),
    );
    assert!(enqueue_result.ok, "{enqueue_result:?}");
    let work_item_id = enqueue_result.data["item"]["id"].as_str().unwrap().to_string();

    let pop_result = epistemic_engine::dispatch(&mut ctx, "scheduler", "pop", Value::Null);
    assert!(pop_result.ok);
    assert_eq!(pop_result.data["item"]["id"].as_str(), Some(work_item_id.as_str()));

    let complete_result = epistemic_engine::dispatch(&mut ctx, "scheduler", "complete", json!({ "id": work_item_id }));
    assert!(complete_result.ok, "{complete_result:?}");

    for _ in 0..25 {
        let record_result = epistemic_engine::dispatch(
            &mut ctx,
            "outcome",
            "record",
            json!({
                "work_item_id": work_item_id,
                "emergent_id": "role_reviewer",
                "work_type": "review",
                "signal": "user_accepted",
                "positive": true,
                "signal_values": { "impact": 0.9 },
            }),
        );
        assert!(record_result.ok, "{record_result:?}");
    }

    let learning_result = epistemic_engine::dispatch(&mut ctx, "outcome", "runLearning", json!({}));
    assert!(learning_result.ok, "{learning_result:?}");
    assert!(ctx.scheduler.queued().is_empty());
}
