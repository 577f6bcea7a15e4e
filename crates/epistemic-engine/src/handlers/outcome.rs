// epistemic-engine/src/handlers/outcome.rs
// ============================================================================
// Module: Outcome Handlers
// Description: Dispatches the `outcome` domain's operations against the
// shared `OutcomeStore` and `WeightLearner`.
// Dependencies: epistemic-scheduler::{outcome, learner}
// ============================================================================

use std::collections::BTreeMap;

use epistemic_scheduler::NewOutcome;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "outcome";

#[derive(Debug, Deserialize)]
struct RecordRequest {
    work_item_id: String,
    #[serde(default)]
    allocation_id: Option<String>,
    emergent_id: String,
    work_type: String,
    signal: String,
    positive: bool,
    #[serde(default)]
    signal_values: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct WorkItemRequest {
    work_item_id: String,
}

#[derive(Debug, Deserialize)]
struct ActorRequest {
    emergent_id: String,
}

#[derive(Debug, Deserialize)]
struct RunLearningRequest {
    #[serde(default)]
    lookback: usize,
}

#[derive(Debug, Deserialize)]
struct RecommendationsRequest {
    #[serde(default)]
    work_type: Option<String>,
    #[serde(default)]
    min_samples: Option<u64>,
}

/// Dispatches one `outcome.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "record" => {
            let req: RecordRequest = decode(DOMAIN, name, input)?;
            let new_outcome = NewOutcome {
                work_item_id: req.work_item_id,
                allocation_id: req.allocation_id,
                emergent_id: req.emergent_id,
                work_type: req.work_type,
                signal: req.signal,
                positive: req.positive,
                signal_values: req.signal_values,
            };
            let record = ctx.outcomes.record(new_outcome, &ctx.services);
            Ok(OperationResult::ok(json!({ "record": record })))
        }
        "forWorkItem" => {
            let req: WorkItemRequest = decode(DOMAIN, name, input)?;
            let records = ctx.outcomes.for_work_item(&req.work_item_id);
            Ok(OperationResult::ok(json!({ "records": records })))
        }
        "forActor" => {
            let req: ActorRequest = decode(DOMAIN, name, input)?;
            let records = ctx.outcomes.for_actor(&req.emergent_id);
            Ok(OperationResult::ok(json!({ "records": records })))
        }
        "stats" => Ok(OperationResult::ok(json!({ "count": ctx.outcomes.len() }))),
        "runLearning" => {
            let req: RunLearningRequest = decode(DOMAIN, name, input)?;
            let scheduler_config = ctx.config.scheduler.clone();
            Ok(match ctx.weight_learner.run_weight_learning(
                &ctx.outcomes,
                scheduler_config.min_samples,
                scheduler_config.max_adjustment,
                req.lookback,
                &ctx.services,
            ) {
                Ok(entry) => {
                    ctx.scheduler.set_weights(entry.new_weights.clone());
                    ctx.scheduler.rescore();
                    OperationResult::ok(json!({ "update": entry }))
                }
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "recommendations" => {
            let req: RecommendationsRequest = decode(DOMAIN, name, input)?;
            let min_samples = req.min_samples.unwrap_or(u64::try_from(scheduler_config_min(ctx)).unwrap_or(u64::MAX));
            Ok(match req.work_type {
                Some(work_type) => {
                    let recs = ctx.outcomes.affinity().recommendations_for(&work_type, min_samples);
                    OperationResult::ok(json!({ "recommendations": recs }))
                }
                None => {
                    let recs = ctx.outcomes.affinity().recommendations(min_samples);
                    OperationResult::ok(json!({ "recommendations": recs }))
                }
            })
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}

fn scheduler_config_min(ctx: &EngineContext) -> usize {
    ctx.config.scheduler.affinity_min_samples
}
