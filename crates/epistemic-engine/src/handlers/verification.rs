// epistemic-engine/src/handlers/verification.rs
// ============================================================================
// Module: Verification Handlers
// Description: Dispatches the `verification` domain's operations against
// the shared `PipelineEngine`, checked against knowledge units drawn from
// the shared `KnowledgeStore`.
// Dependencies: epistemic-verify, epistemic-core::knowledge
// ============================================================================

use epistemic_verify::PipelineDefinition;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "verification";

#[derive(Debug, Deserialize)]
struct RunRequest {
    pipeline: String,
    ku_id: String,
}

#[derive(Debug, Deserialize)]
struct VerifyKuRequest {
    ku_id: String,
}

#[derive(Debug, Deserialize)]
struct HistoryRequest {
    #[serde(default)]
    ku_id: Option<String>,
}

/// Dispatches one `verification.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "createPipeline" => {
            let definition: PipelineDefinition = decode(DOMAIN, name, input)?;
            Ok(match ctx.verification.create_pipeline(definition) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "listPipelines" => {
            let pipelines: Vec<_> = ctx.verification.list_pipelines().collect();
            Ok(OperationResult::ok(json!({ "pipelines": pipelines })))
        }
        "runPipeline" => {
            let req: RunRequest = decode(DOMAIN, name, input)?;
            let ku = match ctx.knowledge.get(&req.ku_id) {
                Ok(ku) => ku.clone(),
                Err(err) => return Ok(OperationResult::err(err.code())),
            };
            Ok(match ctx.verification.run_pipeline(&req.pipeline, &ku, &ctx.knowledge, &ctx.services) {
                Ok((run, evidence)) => {
                    let record =
                        ctx.evidence.attach(evidence.target, evidence.evidence_type, evidence.direction, evidence.strength, evidence.data, evidence.source, &ctx.services);
                    OperationResult::ok(json!({ "run": run, "derivedEvidence": record.ok() }))
                }
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "verifyKU" => {
            let req: VerifyKuRequest = decode(DOMAIN, name, input)?;
            let ku = match ctx.knowledge.get(&req.ku_id) {
                Ok(ku) => ku.clone(),
                Err(err) => return Ok(OperationResult::err(err.code())),
            };
            Ok(match ctx.verification.verify_ku(&ku, &ctx.knowledge, &ctx.services) {
                Ok(runs) => {
                    let mut out_runs = Vec::with_capacity(runs.len());
                    for (run, evidence) in runs {
                        let _record =
                            ctx.evidence.attach(evidence.target, evidence.evidence_type, evidence.direction, evidence.strength, evidence.data, evidence.source, &ctx.services);
                        out_runs.push(run);
                    }
                    OperationResult::ok(json!({ "runs": out_runs }))
                }
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "history" => {
            let req: HistoryRequest = decode(DOMAIN, name, input)?;
            let runs: Vec<_> = match req.ku_id {
                Some(ku_id) => ctx.verification.history_for_ku(&ku_id),
                None => ctx.verification.history().collect(),
            };
            Ok(OperationResult::ok(json!({ "runs": runs })))
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
