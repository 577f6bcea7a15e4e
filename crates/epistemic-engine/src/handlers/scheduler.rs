// epistemic-engine/src/handlers/scheduler.rs
// ============================================================================
// Module: Scheduler Handlers
// Description: Dispatches the `scheduler` domain's operations against the
// shared `Scheduler`.
// Dependencies: epistemic-scheduler::{scheduler, work_item}
// ============================================================================

use std::collections::BTreeMap;

use epistemic_scheduler::NewWorkItem;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "scheduler";

#[derive(Debug, Deserialize)]
struct EnqueueRequest {
    work_type: String,
    fingerprint: String,
    #[serde(default)]
    payload: Value,
    #[serde(default)]
    signals: BTreeMap<String, f64>,
    #[serde(default)]
    default_role: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdRequest {
    id: String,
}

/// Dispatches one `scheduler.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "enqueue" => {
            let req: EnqueueRequest = decode(DOMAIN, name, input)?;
            let new_item = NewWorkItem {
                work_type: req.work_type,
                fingerprint: req.fingerprint,
                payload: req.payload,
                signals: req.signals,
                default_role: req.default_role,
            };
            Ok(match ctx.scheduler.enqueue(new_item, &ctx.services) {
                Ok(item) => OperationResult::ok(json!({ "item": item })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "pop" => Ok(match ctx.scheduler.pop() {
            Some(item) => {
                let role = ctx.scheduler.assign(
                    &item,
                    ctx.outcomes.affinity(),
                    u64::try_from(ctx.config.scheduler.affinity_min_samples).unwrap_or(u64::MAX),
                    ctx.config.scheduler.affinity_min_rate,
                );
                OperationResult::ok(json!({ "item": item, "assignedRole": role }))
            }
            None => OperationResult::ok(json!({ "item": Value::Null })),
        }),
        "complete" => {
            let req: IdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.scheduler.complete(&req.id) {
                Ok(item) => OperationResult::ok(json!({ "item": item })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "fail" => {
            let req: IdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.scheduler.fail(&req.id) {
                Ok(item) => OperationResult::ok(json!({ "item": item })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "status" => {
            let req: IdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.scheduler.get(&req.id) {
                Some(item) => OperationResult::ok(json!({ "item": item })),
                None => OperationResult::err("not_found"),
            })
        }
        "rescore" => {
            ctx.scheduler.rescore();
            Ok(OperationResult::ok(Value::Null))
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
