// epistemic-engine/src/handlers/truth.rs
// ============================================================================
// Module: Truth Lifecycle Handlers
// Description: Dispatches the `truth` domain's operations against the
// shared `TruthLifecycle`.
// Dependencies: epistemic-core::truth
// ============================================================================

use epistemic_core::TruthState;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "truth";

#[derive(Debug, Deserialize)]
struct BirthRequest {
    ku_id: String,
}

#[derive(Debug, Deserialize)]
struct TransitionRequest {
    ku_id: String,
    to: TruthState,
    reason: String,
    actor: String,
}

#[derive(Debug, Deserialize)]
struct StagnationRequest {
    #[serde(default)]
    threshold_millis: Option<u64>,
}

/// Dispatches one `truth.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "birth" => {
            let req: BirthRequest = decode(DOMAIN, name, input)?;
            ctx.truth.birth(req.ku_id, &ctx.services);
            Ok(OperationResult::ok(Value::Null))
        }
        "transition" => {
            let req: TransitionRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.truth.transition(&req.ku_id, req.to, req.reason, req.actor, &ctx.services) {
                Ok(state) => OperationResult::ok(json!({ "state": state })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "detectStagnation" => {
            let req: StagnationRequest = decode(DOMAIN, name, input)?;
            let threshold = req.threshold_millis.unwrap_or(ctx.config.truth.stagnation_threshold_ms);
            let flags = ctx.truth.detect_stagnation(threshold, ctx.services.now());
            Ok(OperationResult::ok(json!({ "flags": flags })))
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
