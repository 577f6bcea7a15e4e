// epistemic-engine/src/handlers/commitment.rs
// ============================================================================
// Module: Commitment Handlers
// Description: Dispatches the `commitment` domain's operations against the
// shared `CommitmentStore`.
// Dependencies: epistemic-coordination::commitment
// ============================================================================

use epistemic_coordination::CommitmentState;
use epistemic_core::Instant;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "commitment";

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    actor: String,
    text: String,
    #[serde(default)]
    deadline_millis: Option<i64>,
    #[serde(default)]
    verifiers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TransitionRequest {
    id: String,
    to: CommitmentState,
    actor: String,
    #[serde(default)]
    evidence: Option<Value>,
}

/// Dispatches one `commitment.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "register" => {
            let req: RegisterRequest = decode(DOMAIN, name, input)?;
            let deadline = req.deadline_millis.map(Instant::from_millis);
            let commitment = ctx.commitments.register(req.actor, req.text, deadline, req.verifiers, &ctx.services);
            Ok(OperationResult::ok(json!({ "commitment": commitment })))
        }
        "transition" => {
            let req: TransitionRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.commitments.transition(&req.id, req.to, req.actor, req.evidence, &ctx.services) {
                Ok(commitment) => OperationResult::ok(json!({ "commitment": commitment })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "detectBreaches" => {
            let breached = ctx.commitments.detect_breaches(&ctx.services);
            Ok(OperationResult::ok(json!({ "breached": breached })))
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
