// epistemic-engine/src/handlers/evidence.rs
// ============================================================================
// Module: Evidence Handlers
// Description: Dispatches the `evidence` domain's operations against the
// shared `EvidenceStore`.
// Dependencies: epistemic-core::evidence
// ============================================================================

use epistemic_core::Direction;
use epistemic_core::EvidenceType;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "evidence";

#[derive(Debug, Deserialize)]
struct AttachRequest {
    target: String,
    evidence_type: EvidenceType,
    direction: Direction,
    strength: f64,
    #[serde(default)]
    data: Value,
    source: String,
}

#[derive(Debug, Deserialize)]
struct TargetRequest {
    target: String,
}

#[derive(Debug, Deserialize)]
struct DeprecateRequest {
    target: String,
    reason: String,
    #[serde(default)]
    successor_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RetractRequest {
    target: String,
    reason: String,
    #[serde(default)]
    evidence_id: Option<String>,
}

/// Dispatches one `evidence.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "attach" => {
            let req: AttachRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.evidence.attach(req.target, req.evidence_type, req.direction, req.strength, req.data, req.source, &ctx.services) {
                Ok(record) => OperationResult::ok(json!({ "record": record })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "forKU" => {
            let req: TargetRequest = decode(DOMAIN, name, input)?;
            let records = ctx.evidence.evidence_for(&req.target);
            Ok(OperationResult::ok(json!({ "records": records })))
        }
        "status" => {
            let req: TargetRequest = decode(DOMAIN, name, input)?;
            let status = ctx.evidence.derive_status(&req.target);
            Ok(OperationResult::ok(json!({ "status": status })))
        }
        "deprecate" => {
            let req: DeprecateRequest = decode(DOMAIN, name, input)?;
            ctx.evidence.deprecate(&req.target, req.reason, req.successor_id, &ctx.services);
            Ok(OperationResult::ok(Value::Null))
        }
        "retract" => {
            let req: RetractRequest = decode(DOMAIN, name, input)?;
            ctx.evidence.retract(&req.target, req.reason, req.evidence_id, &ctx.services);
            Ok(OperationResult::ok(Value::Null))
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
