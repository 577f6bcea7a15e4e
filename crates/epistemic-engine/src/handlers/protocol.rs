// epistemic-engine/src/handlers/protocol.rs
// ============================================================================
// Module: Protocol Handlers
// Description: Dispatches the `protocol` domain's operations against the
// shared `ProtocolStore`.
// Dependencies: epistemic-coordination::protocol
// ============================================================================

use std::collections::BTreeSet;

use epistemic_coordination::Plan;
use epistemic_coordination::Position;
use epistemic_coordination::Protocol;
use epistemic_core::Instant;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "protocol";

#[derive(Debug, Deserialize)]
struct CreateRequest {
    mode: String,
    initiator: String,
}

#[derive(Debug, Deserialize)]
struct JoinRequest {
    protocol_id: String,
    participant: String,
    #[serde(default)]
    declared_intent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeclareIntentRequest {
    protocol_id: String,
    participant: String,
    intent_text: String,
    #[serde(default)]
    evidence_ids: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct SubmitPlanRequest {
    protocol_id: String,
    plan: Plan,
}

#[derive(Debug, Deserialize)]
struct ProtocolIdRequest {
    protocol_id: String,
}

#[derive(Debug, Deserialize)]
struct StartNegotiationRequest {
    protocol_id: String,
    topic: String,
}

#[derive(Debug, Deserialize)]
struct SubmitPositionRequest {
    protocol_id: String,
    negotiation_id: String,
    position: Position,
}

#[derive(Debug, Deserialize)]
struct ResolveRequest {
    protocol_id: String,
    negotiation_id: String,
    now_millis: i64,
}

#[derive(Debug, Deserialize)]
struct VetoRequest {
    protocol_id: String,
    participant: String,
    reason: String,
}

/// Dispatches one `protocol.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "create" => {
            let req: CreateRequest = decode(DOMAIN, name, input)?;
            let protocol = ctx.protocols.create(req.mode, req.initiator, &ctx.services);
            Ok(OperationResult::ok(json!({ "protocol": protocol })))
        }
        "join" => {
            let req: JoinRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.protocols.with_mut(&req.protocol_id, |p| p.join(req.participant, req.declared_intent)) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "declareIntent" => {
            let req: DeclareIntentRequest = decode(DOMAIN, name, input)?;
            Ok(
                match ctx.protocols.with_mut(&req.protocol_id, |p| p.declare_intent(&req.participant, req.intent_text, req.evidence_ids)) {
                    Ok(()) => OperationResult::ok(Value::Null),
                    Err(err) => OperationResult::err(err.code()),
                },
            )
        }
        "submitPlan" => {
            let req: SubmitPlanRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.protocols.with_mut(&req.protocol_id, |p| p.submit_plan(req.plan)) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "checkCompatibility" => {
            let req: ProtocolIdRequest = decode(DOMAIN, name, input)?;
            match ctx.protocols.get(&req.protocol_id) {
                Some(protocol) => {
                    let conflicts = protocol.check_plan_compatibility();
                    Ok(OperationResult::ok(json!({ "conflicts": conflicts })))
                }
                None => Ok(OperationResult::err("not_found")),
            }
        }
        "startNegotiation" => {
            let req: StartNegotiationRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.protocols.with_mut(&req.protocol_id, |p| Ok(p.start_negotiation(req.topic, &ctx.services))) {
                Ok(negotiation) => OperationResult::ok(json!({ "negotiation": negotiation })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "submitPosition" => {
            let req: SubmitPositionRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.protocols.with_mut(&req.protocol_id, |p| p.submit_position(&req.negotiation_id, req.position)) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "resolve" => {
            let req: ResolveRequest = decode(DOMAIN, name, input)?;
            let now = Instant::from_millis(req.now_millis);
            Ok(match ctx.protocols.with_mut(&req.protocol_id, |p| p.resolve_negotiation(&req.negotiation_id, now)) {
                Ok(resolution) => OperationResult::ok(json!({ "resolution": resolution })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "veto" => {
            let req: VetoRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.protocols.with_mut(&req.protocol_id, |p| p.veto(&req.participant, req.reason)) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "pause" => {
            let req: ProtocolIdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.protocols.with_mut(&req.protocol_id, Protocol::pause) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "resume" => {
            let req: ProtocolIdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.protocols.with_mut(&req.protocol_id, Protocol::resume) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
