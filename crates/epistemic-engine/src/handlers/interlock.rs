// epistemic-engine/src/handlers/interlock.rs
// ============================================================================
// Module: Interlock Handlers
// Description: Dispatches the `interlock` domain's operations against the
// shared `InterlockStore`.
// Dependencies: epistemic-coordination::interlock
// ============================================================================

use epistemic_coordination::InterlockKind;
use epistemic_core::Instant;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "interlock";

#[derive(Debug, Deserialize)]
struct CreateRequest {
    kind: InterlockKind,
}

#[derive(Debug, Deserialize)]
struct AcquireRequest {
    interlock_id: String,
    actor: String,
    #[serde(default)]
    sequence_key: i64,
    now_millis: i64,
}

#[derive(Debug, Deserialize)]
struct ReleaseRequest {
    interlock_id: String,
    actor: String,
    now_millis: i64,
}

#[derive(Debug, Deserialize)]
struct ApproveGateRequest {
    interlock_id: String,
    actor: String,
    now_millis: i64,
}

/// Dispatches one `interlock.*` operation.
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
            let interlock = ctx.interlocks.create(req.kind, &ctx.services);
            Ok(OperationResult::ok(json!({ "interlock": { "id": interlock.id } })))
        }
        "acquire" => {
            let req: AcquireRequest = decode(DOMAIN, name, input)?;
            let now = Instant::from_millis(req.now_millis);
            Ok(
                match ctx
                    .interlocks
                    .with_mut(&req.interlock_id, |lock| Ok(lock.acquire(req.actor, req.sequence_key, now)))
                {
                    Ok(result) => OperationResult::ok(json!({ "result": result })),
                    Err(err) => OperationResult::err(err.code()),
                },
            )
        }
        "release" => {
            let req: ReleaseRequest = decode(DOMAIN, name, input)?;
            let now = Instant::from_millis(req.now_millis);
            Ok(match ctx.interlocks.with_mut(&req.interlock_id, |lock| {
                lock.release(&req.actor, now);
                Ok(())
            }) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "approveGate" => {
            let req: ApproveGateRequest = decode(DOMAIN, name, input)?;
            let now = Instant::from_millis(req.now_millis);
            Ok(match ctx.interlocks.with_mut(&req.interlock_id, |lock| lock.approve_gate(&req.actor, now)) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
