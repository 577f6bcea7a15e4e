// epistemic-engine/src/handlers/sandbox.rs
// ============================================================================
// Module: Sandbox Handlers
// Description: Dispatches the `sandbox` domain's operations against the
// shared `SandboxStore`.
// Dependencies: epistemic-sandbox::sandbox
// ============================================================================

use std::collections::BTreeSet;

use epistemic_sandbox::QosPriority;
use epistemic_sandbox::Sandbox;
use epistemic_sandbox::SandboxKind;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "sandbox";

#[derive(Debug, Deserialize)]
struct CreateSandboxRequest {
    qos: QosPriority,
    total_budget: f64,
    max_memory_items: usize,
    max_execution_time_ms: u64,
    #[serde(default)]
    permissions: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct SandboxIdRequest {
    sandbox_id: String,
}

#[derive(Debug, Deserialize)]
struct ConsumeBudgetRequest {
    sandbox_id: String,
    cost: f64,
    now_millis: i64,
}

#[derive(Debug, Deserialize)]
struct CheckPermissionRequest {
    sandbox_id: String,
    permission: String,
    now_millis: i64,
}

#[derive(Debug, Deserialize)]
struct WriteMemoryRequest {
    sandbox_id: String,
    key: String,
    value: Value,
}

#[derive(Debug, Deserialize)]
struct ReadMemoryRequest {
    sandbox_id: String,
    key: String,
}

#[derive(Debug, Deserialize)]
struct KillRequest {
    sandbox_id: String,
    reason: String,
    now_millis: i64,
}

fn summary(sandbox: &Sandbox) -> Value {
    json!({
        "id": sandbox.id(),
        "kind": sandbox.kind(),
        "status": sandbox.status(),
        "qos": sandbox.qos(),
        "budget": sandbox.budget(),
        "memoryLen": sandbox.memory_len(),
    })
}

fn create(ctx: &mut EngineContext, kind: SandboxKind, req: CreateSandboxRequest) -> OperationResult {
    let id = ctx
        .sandboxes
        .create(kind, req.qos, req.total_budget, req.max_memory_items, req.max_execution_time_ms, req.permissions, &ctx.services);
    OperationResult::ok(json!({ "sandboxId": id }))
}

/// Dispatches one `sandbox.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "createAgent" => {
            let req: CreateSandboxRequest = decode(DOMAIN, name, input)?;
            Ok(create(ctx, SandboxKind::Agent, req))
        }
        "createApp" => {
            let req: CreateSandboxRequest = decode(DOMAIN, name, input)?;
            Ok(create(ctx, SandboxKind::App, req))
        }
        "consumeBudget" => {
            let req: ConsumeBudgetRequest = decode(DOMAIN, name, input)?;
            let now = epistemic_core::Instant::from_millis(req.now_millis);
            Ok(match ctx.sandboxes.with_mut(&req.sandbox_id, |sandbox| sandbox.consume_budget(req.cost, now)) {
                Ok(Ok(())) => OperationResult::ok(Value::Null),
                Ok(Err(err)) => OperationResult::err(err.code()),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "checkPermission" => {
            let req: CheckPermissionRequest = decode(DOMAIN, name, input)?;
            let now = epistemic_core::Instant::from_millis(req.now_millis);
            Ok(match ctx.sandboxes.with_mut(&req.sandbox_id, |sandbox| sandbox.check_permission(&req.permission, now)) {
                Ok(granted) => OperationResult::ok(json!({ "granted": granted })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "writeMemory" => {
            let req: WriteMemoryRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.sandboxes.with_mut(&req.sandbox_id, |sandbox| sandbox.write_memory(req.key, req.value)) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "readMemory" => {
            let req: ReadMemoryRequest = decode(DOMAIN, name, input)?;
            match ctx.sandboxes.get(&req.sandbox_id) {
                Some(sandbox) => Ok(OperationResult::ok(json!({ "value": sandbox.read_memory(&req.key) }))),
                None => Ok(OperationResult::err("not_found")),
            }
        }
        "kill" => {
            let req: KillRequest = decode(DOMAIN, name, input)?;
            let now = epistemic_core::Instant::from_millis(req.now_millis);
            Ok(match ctx.sandboxes.with_mut(&req.sandbox_id, |sandbox| sandbox.kill(&req.reason, now)) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "status" => {
            let req: SandboxIdRequest = decode(DOMAIN, name, input)?;
            match ctx.sandboxes.get(&req.sandbox_id) {
                Some(sandbox) => Ok(OperationResult::ok(summary(sandbox))),
                None => Ok(OperationResult::err("not_found")),
            }
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
