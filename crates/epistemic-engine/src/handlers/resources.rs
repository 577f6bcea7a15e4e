// epistemic-engine/src/handlers/resources.rs
// ============================================================================
// Module: Resource Handlers
// Description: Dispatches the `resources` domain's operations against the
// shared `ResourcePool`, plus QoS-ordered sandbox triage under pressure.
// Dependencies: epistemic-sandbox::resources, epistemic-sandbox::sandbox
// ============================================================================

use std::collections::BTreeMap;

use epistemic_sandbox::ResourcePool;
use epistemic_sandbox::ResourceType;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "resources";

#[derive(Debug, Deserialize)]
struct CreateBudgetRequest {
    totals: BTreeMap<ResourceType, f64>,
}

#[derive(Debug, Deserialize)]
struct ReserveRequest {
    resource_type: ResourceType,
    amount: f64,
}

#[derive(Debug, Deserialize)]
struct ReservationRequest {
    reservation_id: String,
    #[serde(default)]
    now_millis: i64,
}

#[derive(Debug, Deserialize)]
struct AlertsRequest {
    now_millis: i64,
}

#[derive(Debug, Deserialize)]
struct TriageRequest {
    available: usize,
    now_millis: i64,
}

/// Dispatches one `resources.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "createBudget" => {
            let req: CreateBudgetRequest = decode(DOMAIN, name, input)?;
            ctx.resources = ResourcePool::new(&req.totals);
            Ok(OperationResult::ok(Value::Null))
        }
        "reserve" => {
            let req: ReserveRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.resources.reserve(req.resource_type, req.amount, &ctx.services) {
                Ok(reservation_id) => OperationResult::ok(json!({ "reservationId": reservation_id })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "consume" => {
            let req: ReservationRequest = decode(DOMAIN, name, input)?;
            let now = epistemic_core::Instant::from_millis(req.now_millis);
            Ok(match ctx.resources.consume(&req.reservation_id, now) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "release" => {
            let req: ReservationRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.resources.release(&req.reservation_id) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "alerts" => {
            let req: AlertsRequest = decode(DOMAIN, name, input)?;
            let now = epistemic_core::Instant::from_millis(req.now_millis);
            let alerts = ctx.resources.alerts(now, &ctx.config.sandbox);
            Ok(OperationResult::ok(json!({ "alerts": alerts })))
        }
        "triage" => {
            let req: TriageRequest = decode(DOMAIN, name, input)?;
            let now = epistemic_core::Instant::from_millis(req.now_millis);
            let suspended = ctx.sandboxes.perform_triage(req.available, now);
            Ok(OperationResult::ok(json!({ "suspended": suspended })))
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
