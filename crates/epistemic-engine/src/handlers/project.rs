// epistemic-engine/src/handlers/project.rs
// ============================================================================
// Module: Project Handlers
// Description: Dispatches the `project` domain's operations against the
// shared `ProjectStore`.
// Dependencies: epistemic-projects::{project, node}
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "project";

#[derive(Debug, Deserialize)]
struct CreateRequest {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ProjectIdRequest {
    project_id: String,
}

#[derive(Debug, Deserialize)]
struct AddNodeRequest {
    project_id: String,
    #[serde(default)]
    prerequisites: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct CompleteRequest {
    project_id: String,
    node_id: String,
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct FailRequest {
    project_id: String,
    node_id: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct CheckpointRequest {
    project_id: String,
    node_id: String,
    #[serde(default)]
    snapshot: Value,
}

#[derive(Debug, Deserialize)]
struct RollbackRequest {
    project_id: String,
    checkpoint_id: String,
}

/// Dispatches one `project.*` operation.
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
            let project = ctx.projects.create(req.name, &ctx.services);
            Ok(OperationResult::ok(json!({ "project": project })))
        }
        "addNode" => {
            let req: AddNodeRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.projects.add_node(&req.project_id, req.prerequisites, &ctx.services) {
                Ok(node) => OperationResult::ok(json!({ "node": node })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "start" => {
            let req: ProjectIdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.projects.start(&req.project_id) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "ready" => {
            let req: ProjectIdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.projects.ready_nodes(&req.project_id) {
                Ok(nodes) => OperationResult::ok(json!({ "nodes": nodes })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "complete" => {
            let req: CompleteRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.projects.complete(&req.project_id, &req.node_id, req.result) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "fail" => {
            let req: FailRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.projects.fail(&req.project_id, &req.node_id, req.reason) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "pause" => {
            let req: ProjectIdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.projects.pause(&req.project_id) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "resume" => {
            let req: ProjectIdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.projects.resume(&req.project_id) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "checkpoint" => {
            let req: CheckpointRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.projects.checkpoint(&req.project_id, &req.node_id, req.snapshot, &ctx.services) {
                Ok(checkpoint) => OperationResult::ok(json!({ "checkpoint": checkpoint })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "rollback" => {
            let req: RollbackRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.projects.rollback(&req.project_id, &req.checkpoint_id) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
