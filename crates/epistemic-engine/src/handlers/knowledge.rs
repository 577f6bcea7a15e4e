// epistemic-engine/src/handlers/knowledge.rs
// ============================================================================
// Module: Knowledge Unit Handlers
// Description: Dispatches the `ku` domain's operations against the shared
// `KnowledgeStore`.
// Dependencies: epistemic-core::knowledge
// ============================================================================

use std::collections::BTreeSet;

use epistemic_core::EdgeType;
use epistemic_core::NewKnowledgeUnit;
use epistemic_core::Tier;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "ku";

#[derive(Debug, Deserialize)]
struct CreateRequest {
    title: String,
    body: String,
    tier: Tier,
    #[serde(default)]
    tags: BTreeSet<String>,
    #[serde(default)]
    resonance: f64,
    #[serde(default)]
    coherence: f64,
    #[serde(default)]
    stability: f64,
}

#[derive(Debug, Deserialize)]
struct IdRequest {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AddEdgeRequest {
    src: String,
    dst: String,
    edge_type: EdgeType,
}

/// Dispatches one `ku.*` operation.
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
            let new_unit = NewKnowledgeUnit {
                title: req.title,
                body: req.body,
                tier: req.tier,
                tags: req.tags,
                resonance: req.resonance,
                coherence: req.coherence,
                stability: req.stability,
            };
            Ok(match ctx.knowledge.create(new_unit, &ctx.services) {
                Ok(unit) => {
                    ctx.truth.birth(unit.id.clone(), &ctx.services);
                    OperationResult::ok(json!({ "unit": unit }))
                }
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "get" => {
            let req: IdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.knowledge.get(&req.id) {
                Ok(unit) => OperationResult::ok(json!({ "unit": unit })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "list" => {
            let units: Vec<_> = ctx.knowledge.list().collect();
            Ok(OperationResult::ok(json!({ "units": units })))
        }
        "addEdge" => {
            let req: AddEdgeRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.knowledge.add_edge(&req.src, &req.dst, req.edge_type, &ctx.services) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
