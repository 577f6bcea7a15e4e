// epistemic-engine/src/registry.rs
// ============================================================================
// Module: Operation Registry
// Description: The top-level (domain, name) dispatch table every external
// caller goes through, plus a static descriptor table for introspection.
// Dependencies: crate::handlers, crate::context, crate::result
// ============================================================================

//! ## Overview
//! [`dispatch`] is the engine's single entry point: given a domain, an
//! operation name, and a JSON payload, it routes to the matching
//! `handlers::<domain>::dispatch` function and folds any registry-level
//! failure into the same [`OperationResult`] shape a handler would return,
//! so callers never need to distinguish "unknown operation" from "domain
//! rejected the input" at the call site.

use serde_json::Value;

use crate::context::EngineContext;
use crate::handlers;
use crate::result::OperationResult;

/// Describes one registered `(domain, name)` operation, for introspection.
#[derive(Debug, Clone, Copy)]
pub struct OperationDescriptor {
    /// The domain this operation belongs to.
    pub domain: &'static str,
    /// The operation's name within its domain.
    pub name: &'static str,
}

/// Every operation this engine exposes, mirroring the external wire
/// interface one row per `(domain, name)` pair.
pub const OPERATIONS: &[OperationDescriptor] = &[
    OperationDescriptor { domain: "ku", name: "create" },
    OperationDescriptor { domain: "ku", name: "get" },
    OperationDescriptor { domain: "ku", name: "list" },
    OperationDescriptor { domain: "ku", name: "addEdge" },
    OperationDescriptor { domain: "evidence", name: "attach" },
    OperationDescriptor { domain: "evidence", name: "forKU" },
    OperationDescriptor { domain: "evidence", name: "status" },
    OperationDescriptor { domain: "evidence", name: "deprecate" },
    OperationDescriptor { domain: "evidence", name: "retract" },
    OperationDescriptor { domain: "verification", name: "createPipeline" },
    OperationDescriptor { domain: "verification", name: "listPipelines" },
    OperationDescriptor { domain: "verification", name: "runPipeline" },
    OperationDescriptor { domain: "verification", name: "verifyKU" },
    OperationDescriptor { domain: "verification", name: "history" },
    OperationDescriptor { domain: "outcome", name: "record" },
    OperationDescriptor { domain: "outcome", name: "forWorkItem" },
    OperationDescriptor { domain: "outcome", name: "forActor" },
    OperationDescriptor { domain: "outcome", name: "stats" },
    OperationDescriptor { domain: "outcome", name: "runLearning" },
    OperationDescriptor { domain: "outcome", name: "recommendations" },
    OperationDescriptor { domain: "scheduler", name: "enqueue" },
    OperationDescriptor { domain: "scheduler", name: "pop" },
    OperationDescriptor { domain: "scheduler", name: "complete" },
    OperationDescriptor { domain: "scheduler", name: "fail" },
    OperationDescriptor { domain: "scheduler", name: "status" },
    OperationDescriptor { domain: "scheduler", name: "rescore" },
    OperationDescriptor { domain: "skill", name: "createTemplate" },
    OperationDescriptor { domain: "skill", name: "createPlaybook" },
    OperationDescriptor { domain: "skill", name: "createBundle" },
    OperationDescriptor { domain: "skill", name: "apply" },
    OperationDescriptor { domain: "skill", name: "match" },
    OperationDescriptor { domain: "skill", name: "distill" },
    OperationDescriptor { domain: "skill", name: "deprecate" },
    OperationDescriptor { domain: "project", name: "create" },
    OperationDescriptor { domain: "project", name: "addNode" },
    OperationDescriptor { domain: "project", name: "start" },
    OperationDescriptor { domain: "project", name: "ready" },
    OperationDescriptor { domain: "project", name: "complete" },
    OperationDescriptor { domain: "project", name: "fail" },
    OperationDescriptor { domain: "project", name: "pause" },
    OperationDescriptor { domain: "project", name: "resume" },
    OperationDescriptor { domain: "project", name: "checkpoint" },
    OperationDescriptor { domain: "project", name: "rollback" },
    OperationDescriptor { domain: "truth", name: "birth" },
    OperationDescriptor { domain: "truth", name: "transition" },
    OperationDescriptor { domain: "truth", name: "detectStagnation" },
    OperationDescriptor { domain: "protocol", name: "create" },
    OperationDescriptor { domain: "protocol", name: "join" },
    OperationDescriptor { domain: "protocol", name: "declareIntent" },
    OperationDescriptor { domain: "protocol", name: "submitPlan" },
    OperationDescriptor { domain: "protocol", name: "checkCompatibility" },
    OperationDescriptor { domain: "protocol", name: "startNegotiation" },
    OperationDescriptor { domain: "protocol", name: "submitPosition" },
    OperationDescriptor { domain: "protocol", name: "resolve" },
    OperationDescriptor { domain: "protocol", name: "veto" },
    OperationDescriptor { domain: "protocol", name: "pause" },
    OperationDescriptor { domain: "protocol", name: "resume" },
    OperationDescriptor { domain: "interlock", name: "create" },
    OperationDescriptor { domain: "interlock", name: "acquire" },
    OperationDescriptor { domain: "interlock", name: "release" },
    OperationDescriptor { domain: "interlock", name: "approveGate" },
    OperationDescriptor { domain: "commitment", name: "register" },
    OperationDescriptor { domain: "commitment", name: "transition" },
    OperationDescriptor { domain: "commitment", name: "detectBreaches" },
    OperationDescriptor { domain: "constitution", name: "addRule" },
    OperationDescriptor { domain: "constitution", name: "amendRule" },
    OperationDescriptor { domain: "constitution", name: "deactivateRule" },
    OperationDescriptor { domain: "constitution", name: "checkRules" },
    OperationDescriptor { domain: "constitution", name: "listRules" },
    OperationDescriptor { domain: "constitution", name: "history" },
    OperationDescriptor { domain: "sandbox", name: "createAgent" },
    OperationDescriptor { domain: "sandbox", name: "createApp" },
    OperationDescriptor { domain: "sandbox", name: "consumeBudget" },
    OperationDescriptor { domain: "sandbox", name: "checkPermission" },
    OperationDescriptor { domain: "sandbox", name: "writeMemory" },
    OperationDescriptor { domain: "sandbox", name: "readMemory" },
    OperationDescriptor { domain: "sandbox", name: "kill" },
    OperationDescriptor { domain: "resources", name: "createBudget" },
    OperationDescriptor { domain: "resources", name: "reserve" },
    OperationDescriptor { domain: "resources", name: "consume" },
    OperationDescriptor { domain: "resources", name: "release" },
    OperationDescriptor { domain: "resources", name: "alerts" },
    OperationDescriptor { domain: "resources", name: "triage" },
];

/// Dispatches `(domain, name)` against `ctx`, always returning a wire-ready
/// [`OperationResult`] — unknown domains/operations and input mismatches
/// fold into `err("unknown_domain" | "unknown_operation" | "invalid_input")`
/// rather than propagating as a distinct error type to the caller.
#[must_use]
pub fn dispatch(ctx: &mut EngineContext, domain: &str, name: &str, input: Value) -> OperationResult {
    let outcome = match domain {
        "ku" => handlers::knowledge::dispatch(ctx, name, input),
        "evidence" => handlers::evidence::dispatch(ctx, name, input),
        "verification" => handlers::verification::dispatch(ctx, name, input),
        "outcome" => handlers::outcome::dispatch(ctx, name, input),
        "scheduler" => handlers::scheduler::dispatch(ctx, name, input),
        "skill" => handlers::skill::dispatch(ctx, name, input),
        "project" => handlers::project::dispatch(ctx, name, input),
        "truth" => handlers::truth::dispatch(ctx, name, input),
        "protocol" => handlers::protocol::dispatch(ctx, name, input),
        "interlock" => handlers::interlock::dispatch(ctx, name, input),
        "commitment" => handlers::commitment::dispatch(ctx, name, input),
        "constitution" => handlers::constitution::dispatch(ctx, name, input),
        "sandbox" => handlers::sandbox::dispatch(ctx, name, input),
        "resources" => handlers::resources::dispatch(ctx, name, input),
        other => Err(crate::error::DispatchError::UnknownDomain { domain: other.to_string() }),
    };
    match outcome {
        Ok(result) => result,
        Err(err) => OperationResult::err(err.code()),
    }
}
