// epistemic-engine/src/handlers/constitution.rs
// ============================================================================
// Module: Constitution Handlers
// Description: Dispatches the `constitution` domain's operations against
// the shared `RuleEngine`.
// Dependencies: epistemic-constitution::engine
// ============================================================================

use std::collections::BTreeSet;

use epistemic_constitution::ActionDescriptor;
use epistemic_constitution::Tier;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "constitution";

#[derive(Debug, Deserialize)]
struct AddRuleRequest {
    tier: Tier,
    category: String,
    description: String,
    #[serde(default)]
    forbidden_tags: BTreeSet<String>,
}

#[derive(Debug, Deserialize)]
struct AmendRuleRequest {
    id: String,
    new_description: String,
    #[serde(default)]
    new_forbidden_tags: BTreeSet<String>,
    votes_for: u32,
    votes_against: u32,
}

#[derive(Debug, Deserialize)]
struct IdRequest {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CheckRulesRequest {
    action: ActionDescriptor,
}

#[derive(Debug, Deserialize)]
struct ListRulesRequest {
    #[serde(default)]
    tier: Option<Tier>,
}

/// Dispatches one `constitution.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "addRule" => {
            let req: AddRuleRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.rules.add_rule(req.tier, req.category, req.description, req.forbidden_tags, &ctx.services) {
                Ok(rule) => OperationResult::ok(json!({ "rule": rule })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "amendRule" => {
            let req: AmendRuleRequest = decode(DOMAIN, name, input)?;
            let config = ctx.config.rule_engine.clone();
            Ok(
                match ctx.rules.amend_rule(&req.id, req.new_description, req.new_forbidden_tags, req.votes_for, req.votes_against, &config) {
                    Ok(outcome) => OperationResult::ok(json!({ "outcome": outcome })),
                    Err(err) => OperationResult::err(err.code()),
                },
            )
        }
        "deactivateRule" => {
            let req: IdRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.rules.deactivate_rule(&req.id) {
                Ok(()) => OperationResult::ok(Value::Null),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "checkRules" => {
            let req: CheckRulesRequest = decode(DOMAIN, name, input)?;
            let result = ctx.rules.check_rules(&req.action);
            Ok(OperationResult::ok(json!({ "result": result })))
        }
        "listRules" | "history" => {
            let req: ListRulesRequest = decode(DOMAIN, name, input)?;
            let rules = match req.tier {
                Some(tier) => ctx.rules.by_tier(tier),
                None => {
                    let mut all = ctx.rules.by_tier(Tier::Immutable);
                    all.extend(ctx.rules.by_tier(Tier::Constitutional));
                    all.extend(ctx.rules.by_tier(Tier::Policy));
                    all
                }
            };
            Ok(OperationResult::ok(json!({ "rules": rules })))
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
