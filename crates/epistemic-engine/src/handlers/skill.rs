// epistemic-engine/src/handlers/skill.rs
// ============================================================================
// Module: Skill Handlers
// Description: Dispatches the `skill` domain's operations against the
// shared `SkillStore`.
// Dependencies: epistemic-skills::{skill, matching, distillation}
// ============================================================================

use std::collections::BTreeSet;

use epistemic_skills::MatchContext;
use epistemic_skills::NewSkill;
use epistemic_skills::PlaybookAction;
use epistemic_skills::ReasoningStep;
use epistemic_skills::RoleSequencePattern;
use epistemic_skills::SkillContent;
use epistemic_skills::distill_from_pattern;
use epistemic_skills::find_matching_skills;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::context::EngineContext;
use crate::error::DispatchError;
use crate::handlers::util::decode;
use crate::result::OperationResult;

const DOMAIN: &str = "skill";

#[derive(Debug, Deserialize)]
struct NewSkillFields {
    name: String,
    domain: String,
    #[serde(default)]
    applicable_roles: BTreeSet<String>,
    #[serde(default)]
    work_type: Option<String>,
    #[serde(default)]
    provenance: Option<String>,
    #[serde(default)]
    sequence_tag: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateTemplateRequest {
    #[serde(flatten)]
    fields: NewSkillFields,
    steps: Vec<ReasoningStep>,
}

#[derive(Debug, Deserialize)]
struct CreatePlaybookRequest {
    #[serde(flatten)]
    fields: NewSkillFields,
    trigger: String,
    actions: Vec<PlaybookAction>,
}

#[derive(Debug, Deserialize)]
struct CreateBundleRequest {
    #[serde(flatten)]
    fields: NewSkillFields,
    checks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ApplyRequest {
    id: String,
    succeeded: bool,
}

#[derive(Debug, Deserialize)]
struct DeprecateRequest {
    id: String,
    reason: String,
}

#[derive(Debug, Deserialize)]
struct DistillRequest {
    pattern: RoleSequencePatternRequest,
    min_occurrences: u64,
}

#[derive(Debug, Deserialize)]
struct RoleSequencePatternRequest {
    sequence_tag: String,
    sequence: Vec<String>,
    occurrences: u64,
    domain: String,
}

#[derive(Debug, Deserialize)]
struct MatchContextRequest {
    domain: String,
    role: String,
    #[serde(default)]
    work_type: Option<String>,
}

fn create(ctx: &mut EngineContext, fields: NewSkillFields, content: SkillContent) -> OperationResult {
    let new_skill = NewSkill {
        name: fields.name,
        domain: fields.domain,
        applicable_roles: fields.applicable_roles,
        work_type: fields.work_type,
        provenance: fields.provenance,
        sequence_tag: fields.sequence_tag,
        content,
    };
    match ctx.skills.create(new_skill, &ctx.services) {
        Ok(skill) => OperationResult::ok(json!({ "skill": skill })),
        Err(err) => OperationResult::err(err.code()),
    }
}

/// Dispatches one `skill.*` operation.
///
/// # Errors
///
/// Returns [`DispatchError::UnknownOperation`] if `name` is not one of this
/// domain's operations, or [`DispatchError::InvalidInput`] if `input` does
/// not decode into the operation's expected request shape.
pub fn dispatch(ctx: &mut EngineContext, name: &str, input: Value) -> Result<OperationResult, DispatchError> {
    match name {
        "createTemplate" => {
            let req: CreateTemplateRequest = decode(DOMAIN, name, input)?;
            Ok(create(ctx, req.fields, SkillContent::ReasoningTemplate { steps: req.steps }))
        }
        "createPlaybook" => {
            let req: CreatePlaybookRequest = decode(DOMAIN, name, input)?;
            Ok(create(ctx, req.fields, SkillContent::MacroPlaybook { trigger: req.trigger, actions: req.actions }))
        }
        "createBundle" => {
            let req: CreateBundleRequest = decode(DOMAIN, name, input)?;
            Ok(create(ctx, req.fields, SkillContent::TestBundle { checks: req.checks }))
        }
        "apply" => {
            let req: ApplyRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.skills.record_application(&req.id, req.succeeded, &ctx.services) {
                Ok(skill) => OperationResult::ok(json!({ "skill": skill })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "match" => {
            let req: MatchContextRequest = decode(DOMAIN, name, input)?;
            let context = MatchContext { domain: req.domain, role: req.role, work_type: req.work_type };
            let matches = find_matching_skills(&ctx.skills, &context);
            Ok(OperationResult::ok(json!({ "matches": matches })))
        }
        "distill" => {
            let req: DistillRequest = decode(DOMAIN, name, input)?;
            let pattern = RoleSequencePattern {
                sequence_tag: req.pattern.sequence_tag,
                sequence: req.pattern.sequence,
                occurrences: req.pattern.occurrences,
                domain: req.pattern.domain,
            };
            Ok(match distill_from_pattern(&mut ctx.skills, &pattern, req.min_occurrences, &ctx.services) {
                Ok(skill) => OperationResult::ok(json!({ "skill": skill })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        "deprecate" => {
            let req: DeprecateRequest = decode(DOMAIN, name, input)?;
            Ok(match ctx.skills.deprecate(&req.id, req.reason) {
                Ok(skill) => OperationResult::ok(json!({ "skill": skill })),
                Err(err) => OperationResult::err(err.code()),
            })
        }
        other => Err(DispatchError::UnknownOperation { domain: DOMAIN.to_string(), name: other.to_string() }),
    }
}
