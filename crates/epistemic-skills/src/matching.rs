// epistemic-skills/src/matching.rs
// ============================================================================
// Module: Skill Matching
// Description: Scores non-deprecated skills against a usage context and
// ranks the candidates.
// Dependencies: epistemic-skills::skill
// ============================================================================

//! ## Overview
//! [`find_matching_skills`] scores every non-deprecated skill against a
//! [`MatchContext`]: a work-type match is worth the most, domain and role
//! matches add smaller fixed bonuses, and a skill's maturity contributes a
//! bonus of its own so a proven skill edges out an otherwise-identical
//! candidate. Only skills scoring above 1 are returned, highest first.

use serde::Deserialize;
use serde::Serialize;

use crate::skill::Maturity;
use crate::skill::Skill;
use crate::skill::SkillStore;

const WORK_TYPE_MATCH_BONUS: i64 = 3;
const WORK_TYPE_UNSET_BONUS: i64 = 1;
const DOMAIN_MATCH_BONUS: i64 = 2;
const ROLE_MATCH_BONUS: i64 = 1;
const MIN_SCORE: i64 = 1;
const WILDCARD: &str = "*";

/// The situation a caller wants a skill for.
#[derive(Debug, Clone)]
pub struct MatchContext {
    /// The active domain.
    pub domain: String,
    /// The active role.
    pub role: String,
    /// The active work type, if any.
    pub work_type: Option<String>,
}

/// One scored match returned by [`find_matching_skills`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMatch {
    /// The matched skill's id.
    pub skill_id: String,
    /// The computed match score.
    pub score: i64,
    /// The skill's current success rate, carried for the caller's ranking.
    pub success_rate: f64,
}

fn score_skill(skill: &Skill, context: &MatchContext) -> i64 {
    let mut score = 0;

    score += match &skill.work_type {
        Some(work_type) if context.work_type.as_deref() == Some(work_type.as_str()) => WORK_TYPE_MATCH_BONUS,
        Some(_) => 0,
        None => WORK_TYPE_UNSET_BONUS,
    };

    if skill.domain == WILDCARD || skill.domain == context.domain {
        score += DOMAIN_MATCH_BONUS;
    }

    if skill.applicable_roles.contains(WILDCARD) || skill.applicable_roles.contains(&context.role) {
        score += ROLE_MATCH_BONUS;
    }

    score += skill.maturity.match_bonus();
    score
}

/// Scores every non-deprecated skill in `store` against `context` and
/// returns those scoring above 1, highest first.
#[must_use]
pub fn find_matching_skills(store: &SkillStore, context: &MatchContext) -> Vec<SkillMatch> {
    let mut matches: Vec<SkillMatch> = store
        .list()
        .filter(|skill| skill.maturity != Maturity::Deprecated)
        .map(|skill| SkillMatch {
            skill_id: skill.id.clone(),
            score: score_skill(skill, context),
            success_rate: skill.usage.success_rate(),
        })
        .filter(|m| m.score > MIN_SCORE)
        .collect();
    matches.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.skill_id.cmp(&b.skill_id)));
    matches
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use epistemic_core::Instant;
    use epistemic_core::ManualClock;
    use epistemic_core::Services;

    use super::*;
    use crate::skill::NewSkill;
    use crate::skill::ReasoningStep;
    use crate::skill::SkillContent;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    fn skill(domain: &str, role: &str, work_type: Option<&str>) -> NewSkill {
        NewSkill {
            name: "pattern".to_string(),
            domain: domain.to_string(),
            applicable_roles: BTreeSet::from([role.to_string()]),
            work_type: work_type.map(str::to_string),
            provenance: None,
            sequence_tag: None,
            content: SkillContent::ReasoningTemplate {
                steps: vec![ReasoningStep {
                    role: role.to_string(),
                    action: "act".to_string(),
                    constraints: vec![],
                }],
            },
        }
    }

    #[test]
    fn exact_work_type_match_outranks_generic_wildcard() {
        let services = services();
        let mut store = SkillStore::new(0);
        let exact = store.create(skill("support", "triager", Some("incident")), &services).unwrap();
        let generic = store.create(skill("*", "*", None), &services).unwrap();

        let context = MatchContext {
            domain: "support".to_string(),
            role: "triager".to_string(),
            work_type: Some("incident".to_string()),
        };
        let matches = find_matching_skills(&store, &context);
        assert_eq!(matches[0].skill_id, exact.id);
        assert!(matches.iter().any(|m| m.skill_id == generic.id));
    }

    #[test]
    fn deprecated_skills_are_excluded() {
        let services = services();
        let mut store = SkillStore::new(0);
        let created = store.create(skill("support", "triager", Some("incident")), &services).unwrap();
        store.record_application(&created.id, true, &services).unwrap();
        for _ in 0..9 {
            store.record_application(&created.id, false, &services).unwrap();
        }
        let context = MatchContext {
            domain: "support".to_string(),
            role: "triager".to_string(),
            work_type: Some("incident".to_string()),
        };
        assert!(find_matching_skills(&store, &context).is_empty());
    }

    #[test]
    fn score_must_exceed_one_to_be_returned() {
        let services = services();
        let mut store = SkillStore::new(0);
        store.create(skill("other", "other_role", Some("other_type")), &services).unwrap();
        let context = MatchContext {
            domain: "support".to_string(),
            role: "triager".to_string(),
            work_type: Some("incident".to_string()),
        };
        assert!(find_matching_skills(&store, &context).is_empty());
    }
}
