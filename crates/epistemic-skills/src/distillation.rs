// epistemic-skills/src/distillation.rs
// ============================================================================
// Module: Skill Distillation
// Description: Turns a recurring role-sequence pattern into a reasoning
// template skill.
// Dependencies: epistemic-core, epistemic-skills::skill
// ============================================================================

//! ## Overview
//! When the same sequence of roles recurs often enough across completed
//! work, [`distill_from_pattern`] mints a `reasoning_template` whose steps
//! mirror that sequence. Each pattern carries a `sequence_tag`; if a skill
//! already carries that tag the pattern is skipped rather than duplicated.

use std::collections::BTreeSet;

use epistemic_core::Services;

use crate::error::SkillError;
use crate::skill::Maturity;
use crate::skill::NewSkill;
use crate::skill::ReasoningStep;
use crate::skill::Skill;
use crate::skill::SkillContent;
use crate::skill::SkillStore;

/// A recurring sequence of roles observed across completed work.
#[derive(Debug, Clone)]
pub struct RoleSequencePattern {
    /// Dedup tag identifying this exact sequence.
    pub sequence_tag: String,
    /// The roles in order.
    pub sequence: Vec<String>,
    /// How many times this sequence has recurred.
    pub occurrences: u64,
    /// The domain the pattern was observed in.
    pub domain: String,
}

/// Distills `pattern` into a new `reasoning_template` skill if it has
/// recurred at least `min_occurrences` times and no existing skill already
/// carries its `sequence_tag`. Returns `None` (not an error) when skipped.
///
/// # Errors
///
/// Returns [`SkillError::EmptySteps`] if `pattern.sequence` is empty.
pub fn distill_from_pattern(
    store: &mut SkillStore,
    pattern: &RoleSequencePattern,
    min_occurrences: u64,
    services: &Services,
) -> Result<Option<Skill>, SkillError> {
    if pattern.occurrences < min_occurrences {
        return Ok(None);
    }
    if !store.by_sequence_tag(&pattern.sequence_tag).is_empty() {
        return Ok(None);
    }

    let steps: Vec<ReasoningStep> = pattern
        .sequence
        .iter()
        .map(|role| ReasoningStep {
            role: role.clone(),
            action: format!("perform the {role} step"),
            constraints: vec![],
        })
        .collect();

    let roles: BTreeSet<String> = pattern.sequence.iter().cloned().collect();
    let skill = store.create(
        NewSkill {
            name: format!("distilled sequence: {}", pattern.sequence_tag),
            domain: pattern.domain.clone(),
            applicable_roles: roles,
            work_type: None,
            provenance: Some(pattern.sequence_tag.clone()),
            sequence_tag: Some(pattern.sequence_tag.clone()),
            content: SkillContent::ReasoningTemplate { steps },
        },
        services,
    )?;
    debug_assert_eq!(skill.maturity, Maturity::Candidate);
    Ok(Some(skill))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use epistemic_core::Instant;
    use epistemic_core::ManualClock;

    use super::*;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    fn pattern(occurrences: u64) -> RoleSequencePattern {
        RoleSequencePattern {
            sequence_tag: "triage-then-escalate".to_string(),
            sequence: vec!["triager".to_string(), "escalator".to_string()],
            occurrences,
            domain: "support".to_string(),
        }
    }

    #[test]
    fn below_threshold_is_skipped() {
        let services = services();
        let mut store = SkillStore::new(0);
        let result = distill_from_pattern(&mut store, &pattern(2), 5, &services).unwrap();
        assert!(result.is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn recurring_pattern_mints_a_candidate_template() {
        let services = services();
        let mut store = SkillStore::new(0);
        let result = distill_from_pattern(&mut store, &pattern(5), 5, &services).unwrap();
        let skill = result.expect("distilled");
        assert_eq!(skill.maturity, Maturity::Candidate);
        match skill.content {
            SkillContent::ReasoningTemplate { ref steps } => assert_eq!(steps.len(), 2),
            _ => panic!("expected reasoning template"),
        }
    }

    #[test]
    fn existing_sequence_tag_prevents_duplicate_distillation() {
        let services = services();
        let mut store = SkillStore::new(0);
        distill_from_pattern(&mut store, &pattern(5), 5, &services).unwrap();
        let second = distill_from_pattern(&mut store, &pattern(5), 5, &services).unwrap();
        assert!(second.is_none());
        assert_eq!(store.len(), 1);
    }
}
