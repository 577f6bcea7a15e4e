// epistemic-skills/src/lib.rs
// ============================================================================
// Crate: epistemic-skills
// Description: The skill store, its applied-usage maturity machine, context
// matching, and distillation from recurring role sequences.
// ============================================================================

//! Reasoning templates, macro playbooks, and test bundles live in one
//! bounded, multiply-indexed store. Every recorded application runs through
//! the maturity machine in [`skill`]; [`matching::find_matching_skills`]
//! ranks candidates for a usage context; [`distillation::distill_from_pattern`]
//! mints new reasoning templates from recurring role sequences.

pub mod distillation;
pub mod error;
pub mod matching;
pub mod skill;

pub use distillation::distill_from_pattern;
pub use distillation::RoleSequencePattern;
pub use error::SkillError;
pub use matching::find_matching_skills;
pub use matching::MatchContext;
pub use matching::SkillMatch;
pub use skill::Maturity;
pub use skill::NewSkill;
pub use skill::PlaybookAction;
pub use skill::ReasoningStep;
pub use skill::Skill;
pub use skill::SkillContent;
pub use skill::SkillKind;
pub use skill::SkillStore;
pub use skill::UsageCounters;
pub use skill::AUTO_DEPRECATION_REASON;
