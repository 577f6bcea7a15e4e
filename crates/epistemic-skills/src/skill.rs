// epistemic-skills/src/skill.rs
// ============================================================================
// Module: Skill Store
// Description: The three skill kinds, usage counters, the applied-usage
// maturity machine, and the bounded indexed store over them.
// Dependencies: epistemic-core, serde
// ============================================================================

//! ## Overview
//! A [`Skill`] is one of three kinds: a `reasoning_template` (an ordered
//! sequence of role/action/constraint steps), a `macro_playbook` (a trigger
//! plus a sequence of actions, some gated), or a `test_bundle` (a named
//! list of checks). Every application recorded against a skill through
//! [`SkillStore::record_application`] feeds the maturity machine, which
//! auto-promotes and can auto-deprecate a skill based on its running
//! success rate.

use std::collections::BTreeSet;

use epistemic_core::BoundedIndexedStore;
use epistemic_core::Indexed;
use epistemic_core::Instant;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;

use crate::error::SkillError;

/// Default ceiling for the skill store before FIFO eviction kicks in.
pub const DEFAULT_CEILING: usize = 20_000;

/// Minimum applications before a tested skill is eligible for promotion to
/// proven.
const PROVEN_MIN_APPLIED: u64 = 5;
/// Minimum success rate for promotion to proven.
const PROVEN_MIN_RATE: f64 = 0.6;
/// Minimum applications before a skill is eligible for auto-deprecation.
const DEPRECATION_MIN_APPLIED: u64 = 10;
/// Success rate below which a skill is auto-deprecated.
const DEPRECATION_MAX_RATE: f64 = 0.3;
/// Reason recorded when [`Maturity::Deprecated`] is set automatically.
pub const AUTO_DEPRECATION_REASON: &str = "auto_deprecated_low_success_rate";

/// The three kinds of skill this store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    /// Ordered steps with role/action/constraints.
    ReasoningTemplate,
    /// A trigger plus a sequence of actions, some gated.
    MacroPlaybook,
    /// A named list of checks.
    TestBundle,
}

impl SkillKind {
    /// Parses a lowercase snake_case kind name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "reasoning_template" => Some(Self::ReasoningTemplate),
            "macro_playbook" => Some(Self::MacroPlaybook),
            "test_bundle" => Some(Self::TestBundle),
            _ => None,
        }
    }

    /// The lowercase snake_case name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReasoningTemplate => "reasoning_template",
            Self::MacroPlaybook => "macro_playbook",
            Self::TestBundle => "test_bundle",
        }
    }
}

/// One step of a `reasoning_template`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningStep {
    /// The role performing this step.
    pub role: String,
    /// What the role does.
    pub action: String,
    /// Constraints the step must satisfy.
    pub constraints: Vec<String>,
}

/// One action of a `macro_playbook`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybookAction {
    /// What the action does.
    pub action: String,
    /// Whether this action requires an external gate before running.
    pub gated: bool,
}

/// Kind-specific skill content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillContent {
    /// `reasoning_template` content.
    ReasoningTemplate {
        /// Ordered steps.
        steps: Vec<ReasoningStep>,
    },
    /// `macro_playbook` content.
    MacroPlaybook {
        /// The condition that fires this playbook.
        trigger: String,
        /// Ordered actions.
        actions: Vec<PlaybookAction>,
    },
    /// `test_bundle` content.
    TestBundle {
        /// Named checks.
        checks: Vec<String>,
    },
}

impl SkillContent {
    /// The [`SkillKind`] this content belongs to.
    #[must_use]
    pub const fn kind(&self) -> SkillKind {
        match self {
            Self::ReasoningTemplate { .. } => SkillKind::ReasoningTemplate,
            Self::MacroPlaybook { .. } => SkillKind::MacroPlaybook,
            Self::TestBundle { .. } => SkillKind::TestBundle,
        }
    }
}

/// Maturity ladder for a skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Maturity {
    /// Newly created, never successfully applied.
    Candidate,
    /// Applied successfully at least once.
    Tested,
    /// Applied 5+ times with a success rate ≥ 0.6.
    Proven,
    /// Promoted by an explicit governance action, not by this store.
    Canonical,
    /// Auto- or governance-deprecated; excluded from matching.
    Deprecated,
}

impl Maturity {
    /// Matching bonus contributed by this maturity level.
    #[must_use]
    pub const fn match_bonus(self) -> i64 {
        match self {
            Self::Canonical => 3,
            Self::Proven => 2,
            Self::Tested => 1,
            Self::Candidate | Self::Deprecated => 0,
        }
    }

    /// The lowercase snake_case name of this maturity level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Candidate => "candidate",
            Self::Tested => "tested",
            Self::Proven => "proven",
            Self::Canonical => "canonical",
            Self::Deprecated => "deprecated",
        }
    }
}

/// Running application counters for a skill.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageCounters {
    /// Total times applied.
    pub applied: u64,
    /// Times the application succeeded.
    pub succeeded: u64,
    /// Times the application failed.
    pub failed: u64,
    /// When the skill was last applied.
    pub last_used: Option<Instant>,
}

impl UsageCounters {
    /// Success rate, `0.0` if never applied.
    #[must_use]
    pub fn success_rate(self) -> f64 {
        if self.applied == 0 {
            0.0
        } else {
            f64::from(u32::try_from(self.succeeded).unwrap_or(u32::MAX))
                / f64::from(u32::try_from(self.applied).unwrap_or(u32::MAX))
        }
    }
}

/// Fields needed to create a new skill.
#[derive(Debug, Clone)]
pub struct NewSkill {
    /// Human-readable name.
    pub name: String,
    /// Domain this skill applies to; `"*"` matches any domain.
    pub domain: String,
    /// Roles this skill applies to; containing `"*"` matches any role.
    pub applicable_roles: BTreeSet<String>,
    /// Work type this skill applies to; `None` matches any work type.
    pub work_type: Option<String>,
    /// Source pattern id, if distilled.
    pub provenance: Option<String>,
    /// Distillation dedup tag, if distilled from a role sequence.
    pub sequence_tag: Option<String>,
    /// Kind-specific content.
    pub content: SkillContent,
}

/// A stored skill: reasoning template, macro playbook, or test bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    /// Opaque id, prefixed `sk_`.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Domain this skill applies to; `"*"` matches any domain.
    pub domain: String,
    /// Roles this skill applies to; containing `"*"` matches any role.
    pub applicable_roles: BTreeSet<String>,
    /// Work type this skill applies to; `None` matches any work type.
    pub work_type: Option<String>,
    /// Current maturity level.
    pub maturity: Maturity,
    /// Source pattern id, if distilled.
    pub provenance: Option<String>,
    /// Distillation dedup tag, if distilled from a role sequence.
    pub sequence_tag: Option<String>,
    /// Reason recorded when deactivated (deprecated).
    pub deactivation_reason: Option<String>,
    /// Running application counters.
    pub usage: UsageCounters,
    /// Kind-specific content.
    pub content: SkillContent,
    /// When this skill was created.
    pub created_at: Instant,
}

impl Skill {
    /// This skill's kind, derived from its content.
    #[must_use]
    pub const fn kind(&self) -> SkillKind {
        self.content.kind()
    }
}

impl Indexed for Skill {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

fn apply_promotion_rules(skill: &mut Skill) {
    let rate = skill.usage.success_rate();
    match skill.maturity {
        Maturity::Candidate if skill.usage.succeeded >= 1 => skill.maturity = Maturity::Tested,
        Maturity::Tested if skill.usage.applied >= PROVEN_MIN_APPLIED && rate >= PROVEN_MIN_RATE => {
            skill.maturity = Maturity::Proven;
        }
        _ => {}
    }
    if skill.maturity != Maturity::Deprecated
        && skill.usage.applied >= DEPRECATION_MIN_APPLIED
        && rate < DEPRECATION_MAX_RATE
    {
        skill.maturity = Maturity::Deprecated;
        skill.deactivation_reason = Some(AUTO_DEPRECATION_REASON.to_string());
    }
}

fn role_keys(roles: &BTreeSet<String>) -> Vec<String> {
    roles.iter().cloned().collect()
}

/// Bounded, indexed store of [`Skill`]s with the applied-usage maturity
/// machine wired into [`Self::record_application`].
pub struct SkillStore {
    store: BoundedIndexedStore<Skill>,
}

impl SkillStore {
    /// Creates an empty skill store with the given ceiling (0 = unbounded).
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            store: BoundedIndexedStore::new(ceiling)
                .with_index("kind", |s: &Skill| vec![s.kind().as_str().to_string()])
                .with_index("domain", |s: &Skill| vec![s.domain.clone()])
                .with_index("role", role_keys_for_index)
                .with_index("work_type", |s: &Skill| s.work_type.clone().into_iter().collect())
                .with_index("sequence_tag", |s: &Skill| s.sequence_tag.clone().into_iter().collect()),
        }
    }

    /// Creates a new skill, starting at [`Maturity::Candidate`].
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::EmptySteps`] if a reasoning template is given
    /// no steps.
    pub fn create(&mut self, new: NewSkill, services: &Services) -> Result<Skill, SkillError> {
        if let SkillContent::ReasoningTemplate { ref steps } = new.content {
            if steps.is_empty() {
                return Err(SkillError::EmptySteps);
            }
        }
        let skill = Skill {
            id: services.new_id("sk"),
            name: new.name,
            domain: new.domain,
            applicable_roles: new.applicable_roles,
            work_type: new.work_type,
            maturity: Maturity::Candidate,
            provenance: new.provenance,
            sequence_tag: new.sequence_tag,
            deactivation_reason: None,
            usage: UsageCounters::default(),
            content: new.content,
            created_at: services.now(),
        };
        self.store.put(skill.clone());
        Ok(skill)
    }

    /// Looks up a skill by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Skill> {
        self.store.get(id)
    }

    /// Deprecates a skill outside the automatic maturity machine, e.g. by
    /// governance action. Excludes it from [`crate::matching::find_matching_skills`]
    /// from this point on.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::NotFound`] if no such skill exists.
    pub fn deprecate(&mut self, id: &str, reason: impl Into<String>) -> Result<Skill, SkillError> {
        let mut skill = self.store.get(id).cloned().ok_or_else(|| SkillError::NotFound { id: id.to_string() })?;
        skill.maturity = Maturity::Deprecated;
        skill.deactivation_reason = Some(reason.into());
        self.store.put(skill.clone());
        Ok(skill)
    }

    /// Records one application of a skill, updating usage counters and
    /// applying the maturity machine.
    ///
    /// # Errors
    ///
    /// Returns [`SkillError::NotFound`] if no such skill exists.
    pub fn record_application(
        &mut self,
        id: &str,
        succeeded: bool,
        services: &Services,
    ) -> Result<Skill, SkillError> {
        let mut candidate = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| SkillError::NotFound { id: id.to_string() })?;
        candidate.usage.applied += 1;
        if succeeded {
            candidate.usage.succeeded += 1;
        } else {
            candidate.usage.failed += 1;
        }
        candidate.usage.last_used = Some(services.now());
        apply_promotion_rules(&mut candidate);
        self.store.put(candidate.clone());
        Ok(candidate)
    }

    /// Returns every skill carrying `sequence_tag`, for distillation dedup.
    #[must_use]
    pub fn by_sequence_tag(&self, sequence_tag: &str) -> Vec<&Skill> {
        self.store
            .by_index("sequence_tag", sequence_tag)
            .iter()
            .filter_map(|id| self.store.get(id))
            .collect()
    }

    /// Returns every skill of the given kind.
    #[must_use]
    pub fn by_kind(&self, kind: SkillKind) -> Vec<&Skill> {
        self.store
            .by_index("kind", kind.as_str())
            .iter()
            .filter_map(|id| self.store.get(id))
            .collect()
    }

    /// Lists every skill currently stored.
    pub fn list(&self) -> impl Iterator<Item = &Skill> {
        self.store.list()
    }

    /// Number of skills currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if no skills are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

fn role_keys_for_index(skill: &Skill) -> Vec<String> {
    role_keys(&skill.applicable_roles)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
