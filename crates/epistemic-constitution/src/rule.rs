// epistemic-constitution/src/rule.rs
// ============================================================================
// Module: Constitutional Rules
// Description: Tiered rules matched against actions by category and tag.
// Dependencies: epistemic-core, serde
// ============================================================================

//! ## Overview
//! A [`Rule`] belongs to one of three [`Tier`]s. It applies to an
//! [`ActionDescriptor`] whose category matches (or whose rule category is
//! the wildcard) and is violated when the action carries any of the rule's
//! forbidden tags.

use std::collections::BTreeSet;

use epistemic_core::Instant;
use serde::Deserialize;
use serde::Serialize;

/// Wildcard category matching every action.
pub const WILDCARD_CATEGORY: &str = "*";

/// The amendment tier a [`Rule`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Never addable, never amendable, never deactivatable.
    Immutable,
    /// Amendable by supermajority vote.
    Constitutional,
    /// Amendable by simple majority vote.
    Policy,
}

impl Tier {
    /// The id prefix used for rules of this tier.
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::Immutable => "IMM",
            Self::Constitutional => "CON",
            Self::Policy => "POL",
        }
    }
}

/// A candidate action evaluated against the rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// The action's category (e.g. `"data_access"`, `"resource_allocation"`).
    pub category: String,
    /// Tags describing the action's specifics.
    pub tags: BTreeSet<String>,
}

/// One constitutional rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Opaque id, e.g. `IMM-001`, `CON-014`, `POL-003`.
    pub id: String,
    /// This rule's amendment tier.
    pub tier: Tier,
    /// The action category this rule governs, or [`WILDCARD_CATEGORY`].
    pub category: String,
    /// Human-readable statement of the rule.
    pub description: String,
    /// Tags that, if present on a matched action, violate this rule.
    pub forbidden_tags: BTreeSet<String>,
    /// Whether this rule is currently enforced.
    pub active: bool,
    /// When this rule was registered.
    pub created_at: Instant,
}

impl epistemic_core::Indexed for Rule {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

impl Rule {
    /// Returns whether this rule's category governs `action`.
    #[must_use]
    pub fn applies_to(&self, action: &ActionDescriptor) -> bool {
        self.active && (self.category == WILDCARD_CATEGORY || self.category == action.category)
    }

    /// Returns whether `action` violates this rule: it applies, its
    /// forbidden-tag set is non-empty, and every one of those tags is
    /// present on the action simultaneously (a rule with a single forbidden
    /// tag is violated by its mere presence; a rule naming several tags
    /// requires all of them at once).
    #[must_use]
    pub fn is_violated_by(&self, action: &ActionDescriptor) -> bool {
        self.applies_to(action) && !self.forbidden_tags.is_empty() && self.forbidden_tags.is_subset(&action.tags)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
