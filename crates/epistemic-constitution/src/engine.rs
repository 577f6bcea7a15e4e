// epistemic-constitution/src/engine.rs
// ============================================================================
// Module: Rule Engine
// Description: Tiered rule storage, amendment voting, and action checking.
// Dependencies: epistemic-core, epistemic-config
// ============================================================================

//! ## Overview
//! [`RuleEngine`] seeds ten immutable rules at construction, then lets
//! callers add constitutional- and policy-tier rules, amend them by vote,
//! deactivate them, and check candidate actions against the active set.

use std::collections::BTreeMap;

use epistemic_config::RuleEngineConfig;
use epistemic_core::BoundedIndexedStore;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;

use crate::error::RuleError;
use crate::rule::ActionDescriptor;
use crate::rule::Rule;
use crate::rule::Tier;

/// Outcome of [`RuleEngine::amend_rule`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmendmentOutcome {
    /// Whether the vote was processed without error.
    pub ok: bool,
    /// Whether the amendment actually cleared its threshold and applied.
    pub amended: bool,
}

/// One rule a [`RuleEngine::check_rules`] call found violated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleViolation {
    /// The violated rule's id.
    pub rule_id: String,
    /// The violated rule's tier.
    pub tier: Tier,
    /// The violated rule's description.
    pub description: String,
}

/// Result of [`RuleEngine::check_rules`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCheckResult {
    /// `false` iff an immutable- or constitutional-tier rule was violated.
    pub allowed: bool,
    /// Every violated rule, across all tiers, for visibility.
    pub violations: Vec<RuleViolation>,
}

/// Default ceiling for the rule store before FIFO eviction kicks in.
pub const DEFAULT_CEILING: usize = 5_000;

/// The tiered constitutional rule engine.
pub struct RuleEngine {
    store: BoundedIndexedStore<Rule>,
    next_sequence: BTreeMap<Tier, u32>,
}

fn seed_rule(store: &mut BoundedIndexedStore<Rule>, sequence: u32, category: &str, description: &str, forbidden_tags: &[&str], services: &Services) {
    let rule = Rule {
        id: format!("{}-{sequence:03}", Tier::Immutable.id_prefix()),
        tier: Tier::Immutable,
        category: category.to_string(),
        description: description.to_string(),
        forbidden_tags: forbidden_tags.iter().map(|t| t.to_string()).collect(),
        active: true,
        created_at: services.now(),
    };
    store.put(rule);
}

impl RuleEngine {
    /// Creates a rule engine seeded with ten immutable rules.
    #[must_use]
    pub fn new(ceiling: usize, services: &Services) -> Self {
        let mut store = BoundedIndexedStore::new(ceiling).with_index("tier", |r: &Rule| vec![tier_key(r.tier).to_string()]);

        seed_rule(&mut store, 1, "*", "never fabricate evidence or misrepresent its provenance", &["fabricated_evidence"], services);
        seed_rule(&mut store, 2, "*", "never suppress evidence that contradicts an active claim", &["evidence_suppression"], services);
        seed_rule(&mut store, 3, "data_access", "never exfiltrate data outside its declared scope", &["scope_violation", "exfiltration"], services);
        seed_rule(&mut store, 4, "*", "never bypass a configured verification gate", &["verification_bypass"], services);
        seed_rule(&mut store, 5, "resource_allocation", "never exceed an allocated sandbox's resource budget", &["budget_override"], services);
        seed_rule(&mut store, 6, "*", "never impersonate another actor in a coordination protocol", &["impersonation"], services);
        seed_rule(&mut store, 7, "commitment", "never unilaterally mark a commitment fulfilled without verifier sign-off", &["unverified_fulfillment"], services);
        seed_rule(&mut store, 8, "*", "never execute an action that violates an active interlock", &["interlock_violation"], services);
        seed_rule(&mut store, 9, "*", "never let an emergent, unreviewed governance decision take effect unchecked", &["emergent", "governance", "decision"], services);
        seed_rule(&mut store, 10, "*", "never destroy an audit trail required by an open rollback coordination", &["audit_destruction"], services);

        let mut next_sequence = BTreeMap::new();
        next_sequence.insert(Tier::Immutable, 11);
        next_sequence.insert(Tier::Constitutional, 1);
        next_sequence.insert(Tier::Policy, 1);

        Self { store, next_sequence }
    }

    /// Registers a new constitutional- or policy-tier rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::CannotAddImmutableRules`] if `tier` is
    /// [`Tier::Immutable`].
    pub fn add_rule(
        &mut self,
        tier: Tier,
        category: impl Into<String>,
        description: impl Into<String>,
        forbidden_tags: std::collections::BTreeSet<String>,
        services: &Services,
    ) -> Result<Rule, RuleError> {
        if tier == Tier::Immutable {
            return Err(RuleError::CannotAddImmutableRules);
        }
        let sequence = self.next_sequence.entry(tier).or_insert(1);
        let id = format!("{}-{sequence:03}", tier.id_prefix());
        *sequence += 1;
        let rule = Rule {
            id,
            tier,
            category: category.into(),
            description: description.into(),
            forbidden_tags,
            active: true,
            created_at: services.now(),
        };
        self.store.put(rule.clone());
        Ok(rule)
    }

    /// Looks up a rule by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Rule> {
        self.store.get(id)
    }

    /// Processes a vote to amend a rule's description and forbidden tags.
    /// Constitutional-tier rules require `config.constitutional_supermajority`
    /// of `for / (for + against)`; policy-tier rules require a simple
    /// majority; immutable-tier rules are never amendable and this always
    /// returns `amended: false` for them.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotFound`] if no such rule exists.
    pub fn amend_rule(
        &mut self,
        id: &str,
        new_description: impl Into<String>,
        new_forbidden_tags: std::collections::BTreeSet<String>,
        votes_for: u32,
        votes_against: u32,
        config: &RuleEngineConfig,
    ) -> Result<AmendmentOutcome, RuleError> {
        let mut rule = self.store.get(id).cloned().ok_or_else(|| RuleError::NotFound { id: id.to_string() })?;

        if rule.tier == Tier::Immutable {
            return Ok(AmendmentOutcome { ok: true, amended: false });
        }

        let total_votes = votes_for + votes_against;
        let ratio = if total_votes > 0 { f64::from(votes_for) / f64::from(total_votes) } else { 0.0 };
        let threshold = match rule.tier {
            Tier::Constitutional => config.constitutional_supermajority,
            Tier::Policy | Tier::Immutable => 0.5,
        };
        let clears = match rule.tier {
            Tier::Constitutional => ratio >= threshold,
            Tier::Policy => ratio > threshold,
            Tier::Immutable => false,
        };
        let amended = votes_for >= 1 && clears;

        if amended {
            rule.description = new_description.into();
            rule.forbidden_tags = new_forbidden_tags;
            self.store.put(rule);
        }
        Ok(AmendmentOutcome { ok: true, amended })
    }

    /// Deactivates a rule.
    ///
    /// # Errors
    ///
    /// Returns [`RuleError::NotFound`] if no such rule exists, or
    /// [`RuleError::CannotDeactivateImmutableRules`] if it is
    /// immutable-tier.
    pub fn deactivate_rule(&mut self, id: &str) -> Result<(), RuleError> {
        let mut rule = self.store.get(id).cloned().ok_or_else(|| RuleError::NotFound { id: id.to_string() })?;
        if rule.tier == Tier::Immutable {
            return Err(RuleError::CannotDeactivateImmutableRules);
        }
        rule.active = false;
        self.store.put(rule);
        Ok(())
    }

    /// Checks `action` against every rule in the store.
    #[must_use]
    pub fn check_rules(&self, action: &ActionDescriptor) -> RuleCheckResult {
        let violations: Vec<RuleViolation> = self
            .store
            .list()
            .filter(|rule| rule.is_violated_by(action))
            .map(|rule| RuleViolation {
                rule_id: rule.id.clone(),
                tier: rule.tier,
                description: rule.description.clone(),
            })
            .collect();
        let allowed = !violations.iter().any(|v| matches!(v.tier, Tier::Immutable | Tier::Constitutional));
        RuleCheckResult { allowed, violations }
    }

    /// Lists every rule in the given tier.
    #[must_use]
    pub fn by_tier(&self, tier: Tier) -> Vec<&Rule> {
        self.store.by_index("tier", tier_key(tier)).iter().filter_map(|id| self.store.get(id)).collect()
    }
}

const fn tier_key(tier: Tier) -> &'static str {
    match tier {
        Tier::Immutable => "immutable",
        Tier::Constitutional => "constitutional",
        Tier::Policy => "policy",
    }
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

    use super::*;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    #[test]
    fn seeds_exactly_ten_immutable_rules() {
        let engine = RuleEngine::new(0, &services());
        assert_eq!(engine.by_tier(Tier::Immutable).len(), 10);
    }

    #[test]
    fn adding_an_immutable_rule_is_rejected() {
        let mut engine = RuleEngine::new(0, &services());
        let err = engine.add_rule(Tier::Immutable, "*", "nope", BTreeSet::new(), &services()).unwrap_err();
        assert_eq!(err.code(), "cannot_add_immutable_rules");
    }

    #[test]
    fn constitutional_amendment_needs_a_supermajority() {
        let services = services();
        let mut engine = RuleEngine::new(0, &services);
        let config = RuleEngineConfig::default();
        let rule = engine
            .add_rule(Tier::Constitutional, "data_access", "old text", BTreeSet::from(["old_tag".to_string()]), &services)
            .unwrap();

        let rejected = engine.amend_rule(&rule.id, "new text", BTreeSet::new(), 5, 4, &config).unwrap();
        assert!(!rejected.amended);

        let accepted = engine.amend_rule(&rule.id, "new text", BTreeSet::from(["new_tag".to_string()]), 8, 1, &config).unwrap();
        assert!(accepted.amended);
        assert_eq!(engine.get(&rule.id).unwrap().description, "new text");
    }

    #[test]
    fn policy_amendment_needs_only_a_simple_majority() {
        let services = services();
        let mut engine = RuleEngine::new(0, &services);
        let config = RuleEngineConfig::default();
        let rule = engine.add_rule(Tier::Policy, "*", "old text", BTreeSet::new(), &services).unwrap();

        let accepted = engine.amend_rule(&rule.id, "new text", BTreeSet::new(), 6, 4, &config).unwrap();
        assert!(accepted.amended);
    }

    #[test]
    fn deactivating_an_immutable_rule_is_rejected() {
        let mut engine = RuleEngine::new(0, &services());
        let err = engine.deactivate_rule("IMM-001").unwrap_err();
        assert_eq!(err.code(), "cannot_deactivate_immutable");
    }

    #[test]
    fn check_rules_blocks_on_immutable_violation_but_reports_policy_violations_too() {
        let services = services();
        let mut engine = RuleEngine::new(0, &services);
        engine
            .add_rule(Tier::Policy, "data_access", "prefer encrypted transport", BTreeSet::from(["plaintext".to_string()]), &services)
            .unwrap();

        let action = ActionDescriptor {
            category: "data_access".to_string(),
            tags: BTreeSet::from(["plaintext".to_string(), "fabricated_evidence".to_string()]),
        };
        let result = engine.check_rules(&action);
        assert!(!result.allowed);
        assert_eq!(result.violations.len(), 2);
    }

    #[test]
    fn an_emergent_governance_decision_requires_all_three_tags_at_once() {
        let engine = RuleEngine::new(0, &services());

        let partial = ActionDescriptor {
            category: "anything".to_string(),
            tags: BTreeSet::from(["emergent".to_string(), "governance".to_string()]),
        };
        assert!(engine.check_rules(&partial).allowed);

        let complete = ActionDescriptor {
            category: "anything".to_string(),
            tags: BTreeSet::from(["emergent".to_string(), "governance".to_string(), "decision".to_string()]),
        };
        assert!(!engine.check_rules(&complete).allowed);
    }
}
