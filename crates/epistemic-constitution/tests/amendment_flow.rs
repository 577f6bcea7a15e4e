use std::collections::BTreeSet;
use std::sync::Arc;

use epistemic_config::RuleEngineConfig;
use epistemic_constitution::ActionDescriptor;
use epistemic_constitution::RuleEngine;
use epistemic_constitution::Tier;
use epistemic_core::Instant;
use epistemic_core::ManualClock;
use epistemic_core::Services;

#[test]
fn a_policy_rule_is_added_amended_and_checked_against_an_action() {
    let services = Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))));
    let mut engine = RuleEngine::new(0, &services);
    let config = RuleEngineConfig::default();

    let rule = engine
        .add_rule(
            Tier::Policy,
            "resource_allocation",
            "prefer batched allocation requests",
            BTreeSet::from(["single_item_allocation".to_string()]),
            &services,
        )
        .expect("policy rules are addable");

    let action = ActionDescriptor {
        category: "resource_allocation".to_string(),
        tags: BTreeSet::from(["single_item_allocation".to_string()]),
    };
    let first_check = engine.check_rules(&action);
    assert!(first_check.allowed, "policy violations never block");
    assert_eq!(first_check.violations.len(), 1);

    let outcome = engine
        .amend_rule(&rule.id, "batched allocation is now mandatory", BTreeSet::new(), 7, 2, &config)
        .expect("rule exists");
    assert!(outcome.amended);

    let second_check = engine.check_rules(&action);
    assert!(second_check.violations.is_empty(), "amendment cleared the forbidden tag");
}

#[test]
fn an_immutable_rule_blocks_the_action_and_cannot_be_touched() {
    let services = Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))));
    let mut engine = RuleEngine::new(0, &services);

    let action = ActionDescriptor {
        category: "verification".to_string(),
        tags: BTreeSet::from(["verification_bypass".to_string()]),
    };
    let result = engine.check_rules(&action);
    assert!(!result.allowed);
    assert!(result.violations.iter().any(|v| v.tier == Tier::Immutable));

    let err = engine.deactivate_rule("IMM-004").unwrap_err();
    assert_eq!(err.code(), "cannot_deactivate_immutable");
}
