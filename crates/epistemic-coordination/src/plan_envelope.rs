// epistemic-coordination/src/plan_envelope.rs
// ============================================================================
// Module: Plan-Compatibility Envelope
// Description: Pre-execution safety check over candidate actions'
// preconditions and postconditions.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! Before a set of candidate actions executes, [`check_envelope`] verifies
//! none of them collide: no two actions hold the same exclusive resource,
//! and no two actions leave the same state variable in incompatible values.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// A candidate action with its resource claims and state effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateAction {
    /// Identifies the action for reporting.
    pub id: String,
    /// Resources this action holds exclusively for its duration.
    pub exclusive_resources: BTreeSet<String>,
    /// State variable -> required precondition value.
    pub preconditions: BTreeMap<String, Value>,
    /// State variable -> resulting postcondition value.
    pub postconditions: BTreeMap<String, Value>,
}

/// Kind of violation reported by [`check_envelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Two actions claim the same exclusive resource.
    ResourceExclusion,
    /// Two actions disagree on the value of a shared state variable across
    /// a postcondition/precondition pairing.
    StateConflict,
}

/// One violation between two candidate actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvelopeViolation {
    /// The kind of violation.
    pub kind: ViolationKind,
    /// The first action's id.
    pub action_a: String,
    /// The second action's id.
    pub action_b: String,
    /// The resource or state variable in conflict.
    pub subject: String,
}

/// Checks every pair of `actions` for resource exclusion and state
/// conflicts. The set is safe to execute together iff the returned list is
/// empty.
#[must_use]
pub fn check_envelope(actions: &[CandidateAction]) -> Vec<EnvelopeViolation> {
    let mut violations = Vec::new();
    for i in 0..actions.len() {
        for j in (i + 1)..actions.len() {
            let a = &actions[i];
            let b = &actions[j];

            for resource in a.exclusive_resources.intersection(&b.exclusive_resources) {
                violations.push(EnvelopeViolation {
                    kind: ViolationKind::ResourceExclusion,
                    action_a: a.id.clone(),
                    action_b: b.id.clone(),
                    subject: resource.clone(),
                });
            }

            for (variable, a_value) in &a.postconditions {
                if let Some(b_value) = b.postconditions.get(variable) {
                    if a_value != b_value {
                        violations.push(EnvelopeViolation {
                            kind: ViolationKind::StateConflict,
                            action_a: a.id.clone(),
                            action_b: b.id.clone(),
                            subject: variable.clone(),
                        });
                    }
                }
                if let Some(b_pre) = b.preconditions.get(variable) {
                    if a_value != b_pre {
                        violations.push(EnvelopeViolation {
                            kind: ViolationKind::StateConflict,
                            action_a: a.id.clone(),
                            action_b: b.id.clone(),
                            subject: variable.clone(),
                        });
                    }
                }
            }
        }
    }
    violations
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn action(id: &str, resources: &[&str], post: &[(&str, Value)]) -> CandidateAction {
        CandidateAction {
            id: id.to_string(),
            exclusive_resources: resources.iter().map(|r| r.to_string()).collect(),
            preconditions: BTreeMap::new(),
            postconditions: post.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
        }
    }

    #[test]
    fn shared_exclusive_resource_is_flagged() {
        let actions = vec![action("a", &["disk_0"], &[]), action("b", &["disk_0"], &[])];
        let violations = check_envelope(&actions);
        assert!(violations.iter().any(|v| v.kind == ViolationKind::ResourceExclusion));
    }

    #[test]
    fn conflicting_postconditions_are_flagged() {
        let actions = vec![
            action("a", &[], &[("flag", Value::Bool(true))]),
            action("b", &[], &[("flag", Value::Bool(false))]),
        ];
        let violations = check_envelope(&actions);
        assert!(violations.iter().any(|v| v.kind == ViolationKind::StateConflict && v.subject == "flag"));
    }

    #[test]
    fn disjoint_actions_report_no_violations() {
        let actions = vec![action("a", &["disk_0"], &[]), action("b", &["disk_1"], &[])];
        assert!(check_envelope(&actions).is_empty());
    }
}
