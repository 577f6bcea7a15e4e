// epistemic-coordination/src/accountability.rs
// ============================================================================
// Module: Accountability Graph
// Description: A graph of actor/action/outcome nodes linked by typed,
// weighted edges, with attribution-share computation.
// Dependencies: epistemic-core, epistemic-config, serde, serde_json
// ============================================================================

//! ## Overview
//! Every decision, influence, or execution an actor performs on an outcome
//! is recorded as an edge in an [`AccountabilityGraph`].
//! [`AccountabilityGraph::compute_attribution`] turns the edge set into a
//! per-actor share of credit: direct contribution from outgoing edges, plus
//! a fraction of what was received on incoming edges.

use std::collections::BTreeMap;

use epistemic_config::CommitmentConfig;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

/// Kind of relationship an [`AccountabilityEdge`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The actor decided the outcome's course.
    Decided,
    /// The actor influenced, without deciding, the outcome.
    Influenced,
    /// The actor executed the work behind the outcome.
    Executed,
    /// The actor approved the outcome.
    Approved,
    /// The actor vetoed the outcome.
    Vetoed,
    /// The actor delegated responsibility for the outcome to another.
    Delegated,
    /// The actor witnessed but did not act on the outcome.
    Witnessed,
}

/// A node in the accountability graph: an actor, action, or outcome.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// An actor (person or automated agent).
    Actor(String),
    /// An action taken.
    Action(String),
    /// An outcome produced.
    Outcome(String),
}

/// A weighted, evidenced edge between two nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountabilityEdge {
    /// The edge's origin node.
    pub from: NodeKind,
    /// The edge's destination node.
    pub to: NodeKind,
    /// The kind of relationship.
    pub kind: EdgeKind,
    /// The edge's contribution weight.
    pub weight: f64,
    /// Supporting evidence ids or payloads.
    pub evidence: Vec<Value>,
}

/// One actor's computed attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// The actor node this attribution is for.
    pub actor: String,
    /// Sum of this actor's outgoing edge weights.
    pub direct: f64,
    /// Sum of this actor's incoming edge weights.
    pub received: f64,
    /// `direct + received_weight * received`.
    pub total: f64,
    /// `total` divided by the sum of every actor's `total`.
    pub share: f64,
}

/// A graph of [`AccountabilityEdge`]s.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountabilityGraph {
    edges: Vec<AccountabilityEdge>,
}

impl AccountabilityGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a new edge.
    pub fn record(&mut self, edge: AccountabilityEdge) {
        self.edges.push(edge);
    }

    /// Every edge recorded so far.
    #[must_use]
    pub fn edges(&self) -> &[AccountabilityEdge] {
        &self.edges
    }

    /// Computes each actor's attribution share over every edge touching an
    /// [`NodeKind::Actor`] node.
    #[must_use]
    pub fn compute_attribution(&self, config: &CommitmentConfig) -> Vec<Attribution> {
        let mut direct: BTreeMap<String, f64> = BTreeMap::new();
        let mut received: BTreeMap<String, f64> = BTreeMap::new();

        for edge in &self.edges {
            if let NodeKind::Actor(actor) = &edge.from {
                *direct.entry(actor.clone()).or_insert(0.0) += edge.weight;
            }
            if let NodeKind::Actor(actor) = &edge.to {
                *received.entry(actor.clone()).or_insert(0.0) += edge.weight;
            }
        }

        let mut actors: Vec<String> = direct.keys().chain(received.keys()).cloned().collect();
        actors.sort();
        actors.dedup();

        let totals: BTreeMap<String, f64> = actors
            .iter()
            .map(|actor| {
                let d = direct.get(actor).copied().unwrap_or(0.0);
                let r = received.get(actor).copied().unwrap_or(0.0);
                (actor.clone(), d + config.received_weight * r)
            })
            .collect();
        let grand_total: f64 = totals.values().sum();

        actors
            .into_iter()
            .map(|actor| {
                let d = direct.get(&actor).copied().unwrap_or(0.0);
                let r = received.get(&actor).copied().unwrap_or(0.0);
                let total = totals[&actor];
                let share = if grand_total > 0.0 { total / grand_total } else { 0.0 };
                Attribution {
                    actor,
                    direct: d,
                    received: r,
                    total,
                    share,
                }
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, kind: EdgeKind, weight: f64) -> AccountabilityEdge {
        AccountabilityEdge {
            from: NodeKind::Actor(from.to_string()),
            to: NodeKind::Actor(to.to_string()),
            kind,
            weight,
            evidence: Vec::new(),
        }
    }

    #[test]
    fn direct_and_received_combine_into_total() {
        let mut graph = AccountabilityGraph::new();
        graph.record(edge("alice", "bob", EdgeKind::Delegated, 1.0));
        graph.record(edge("bob", "alice", EdgeKind::Executed, 0.5));

        let config = CommitmentConfig::default();
        let attributions = graph.compute_attribution(&config);

        let alice = attributions.iter().find(|a| a.actor == "alice").unwrap();
        assert!((alice.direct - 1.0).abs() < 1e-9);
        assert!((alice.received - 0.5).abs() < 1e-9);
        assert!((alice.total - (1.0 + 0.3 * 0.5)).abs() < 1e-9);
    }

    #[test]
    fn shares_sum_to_one() {
        let mut graph = AccountabilityGraph::new();
        graph.record(edge("alice", "bob", EdgeKind::Decided, 2.0));
        graph.record(edge("bob", "carol", EdgeKind::Executed, 1.0));
        graph.record(edge("carol", "alice", EdgeKind::Witnessed, 0.3));

        let config = CommitmentConfig::default();
        let attributions = graph.compute_attribution(&config);
        let sum: f64 = attributions.iter().map(|a| a.share).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_graph_yields_no_attributions() {
        let graph = AccountabilityGraph::new();
        assert!(graph.compute_attribution(&CommitmentConfig::default()).is_empty());
    }
}
