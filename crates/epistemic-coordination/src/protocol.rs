// epistemic-coordination/src/protocol.rs
// ============================================================================
// Module: Coordination Protocol Engine
// Description: Multi-participant protocols: intent alignment, plan
// compatibility, negotiation, veto, and priority arbitration.
// Dependencies: epistemic-core, serde, serde_json
// ============================================================================

//! ## Overview
//! A [`Protocol`] tracks a set of participants working toward a shared
//! outcome. Each declared intent recomputes an alignment score from the
//! Jaccard overlap of participants' evidence sets; submitted plans are
//! checked pairwise for resource, ordering, dependency, and contradiction
//! conflicts; a negotiation resolves to the highest-weighted distinct
//! position.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use epistemic_core::Instant;
use epistemic_core::Services;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::error::ProtocolError;

/// Default cap on participants per protocol.
pub const MAX_PARTICIPANTS_PER_PROTOCOL: usize = 50;

/// Minimum mean alignment score for a protocol's intents to be considered
/// aligned.
const ALIGNMENT_MEAN_THRESHOLD: f64 = 0.5;
/// Any pairwise overlap below this makes the protocol non-aligned even if
/// the mean clears the threshold.
const ALIGNMENT_PAIR_FLOOR: f64 = 0.2;

/// Lifecycle status of a [`Protocol`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolStatus {
    /// Running normally.
    Active,
    /// Suspended.
    Paused,
    /// Killed by a participant veto.
    Vetoed,
}

/// A declared intent with the evidence backing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    /// The declaring participant.
    pub participant: String,
    /// Free-form intent statement.
    pub intent: String,
    /// Evidence ids backing this intent.
    pub evidence_ids: BTreeSet<String>,
}

/// One effect of a submitted plan: a change to `target` in `direction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEffect {
    /// The affected variable or resource.
    pub target: String,
    /// The direction of change, e.g. `"increase"` or `"decrease"`.
    pub direction: String,
}

/// A plan submitted by a participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    /// The submitting participant.
    pub participant: String,
    /// Resources this plan holds for its duration.
    pub resources: BTreeSet<String>,
    /// Inputs this plan consumes.
    pub inputs: BTreeSet<String>,
    /// Outputs this plan produces.
    pub outputs: BTreeSet<String>,
    /// Side effects this plan has.
    pub effects: Vec<PlanEffect>,
}

/// Kind of conflict detected by [`Protocol::check_plan_compatibility`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Two plans hold the same resource.
    Resource,
    /// Each plan's outputs feed the other's inputs (circular).
    Ordering,
    /// Exactly one plan's outputs feed the other's inputs.
    Dependency,
    /// Two plans' effects share a target but differ in direction.
    Contradiction,
}

/// One conflict between two plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanConflict {
    /// The kind of conflict.
    pub kind: ConflictKind,
    /// The first participant involved.
    pub participant_a: String,
    /// The second participant involved.
    pub participant_b: String,
    /// For a `dependency` conflict, which participant produces for which.
    pub detail: Option<String>,
}

/// One piece of evidence backing a negotiation position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEvidence {
    /// Confidence in this evidence item before adjustments.
    pub base_confidence: f64,
    /// Whether this finding has been independently replicated.
    pub replicated: bool,
    /// When this evidence was observed; recency decays linearly to zero
    /// over the year following this instant.
    pub observed_at: Instant,
}

const RECENCY_WINDOW_DAYS: f64 = 365.0;
const REPLICATED_BONUS: f64 = 0.2;
const RECENCY_BONUS: f64 = 0.1;

fn recency(observed_at: Instant, now: Instant) -> f64 {
    let days = now.millis_since(observed_at) as f64 / (1000.0 * 60.0 * 60.0 * 24.0);
    (1.0 - days / RECENCY_WINDOW_DAYS).clamp(0.0, 1.0)
}

fn evidence_item_weight(item: &PositionEvidence, now: Instant) -> f64 {
    item.base_confidence + REPLICATED_BONUS * f64::from(u8::from(item.replicated)) + RECENCY_BONUS * recency(item.observed_at, now)
}

fn position_weight(evidence: &[PositionEvidence], now: Instant) -> f64 {
    if evidence.is_empty() {
        return 0.0;
    }
    evidence.iter().map(|item| evidence_item_weight(item, now)).sum::<f64>() / evidence.len() as f64
}

/// A position submitted during a negotiation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    /// The submitting participant.
    pub participant: String,
    /// The structural content of this position, compared for equality when
    /// grouping.
    pub statement: Value,
    /// Evidence backing this position.
    pub evidence: Vec<PositionEvidence>,
}

/// Outcome of [`Protocol::resolve_negotiation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NegotiationResolution {
    /// The winning statement.
    pub winning_statement: Value,
    /// Summed weight of the winning group.
    pub winner_weight: f64,
    /// Confidence: winner weight over total weight across all groups.
    pub confidence: f64,
}

/// An open or resolved negotiation within a protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Negotiation {
    /// Opaque id, prefixed `ng_`.
    pub id: String,
    /// Free-form negotiation topic.
    pub topic: String,
    /// Positions submitted so far.
    pub positions: Vec<Position>,
    /// The resolution, once resolved.
    pub resolution: Option<NegotiationResolution>,
}

/// A multi-participant coordination protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    /// Opaque id, prefixed `pt_`.
    pub id: String,
    /// Caller-chosen coordination mode (e.g. `"consensus"`, `"delegated"`).
    pub mode: String,
    /// The participant that created this protocol.
    pub initiator: String,
    /// Current status.
    pub status: ProtocolStatus,
    /// Every joined participant.
    pub participants: Vec<String>,
    /// Declared intents, one slot per participant that has declared.
    pub intents: Vec<Intent>,
    /// Current alignment score: mean pairwise Jaccard overlap of intents.
    pub alignment_score: f64,
    /// Whether the protocol's intents are currently aligned.
    pub aligned: bool,
    /// Submitted plans, one slot per participant that has submitted.
    pub plans: Vec<Plan>,
    /// Negotiations opened on this protocol.
    pub negotiations: Vec<Negotiation>,
    /// Reason recorded if vetoed.
    pub veto_reason: Option<String>,
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 { 1.0 } else { intersection as f64 / union as f64 }
}

fn recompute_alignment(intents: &[Intent]) -> (f64, bool) {
    if intents.len() < 2 {
        return (1.0, true);
    }
    let mut overlaps = Vec::new();
    for i in 0..intents.len() {
        for j in (i + 1)..intents.len() {
            overlaps.push(jaccard(&intents[i].evidence_ids, &intents[j].evidence_ids));
        }
    }
    let mean = overlaps.iter().sum::<f64>() / overlaps.len() as f64;
    let all_above_floor = overlaps.iter().all(|o| *o >= ALIGNMENT_PAIR_FLOOR);
    (mean, mean >= ALIGNMENT_MEAN_THRESHOLD && all_above_floor)
}

impl Protocol {
    fn require_participant(&self, participant: &str) -> Result<(), ProtocolError> {
        if self.participants.iter().any(|p| p == participant) {
            Ok(())
        } else {
            Err(ProtocolError::NotAParticipant {
                protocol_id: self.id.clone(),
                participant: participant.to_string(),
            })
        }
    }

    /// Adds `participant` to this protocol.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::ProtocolFull`] at
    /// [`MAX_PARTICIPANTS_PER_PROTOCOL`].
    pub fn join(&mut self, participant: impl Into<String>, declared_intent: Option<String>) -> Result<(), ProtocolError> {
        if self.participants.len() >= MAX_PARTICIPANTS_PER_PROTOCOL {
            return Err(ProtocolError::ProtocolFull { id: self.id.clone() });
        }
        let participant = participant.into();
        if let Some(intent) = declared_intent {
            self.intents.push(Intent {
                participant: participant.clone(),
                intent,
                evidence_ids: BTreeSet::new(),
            });
            let (mean, aligned) = recompute_alignment(&self.intents);
            self.alignment_score = mean;
            self.aligned = aligned;
        }
        self.participants.push(participant);
        Ok(())
    }

    /// Records or replaces `participant`'s declared intent and recomputes
    /// alignment.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotAParticipant`].
    pub fn declare_intent(
        &mut self,
        participant: &str,
        intent: impl Into<String>,
        evidence_bundle: BTreeSet<String>,
    ) -> Result<(), ProtocolError> {
        self.require_participant(participant)?;
        self.intents.retain(|i| i.participant != participant);
        self.intents.push(Intent {
            participant: participant.to_string(),
            intent: intent.into(),
            evidence_ids: evidence_bundle,
        });
        let (mean, aligned) = recompute_alignment(&self.intents);
        self.alignment_score = mean;
        self.aligned = aligned;
        Ok(())
    }

    /// Records or replaces `plan.participant`'s submitted plan.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotAParticipant`].
    pub fn submit_plan(&mut self, plan: Plan) -> Result<(), ProtocolError> {
        self.require_participant(&plan.participant)?;
        self.plans.retain(|p| p.participant != plan.participant);
        self.plans.push(plan);
        Ok(())
    }

    /// Reports every pairwise conflict among submitted plans. The plan set
    /// is compatible iff the returned list is empty.
    #[must_use]
    pub fn check_plan_compatibility(&self) -> Vec<PlanConflict> {
        let mut conflicts = Vec::new();
        for i in 0..self.plans.len() {
            for j in (i + 1)..self.plans.len() {
                let a = &self.plans[i];
                let b = &self.plans[j];

                if a.resources.intersection(&b.resources).next().is_some() {
                    conflicts.push(PlanConflict {
                        kind: ConflictKind::Resource,
                        participant_a: a.participant.clone(),
                        participant_b: b.participant.clone(),
                        detail: None,
                    });
                }

                let a_feeds_b = a.outputs.intersection(&b.inputs).next().is_some();
                let b_feeds_a = b.outputs.intersection(&a.inputs).next().is_some();
                if a_feeds_b && b_feeds_a {
                    conflicts.push(PlanConflict {
                        kind: ConflictKind::Ordering,
                        participant_a: a.participant.clone(),
                        participant_b: b.participant.clone(),
                        detail: None,
                    });
                } else if a_feeds_b {
                    conflicts.push(PlanConflict {
                        kind: ConflictKind::Dependency,
                        participant_a: a.participant.clone(),
                        participant_b: b.participant.clone(),
                        detail: Some(format!("{} -> {}", a.participant, b.participant)),
                    });
                } else if b_feeds_a {
                    conflicts.push(PlanConflict {
                        kind: ConflictKind::Dependency,
                        participant_a: a.participant.clone(),
                        participant_b: b.participant.clone(),
                        detail: Some(format!("{} -> {}", b.participant, a.participant)),
                    });
                }

                for effect_a in &a.effects {
                    for effect_b in &b.effects {
                        if effect_a.target == effect_b.target && effect_a.direction != effect_b.direction {
                            conflicts.push(PlanConflict {
                                kind: ConflictKind::Contradiction,
                                participant_a: a.participant.clone(),
                                participant_b: b.participant.clone(),
                                detail: Some(effect_a.target.clone()),
                            });
                        }
                    }
                }
            }
        }
        conflicts
    }

    /// Opens a new negotiation.
    pub fn start_negotiation(&mut self, topic: impl Into<String>, services: &Services) -> Negotiation {
        let negotiation = Negotiation {
            id: services.new_id("ng"),
            topic: topic.into(),
            positions: Vec::new(),
            resolution: None,
        };
        self.negotiations.push(negotiation.clone());
        negotiation
    }

    /// Submits a position to an open negotiation.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotFound`] if no such negotiation exists, or
    /// [`ProtocolError::NotAParticipant`].
    pub fn submit_position(&mut self, negotiation_id: &str, position: Position) -> Result<(), ProtocolError> {
        self.require_participant(&position.participant)?;
        let negotiation = self
            .negotiations
            .iter_mut()
            .find(|n| n.id == negotiation_id)
            .ok_or_else(|| ProtocolError::NotFound { id: negotiation_id.to_string() })?;
        negotiation.positions.push(position);
        Ok(())
    }

    /// Resolves an open negotiation: groups positions by structural
    /// equality of `statement`, sums each group's mean position weight,
    /// and declares the highest-summed group the winner.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotFound`] if no such negotiation exists, or
    /// [`ProtocolError::NoOpenNegotiation`] if it carries no positions.
    pub fn resolve_negotiation(&mut self, negotiation_id: &str, now: Instant) -> Result<NegotiationResolution, ProtocolError> {
        let negotiation = self
            .negotiations
            .iter_mut()
            .find(|n| n.id == negotiation_id)
            .ok_or_else(|| ProtocolError::NotFound { id: negotiation_id.to_string() })?;
        if negotiation.positions.is_empty() {
            return Err(ProtocolError::NoOpenNegotiation {
                protocol_id: negotiation_id.to_string(),
            });
        }

        let mut groups: Vec<(Value, f64)> = Vec::new();
        for position in &negotiation.positions {
            let weight = position_weight(&position.evidence, now);
            if let Some(existing) = groups.iter_mut().find(|(statement, _)| *statement == position.statement) {
                existing.1 += weight;
            } else {
                groups.push((position.statement.clone(), weight));
            }
        }
        let total: f64 = groups.iter().map(|(_, w)| w).sum();
        let (winning_statement, winner_weight) = groups
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((Value::Null, 0.0));
        let confidence = if total > 0.0 { winner_weight / total } else { 0.0 };

        let resolution = NegotiationResolution {
            winning_statement,
            winner_weight,
            confidence,
        };
        negotiation.resolution = Some(resolution.clone());
        Ok(resolution)
    }

    /// Vetoes the protocol; any participant may call this.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotAParticipant`].
    pub fn veto(&mut self, participant: &str, reason: impl Into<String>) -> Result<(), ProtocolError> {
        self.require_participant(participant)?;
        self.status = ProtocolStatus::Vetoed;
        self.veto_reason = Some(reason.into());
        Ok(())
    }

    /// Pauses an active protocol.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidStatus`] if not currently active.
    pub fn pause(&mut self) -> Result<(), ProtocolError> {
        if self.status != ProtocolStatus::Active {
            return Err(ProtocolError::InvalidStatus {
                status: status_key(self.status).to_string(),
            });
        }
        self.status = ProtocolStatus::Paused;
        Ok(())
    }

    /// Resumes a paused protocol.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidStatus`] if not currently paused.
    pub fn resume(&mut self) -> Result<(), ProtocolError> {
        if self.status != ProtocolStatus::Paused {
            return Err(ProtocolError::InvalidStatus {
                status: status_key(self.status).to_string(),
            });
        }
        self.status = ProtocolStatus::Active;
        Ok(())
    }
}

const fn status_key(status: ProtocolStatus) -> &'static str {
    match status {
        ProtocolStatus::Active => "active",
        ProtocolStatus::Paused => "paused",
        ProtocolStatus::Vetoed => "vetoed",
    }
}

/// Per-participant inputs to [`arbitrate_priority`].
#[derive(Debug, Clone, Copy)]
pub struct PriorityInputs {
    /// Evidence weight backing this participant's plan.
    pub evidence_weight: f64,
    /// Urgency of this participant's plan.
    pub urgency: f64,
    /// How reversible this participant's plan is.
    pub reversibility: f64,
}

/// One participant's arbitrated priority score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriorityRanking {
    /// The participant.
    pub participant: String,
    /// `0.5*evidenceWeight + 0.3*urgency + 0.2*reversibility`.
    pub score: f64,
}

/// Ranks plans by `0.5*evidenceWeight + 0.3*urgency + 0.2*reversibility`,
/// highest first.
#[must_use]
pub fn arbitrate_priority(inputs: &BTreeMap<String, PriorityInputs>) -> Vec<PriorityRanking> {
    let mut rankings: Vec<PriorityRanking> = inputs
        .iter()
        .map(|(participant, input)| PriorityRanking {
            participant: participant.clone(),
            score: 0.5 * input.evidence_weight + 0.3 * input.urgency + 0.2 * input.reversibility,
        })
        .collect();
    rankings.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    rankings
}

impl epistemic_core::Indexed for Protocol {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

/// Bounded, indexed store of [`Protocol`]s.
pub struct ProtocolStore {
    store: epistemic_core::BoundedIndexedStore<Protocol>,
}

/// Default ceiling for the protocol store before FIFO eviction kicks in.
pub const DEFAULT_CEILING: usize = 5_000;

impl ProtocolStore {
    /// Creates an empty protocol store with the given ceiling (0 =
    /// unbounded).
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            store: epistemic_core::BoundedIndexedStore::new(ceiling),
        }
    }

    /// Creates a new protocol with `initiator` as its first participant.
    pub fn create(&mut self, mode: impl Into<String>, initiator: impl Into<String>, services: &Services) -> Protocol {
        let initiator = initiator.into();
        let protocol = Protocol {
            id: services.new_id("pt"),
            mode: mode.into(),
            initiator: initiator.clone(),
            status: ProtocolStatus::Active,
            participants: vec![initiator],
            intents: Vec::new(),
            alignment_score: 1.0,
            aligned: true,
            plans: Vec::new(),
            negotiations: Vec::new(),
            veto_reason: None,
        };
        self.store.put(protocol.clone());
        protocol
    }

    /// Looks up a protocol by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Protocol> {
        self.store.get(id)
    }

    /// Mutates the protocol with the given id via `f`, persisting the
    /// result.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotFound`] if no such protocol exists, or
    /// whatever error `f` returns.
    pub fn with_mut<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Protocol) -> Result<T, ProtocolError>,
    ) -> Result<T, ProtocolError> {
        let mut record = self.store.get(id).cloned().ok_or_else(|| ProtocolError::NotFound { id: id.to_string() })?;
        let result = f(&mut record)?;
        self.store.put(record);
        Ok(result)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use epistemic_core::ManualClock;

    use super::*;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    #[test]
    fn joining_past_the_cap_is_rejected() {
        let services = services();
        let mut store = ProtocolStore::new(0);
        let protocol = store.create("consensus", "initiator", &services);
        store
            .with_mut(&protocol.id, |p| {
                for i in 0..(MAX_PARTICIPANTS_PER_PROTOCOL - 1) {
                    p.join(format!("participant_{i}"), None)?;
                }
                Ok(())
            })
            .unwrap();
        let err = store.with_mut(&protocol.id, |p| p.join("one_too_many", None)).unwrap_err();
        assert_eq!(err.code(), "protocol_full");
    }

    #[test]
    fn aligned_intents_raise_the_score_above_threshold() {
        let services = services();
        let mut store = ProtocolStore::new(0);
        let protocol = store.create("consensus", "a", &services);
        store
            .with_mut(&protocol.id, |p| {
                p.join("b", None)?;
                p.declare_intent("a", "ship it", BTreeSet::from(["ev_1".to_string(), "ev_2".to_string()]))?;
                p.declare_intent("b", "ship it", BTreeSet::from(["ev_1".to_string(), "ev_2".to_string()]))?;
                Ok(())
            })
            .unwrap();
        let updated = store.get(&protocol.id).unwrap();
        assert!(updated.aligned);
        assert!((updated.alignment_score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_intents_are_not_aligned() {
        let services = services();
        let mut store = ProtocolStore::new(0);
        let protocol = store.create("consensus", "a", &services);
        store
            .with_mut(&protocol.id, |p| {
                p.join("b", None)?;
                p.declare_intent("a", "plan a", BTreeSet::from(["ev_1".to_string()]))?;
                p.declare_intent("b", "plan b", BTreeSet::from(["ev_2".to_string()]))?;
                Ok(())
            })
            .unwrap();
        assert!(!store.get(&protocol.id).unwrap().aligned);
    }

    #[test]
    fn resource_conflict_is_detected() {
        let services = services();
        let mut store = ProtocolStore::new(0);
        let protocol = store.create("consensus", "a", &services);
        store
            .with_mut(&protocol.id, |p| {
                p.join("b", None)?;
                p.submit_plan(Plan {
                    participant: "a".to_string(),
                    resources: BTreeSet::from(["lock_x".to_string()]),
                    inputs: BTreeSet::new(),
                    outputs: BTreeSet::new(),
                    effects: Vec::new(),
                })?;
                p.submit_plan(Plan {
                    participant: "b".to_string(),
                    resources: BTreeSet::from(["lock_x".to_string()]),
                    inputs: BTreeSet::new(),
                    outputs: BTreeSet::new(),
                    effects: Vec::new(),
                })?;
                Ok(())
            })
            .unwrap();
        let conflicts = store.get(&protocol.id).unwrap().check_plan_compatibility();
        assert!(conflicts.iter().any(|c| c.kind == ConflictKind::Resource));
    }

    #[test]
    fn circular_outputs_are_an_ordering_conflict() {
        let services = services();
        let mut store = ProtocolStore::new(0);
        let protocol = store.create("consensus", "a", &services);
        store
            .with_mut(&protocol.id, |p| {
                p.join("b", None)?;
                p.submit_plan(Plan {
                    participant: "a".to_string(),
                    resources: BTreeSet::new(),
                    inputs: BTreeSet::from(["from_b".to_string()]),
                    outputs: BTreeSet::from(["for_b".to_string()]),
                    effects: Vec::new(),
                })?;
                p.submit_plan(Plan {
                    participant: "b".to_string(),
                    resources: BTreeSet::new(),
                    inputs: BTreeSet::from(["for_b".to_string()]),
                    outputs: BTreeSet::from(["from_b".to_string()]),
                    effects: Vec::new(),
                })?;
                Ok(())
            })
            .unwrap();
        let conflicts = store.get(&protocol.id).unwrap().check_plan_compatibility();
        assert!(conflicts.iter().any(|c| c.kind == ConflictKind::Ordering));
    }

    #[test]
    fn negotiation_winner_has_highest_summed_weight() {
        let services = services();
        let mut store = ProtocolStore::new(0);
        let protocol = store.create("consensus", "a", &services);
        let negotiation_id = store
            .with_mut(&protocol.id, |p| {
                p.join("b", None)?;
                p.join("c", None)?;
                Ok(p.start_negotiation("pick an approach", &services).id)
            })
            .unwrap();

        let evidence = |confidence: f64| {
            vec![PositionEvidence {
                base_confidence: confidence,
                replicated: true,
                observed_at: Instant::from_millis(0),
            }]
        };
        store
            .with_mut(&protocol.id, |p| {
                p.submit_position(
                    &negotiation_id,
                    Position {
                        participant: "a".to_string(),
                        statement: serde_json::json!({"approach": "x"}),
                        evidence: evidence(0.9),
                    },
                )?;
                p.submit_position(
                    &negotiation_id,
                    Position {
                        participant: "b".to_string(),
                        statement: serde_json::json!({"approach": "x"}),
                        evidence: evidence(0.8),
                    },
                )?;
                p.submit_position(
                    &negotiation_id,
                    Position {
                        participant: "c".to_string(),
                        statement: serde_json::json!({"approach": "y"}),
                        evidence: evidence(0.95),
                    },
                )
            })
            .unwrap();

        let resolution = store
            .with_mut(&protocol.id, |p| p.resolve_negotiation(&negotiation_id, Instant::from_millis(0)))
            .unwrap();
        assert_eq!(resolution.winning_statement, serde_json::json!({"approach": "x"}));
    }

    #[test]
    fn arbitration_ranks_by_weighted_score() {
        let mut inputs = BTreeMap::new();
        inputs.insert(
            "a".to_string(),
            PriorityInputs {
                evidence_weight: 0.9,
                urgency: 0.5,
                reversibility: 0.5,
            },
        );
        inputs.insert(
            "b".to_string(),
            PriorityInputs {
                evidence_weight: 0.1,
                urgency: 0.9,
                reversibility: 0.9,
            },
        );
        let ranked = arbitrate_priority(&inputs);
        assert_eq!(ranked[0].participant, "a");
    }
}
