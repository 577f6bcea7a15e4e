// epistemic-core/src/knowledge.rs
// ============================================================================
// Module: Knowledge Store
// Description: Knowledge units, their quality metrics, and typed edges
// between them.
// Purpose: Hold the atomic, citable pieces of knowledge the rest of the
// engine reasons about.
// Dependencies: crate::bounded_store, crate::error, serde
// ============================================================================

//! ## Overview
//! A [`KnowledgeUnit`] is an atomic, citable piece of knowledge with three
//! quality metrics (resonance, coherence, stability), a tier, a tag/domain
//! set, and typed edges to other units. [`KnowledgeStore`] owns the set of
//! units and enforces the invariants from the data model on every mutation.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;

use crate::bounded_store::BoundedIndexedStore;
use crate::bounded_store::Indexed;
use crate::error::KnowledgeError;
use crate::ids::Instant;
use crate::ids::Services;

/// Default ceiling for the knowledge store.
pub const DEFAULT_CEILING: usize = 100_000;

// ============================================================================
// SECTION: Tier & Edge Types
// ============================================================================

/// Knowledge unit tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// A placeholder unit that may have an empty body.
    Shadow,
    /// An ordinary unit.
    Regular,
    /// A foundational unit other units are expected to build on.
    Base,
    /// A heavily relied-upon unit.
    Mega,
}

impl Tier {
    /// Returns the tier's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shadow => "shadow",
            Self::Regular => "regular",
            Self::Base => "base",
            Self::Mega => "mega",
        }
    }
}

/// The relationship a [`KnowledgeEdge`] expresses between two units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    /// The source supports the target.
    Supports,
    /// The source refutes the target.
    Refutes,
    /// The source contradicts the target.
    Contradicts,
}

/// A directed, typed edge from one knowledge unit to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEdge {
    /// Source unit id.
    pub src: String,
    /// Target unit id.
    pub dst: String,
    /// Edge relationship type.
    pub edge_type: EdgeType,
}

// ============================================================================
// SECTION: Knowledge Unit
// ============================================================================

/// An atomic, citable piece of knowledge.
///
/// # Invariants
/// - `resonance`, `coherence`, `stability` are each within `[0, 1]`.
/// - `body` is non-empty unless `tier` is [`Tier::Shadow`].
/// - `edges` never contains a self-referential `Supports` edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeUnit {
    /// Opaque identifier, `ku_...`.
    pub id: String,
    /// Short title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Tier classification.
    pub tier: Tier,
    /// Free-form domain/tag set.
    pub tags: BTreeSet<String>,
    /// Resonance quality field, `[0, 1]`.
    pub resonance: f64,
    /// Coherence quality field, `[0, 1]`.
    pub coherence: f64,
    /// Stability quality field, `[0, 1]`.
    pub stability: f64,
    /// Outgoing edges to other units.
    pub edges: Vec<KnowledgeEdge>,
    /// Creation instant.
    pub created_at: Instant,
    /// Last-update instant.
    pub updated_at: Instant,
}

impl Indexed for KnowledgeUnit {
    fn primary_id(&self) -> &str {
        &self.id
    }
}

/// Fields a caller may update via [`KnowledgeStore::update_fields`].
///
/// Every field is optional; only the fields present are changed, and the
/// whole update is rejected (with no partial effect) if the result would
/// violate an invariant.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeFieldUpdate {
    /// New title, if changing.
    pub title: Option<String>,
    /// New body, if changing.
    pub body: Option<String>,
    /// New tier, if changing.
    pub tier: Option<Tier>,
    /// New tag set, if changing.
    pub tags: Option<BTreeSet<String>>,
    /// New resonance value, if changing.
    pub resonance: Option<f64>,
    /// New coherence value, if changing.
    pub coherence: Option<f64>,
    /// New stability value, if changing.
    pub stability: Option<f64>,
}

fn validate_unit(unit: &KnowledgeUnit) -> Result<(), KnowledgeError> {
    for (name, value) in [
        ("resonance", unit.resonance),
        ("coherence", unit.coherence),
        ("stability", unit.stability),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(KnowledgeError::InvalidField {
                field: name.to_string(),
                reason: format!("{value} is outside [0, 1]"),
            });
        }
    }
    if unit.tier != Tier::Shadow && unit.body.trim().is_empty() {
        return Err(KnowledgeError::InvariantViolation(
            "non-shadow knowledge units must have a non-empty body".to_string(),
        ));
    }
    for edge in &unit.edges {
        if edge.edge_type == EdgeType::Supports && edge.src == edge.dst {
            return Err(KnowledgeError::InvariantViolation(
                "a knowledge unit cannot support itself".to_string(),
            ));
        }
    }
    Ok(())
}

// ============================================================================
// SECTION: Knowledge Store
// ============================================================================

/// Input for creating a new [`KnowledgeUnit`].
#[derive(Debug, Clone)]
pub struct NewKnowledgeUnit {
    /// Short title.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Tier classification.
    pub tier: Tier,
    /// Free-form domain/tag set.
    pub tags: BTreeSet<String>,
    /// Initial resonance value.
    pub resonance: f64,
    /// Initial coherence value.
    pub coherence: f64,
    /// Initial stability value.
    pub stability: f64,
}

/// Holds knowledge units keyed by id with tier/tag/domain indices.
pub struct KnowledgeStore {
    store: BoundedIndexedStore<KnowledgeUnit>,
}

impl KnowledgeStore {
    /// Creates a new knowledge store with the given ceiling
    /// (`0` means unbounded; see [`DEFAULT_CEILING`]).
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        let store = BoundedIndexedStore::new(ceiling)
            .with_index("tier", |u: &KnowledgeUnit| vec![u.tier.as_str().to_string()])
            .with_index("tag", |u: &KnowledgeUnit| u.tags.iter().cloned().collect())
            .with_index("domain", |u: &KnowledgeUnit| u.tags.iter().cloned().collect());
        Self { store }
    }

    /// Creates and stores a new knowledge unit, validating invariants first.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::InvalidField`] or
    /// [`KnowledgeError::InvariantViolation`] if the input is invalid; no
    /// state is mutated in that case.
    pub fn create(
        &mut self,
        input: NewKnowledgeUnit,
        services: &Services,
    ) -> Result<KnowledgeUnit, KnowledgeError> {
        let now = services.now();
        let unit = KnowledgeUnit {
            id: services.new_id("ku"),
            title: input.title,
            body: input.body,
            tier: input.tier,
            tags: input.tags,
            resonance: input.resonance,
            coherence: input.coherence,
            stability: input.stability,
            edges: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        validate_unit(&unit)?;
        self.store.put(unit.clone());
        Ok(unit)
    }

    /// Returns the unit with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::NotFound`] if no such unit exists.
    pub fn get(&self, id: &str) -> Result<&KnowledgeUnit, KnowledgeError> {
        self.store.get(id).ok_or_else(|| KnowledgeError::NotFound { id: id.to_string() })
    }

    /// Lists every stored unit.
    pub fn list(&self) -> impl Iterator<Item = &KnowledgeUnit> {
        self.store.list()
    }

    /// Returns the ids of units tagged with `tier`.
    #[must_use]
    pub fn by_tier(&self, tier: Tier) -> BTreeSet<String> {
        self.store.by_index("tier", tier.as_str())
    }

    /// Returns the ids of units carrying `tag`.
    #[must_use]
    pub fn by_tag(&self, tag: &str) -> BTreeSet<String> {
        self.store.by_index("tag", tag)
    }

    /// Returns the ids of units tagged with `domain`.
    #[must_use]
    pub fn by_domain(&self, domain: &str) -> BTreeSet<String> {
        self.store.by_index("domain", domain)
    }

    /// Applies a partial field update, validating the result before
    /// committing. No state changes if validation fails.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::NotFound`] if the unit does not exist, or
    /// a validation error if the update would violate an invariant.
    pub fn update_fields(
        &mut self,
        id: &str,
        update: KnowledgeFieldUpdate,
        services: &Services,
    ) -> Result<KnowledgeUnit, KnowledgeError> {
        let mut candidate = self.get(id)?.clone();
        if let Some(title) = update.title {
            candidate.title = title;
        }
        if let Some(body) = update.body {
            candidate.body = body;
        }
        if let Some(tier) = update.tier {
            candidate.tier = tier;
        }
        if let Some(tags) = update.tags {
            candidate.tags = tags;
        }
        if let Some(resonance) = update.resonance {
            candidate.resonance = resonance;
        }
        if let Some(coherence) = update.coherence {
            candidate.coherence = coherence;
        }
        if let Some(stability) = update.stability {
            candidate.stability = stability;
        }
        candidate.updated_at = services.now();
        validate_unit(&candidate)?;
        self.store.put(candidate.clone());
        Ok(candidate)
    }

    /// Adds a typed edge from `src` to `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`KnowledgeError::NotFound`] if either endpoint is missing,
    /// or [`KnowledgeError::InvariantViolation`] for a self-supports edge.
    pub fn add_edge(
        &mut self,
        src: &str,
        dst: &str,
        edge_type: EdgeType,
        services: &Services,
    ) -> Result<(), KnowledgeError> {
        if self.store.get(dst).is_none() {
            return Err(KnowledgeError::NotFound { id: dst.to_string() });
        }
        let mut source = self.get(src)?.clone();
        source.edges.push(KnowledgeEdge {
            src: src.to_string(),
            dst: dst.to_string(),
            edge_type,
        });
        source.updated_at = services.now();
        validate_unit(&source)?;
        self.store.put(source);
        Ok(())
    }

    /// Returns every edge of `edge_type` touching `id` as either endpoint.
    #[must_use]
    pub fn edges_touching(&self, id: &str, edge_type: EdgeType) -> Vec<KnowledgeEdge> {
        self.store
            .list()
            .flat_map(|u| u.edges.iter())
            .filter(|e| e.edge_type == edge_type && (e.src == id || e.dst == id))
            .cloned()
            .collect()
    }

    /// Counts edges of `edge_type` arriving at `id` (i.e. `dst == id`).
    #[must_use]
    pub fn incoming_edge_count(&self, id: &str, edge_type: EdgeType) -> usize {
        self.store
            .list()
            .flat_map(|u| u.edges.iter())
            .filter(|e| e.edge_type == edge_type && e.dst == id)
            .count()
    }

    /// Returns the number of units currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns `true` if the store holds no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ManualClock;
    use std::sync::Arc;

    fn services() -> Services {
        Services::with_clock(Arc::new(ManualClock::new(Instant::from_millis(0))))
    }

    fn sample(body: &str) -> NewKnowledgeUnit {
        NewKnowledgeUnit {
            title: "title".to_string(),
            body: body.to_string(),
            tier: Tier::Regular,
            tags: BTreeSet::from(["physics".to_string()]),
            resonance: 0.5,
            coherence: 0.5,
            stability: 0.5,
        }
    }

    #[test]
    fn create_and_get_round_trips() {
        let services = services();
        let mut store = KnowledgeStore::new(0);
        let unit = store.create(sample("a body"), &services).unwrap();
        let fetched = store.get(&unit.id).unwrap();
        assert_eq!(fetched.title, "title");
    }

    #[test]
    fn rejects_out_of_range_quality_fields() {
        let services = services();
        let mut store = KnowledgeStore::new(0);
        let mut input = sample("a body");
        input.resonance = 1.5;
        let err = store.create(input, &services).unwrap_err();
        assert_eq!(err.code(), "invalid_field");
    }

    #[test]
    fn rejects_empty_body_for_non_shadow_tier() {
        let services = services();
        let mut store = KnowledgeStore::new(0);
        let err = store.create(sample(""), &services).unwrap_err();
        assert_eq!(err.code(), "invariant_violation");
    }

    #[test]
    fn allows_empty_body_for_shadow_tier() {
        let services = services();
        let mut store = KnowledgeStore::new(0);
        let mut input = sample("");
        input.tier = Tier::Shadow;
        assert!(store.create(input, &services).is_ok());
    }

    #[test]
    fn rejects_self_supports_edge() {
        let services = services();
        let mut store = KnowledgeStore::new(0);
        let unit = store.create(sample("a body"), &services).unwrap();
        let err = store.add_edge(&unit.id, &unit.id, EdgeType::Supports, &services).unwrap_err();
        assert_eq!(err.code(), "invariant_violation");
    }

    #[test]
    fn allows_cycles_in_supports_edges() {
        let services = services();
        let mut store = KnowledgeStore::new(0);
        let a = store.create(sample("a"), &services).unwrap();
        let b = store.create(sample("b"), &services).unwrap();
        store.add_edge(&a.id, &b.id, EdgeType::Supports, &services).unwrap();
        store.add_edge(&b.id, &a.id, EdgeType::Supports, &services).unwrap();
        assert_eq!(store.edges_touching(&a.id, EdgeType::Supports).len(), 2);
    }

    #[test]
    fn update_fields_rejects_invalid_partial_update_without_mutating() {
        let services = services();
        let mut store = KnowledgeStore::new(0);
        let unit = store.create(sample("a body"), &services).unwrap();
        let update = KnowledgeFieldUpdate {
            coherence: Some(2.0),
            ..Default::default()
        };
        assert!(store.update_fields(&unit.id, update, &services).is_err());
        assert_eq!(store.get(&unit.id).unwrap().coherence, 0.5);
    }

    #[test]
    fn fifo_eviction_respects_ceiling() {
        let services = services();
        let mut store = KnowledgeStore::new(2);
        let a = store.create(sample("a"), &services).unwrap();
        store.create(sample("b"), &services).unwrap();
        store.create(sample("c"), &services).unwrap();
        assert_eq!(store.len(), 2);
        assert!(store.get(&a.id).is_err());
    }
}
