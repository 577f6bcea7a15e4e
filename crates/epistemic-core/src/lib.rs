// epistemic-core/src/lib.rs
// ============================================================================
// Crate: epistemic-core
// Description: Identifiers/clock, the bounded indexed store primitive, the
// knowledge store, the evidence store, and the truth lifecycle.
// ============================================================================

//! Foundational data model for the epistemic coordination engine: opaque
//! identifiers and a monotonic clock, the generic bounded-and-indexed store
//! every higher-level store composes, the knowledge store itself, the
//! evidence store and its status-derivation function, and the per-unit truth
//! lifecycle.

pub mod bounded_store;
pub mod error;
pub mod evidence;
pub mod ids;
pub mod knowledge;
pub mod truth;

pub use bounded_store::BoundedHistory;
pub use bounded_store::BoundedIndexedStore;
pub use bounded_store::Indexed;
pub use bounded_store::IndexKeyExtractor;
pub use error::EvidenceError;
pub use error::KnowledgeError;
pub use error::TruthError;
pub use evidence::Direction;
pub use evidence::EpistemicStatus;
pub use evidence::EvidenceRecord;
pub use evidence::EvidenceStore;
pub use evidence::EvidenceType;
pub use evidence::MaintenanceEntry;
pub use ids::Clock;
pub use ids::IdGenerator;
pub use ids::Instant;
pub use ids::ManualClock;
pub use ids::Services;
pub use ids::SystemClock;
pub use knowledge::EdgeType;
pub use knowledge::KnowledgeEdge;
pub use knowledge::KnowledgeFieldUpdate;
pub use knowledge::KnowledgeStore;
pub use knowledge::KnowledgeUnit;
pub use knowledge::NewKnowledgeUnit;
pub use knowledge::Tier;
pub use truth::StagnationFlag;
pub use truth::TruthLifecycle;
pub use truth::TruthState;
pub use truth::TruthTransition;
