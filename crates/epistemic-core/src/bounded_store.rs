// epistemic-core/src/bounded_store.rs
// ============================================================================
// Module: Bounded Indexed Store Primitive
// Description: Generic map-plus-secondary-indices container with FIFO
// eviction above a configured ceiling.
// Purpose: Give every downstream store (knowledge, evidence, outcomes,
// skills, ...) the same insert/index/evict semantics.
// Dependencies: std::collections
// ============================================================================

//! ## Overview
//! [`BoundedIndexedStore`] holds records keyed by a primary id, maintains an
//! arbitrary number of named secondary indices, and evicts the
//! oldest-inserted record once the ceiling is exceeded. Every downstream
//! store in this workspace composes one of these rather than re-implementing
//! indexing and eviction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::VecDeque;

// ============================================================================
// SECTION: Trait
// ============================================================================

/// A record that can live inside a [`BoundedIndexedStore`].
pub trait Indexed {
    /// Returns the record's primary id.
    fn primary_id(&self) -> &str;
}

/// A named secondary index: a pure function from record to an optional key.
///
/// Stored as a trait object so a store can hold a heterogeneous list of
/// index definitions keyed only by name. A record may participate in zero,
/// one, or many buckets of the same index (e.g. a knowledge unit's tag set
/// fans out to every tag it carries).
pub trait IndexKeyExtractor<R>: Send + Sync {
    /// Extracts the secondary keys for `record`; empty if it does not
    /// participate in this index.
    fn extract(&self, record: &R) -> Vec<String>;
}

impl<R, F> IndexKeyExtractor<R> for F
where
    F: Fn(&R) -> Vec<String> + Send + Sync,
{
    fn extract(&self, record: &R) -> Vec<String> {
        self(record)
    }
}

/// One named secondary index over `R`.
struct Index<R> {
    name: String,
    extractor: Box<dyn IndexKeyExtractor<R>>,
    /// key -> set of primary ids
    entries: BTreeMap<String, BTreeSet<String>>,
}

impl<R> Index<R> {
    fn insert(&mut self, record: &R) {
        for key in self.extractor.extract(record) {
            self.entries.entry(key).or_default().insert(record.primary_id().to_string());
        }
    }

    fn remove(&mut self, record: &R) {
        for key in self.extractor.extract(record) {
            if let Some(ids) = self.entries.get_mut(&key) {
                ids.remove(record.primary_id());
                if ids.is_empty() {
                    self.entries.remove(&key);
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Bounded Indexed Store
// ============================================================================

/// Map-plus-secondary-indices container with FIFO eviction above `ceiling`.
///
/// # Invariants
/// - Index lookups never return a stale id: every mutation updates the
///   primary map and every index together.
/// - Eviction removes the oldest-inserted surviving record, amortized O(1)
///   via the insertion-order queue.
pub struct BoundedIndexedStore<R: Indexed> {
    ceiling: usize,
    records: BTreeMap<String, R>,
    insertion_order: VecDeque<String>,
    indices: Vec<Index<R>>,
}

impl<R: Indexed> BoundedIndexedStore<R> {
    /// Creates an empty store with the given ceiling. A ceiling of `0` is
    /// treated as unbounded.
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            records: BTreeMap::new(),
            insertion_order: VecDeque::new(),
            indices: Vec::new(),
        }
    }

    /// Registers a secondary index. Must be called before any records are
    /// inserted so historical records are not missing from the index.
    pub fn with_index(
        mut self,
        name: impl Into<String>,
        extractor: impl IndexKeyExtractor<R> + 'static,
    ) -> Self {
        self.indices.push(Index {
            name: name.into(),
            extractor: Box::new(extractor),
            entries: BTreeMap::new(),
        });
        self
    }

    /// Inserts or replaces `record`, updating every index. Evicts the
    /// oldest record if the ceiling is now exceeded.
    ///
    /// Returns the id of any record evicted as a result of this insert.
    pub fn put(&mut self, record: R) -> Option<String> {
        let id = record.primary_id().to_string();
        if let Some(previous) = self.records.get(&id) {
            for index in &mut self.indices {
                index.remove(previous);
            }
        } else {
            self.insertion_order.push_back(id.clone());
        }
        for index in &mut self.indices {
            index.insert(&record);
        }
        self.records.insert(id, record);

        if self.ceiling > 0 && self.records.len() > self.ceiling {
            return self.evict_oldest();
        }
        None
    }

    /// Evicts the oldest-inserted record still present, purging it from
    /// every index. Returns its id.
    fn evict_oldest(&mut self) -> Option<String> {
        while let Some(candidate) = self.insertion_order.pop_front() {
            if let Some(record) = self.records.remove(&candidate) {
                for index in &mut self.indices {
                    index.remove(&record);
                }
                return Some(candidate);
            }
        }
        None
    }

    /// Returns the record with the given primary id, if present.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.get(id)
    }

    /// Returns a mutable reference to the record with the given primary id.
    ///
    /// Callers that mutate fields participating in an index must call
    /// [`Self::reindex`] afterward.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut R> {
        self.records.get_mut(id)
    }

    /// Rebuilds every index entry for `id` from its current field values.
    /// Call this after mutating a record returned by [`Self::get_mut`].
    pub fn reindex(&mut self, id: &str) {
        let Some(record) = self.records.get(id) else {
            return;
        };
        for index in &mut self.indices {
            for ids in index.entries.values_mut() {
                ids.remove(id);
            }
            index.entries.retain(|_, ids| !ids.is_empty());
            index.insert(record);
        }
    }

    /// Removes the record with the given primary id from the primary map
    /// and every index. Returns the removed record, if any.
    pub fn remove(&mut self, id: &str) -> Option<R> {
        let record = self.records.remove(id)?;
        for index in &mut self.indices {
            index.remove(&record);
        }
        Some(record)
    }

    /// Returns every id currently associated with `key` in the index named
    /// `name`. Returns an empty set if the index or key is unknown.
    #[must_use]
    pub fn by_index(&self, name: &str, key: &str) -> BTreeSet<String> {
        self.indices
            .iter()
            .find(|index| index.name == name)
            .and_then(|index| index.entries.get(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Lists every record currently stored, in primary-id order.
    pub fn list(&self) -> impl Iterator<Item = &R> {
        self.records.values()
    }

    /// Returns the number of records currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ============================================================================
// SECTION: Bounded History Buffer
// ============================================================================

/// Append-only FIFO buffer with a ceiling; on overflow, drops the oldest
/// half rather than evicting one entry at a time, matching the trim
/// semantics used for run history, audit trails, and weight-update logs
/// throughout this workspace.
#[derive(Debug, Clone, Default)]
pub struct BoundedHistory<T> {
    ceiling: usize,
    entries: VecDeque<T>,
}

impl<T> BoundedHistory<T> {
    /// Creates an empty history with the given ceiling.
    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            entries: VecDeque::new(),
        }
    }

    /// Appends an entry, trimming to half the ceiling if the ceiling is now
    /// exceeded.
    pub fn push(&mut self, entry: T) {
        self.entries.push_back(entry);
        if self.ceiling > 0 && self.entries.len() > self.ceiling {
            let drop_count = self.entries.len() - self.ceiling / 2;
            for _ in 0..drop_count {
                self.entries.pop_front();
            }
        }
    }

    /// Iterates the history oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Returns the number of entries currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the history is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the most recently pushed entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.entries.back()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Rec {
        id: String,
        tag: String,
    }

    impl Indexed for Rec {
        fn primary_id(&self) -> &str {
            &self.id
        }
    }

    fn rec(id: &str, tag: &str) -> Rec {
        Rec {
            id: id.to_string(),
            tag: tag.to_string(),
        }
    }

    #[test]
    fn put_get_and_index_lookup() {
        let mut store: BoundedIndexedStore<Rec> =
            BoundedIndexedStore::new(0).with_index("tag", |r: &Rec| vec![r.tag.clone()]);
        store.put(rec("a", "x"));
        store.put(rec("b", "x"));
        store.put(rec("c", "y"));

        assert_eq!(store.get("a").unwrap().tag, "x");
        let by_x = store.by_index("tag", "x");
        assert_eq!(by_x.len(), 2);
        assert!(by_x.contains("a") && by_x.contains("b"));
    }

    #[test]
    fn remove_purges_indices() {
        let mut store: BoundedIndexedStore<Rec> =
            BoundedIndexedStore::new(0).with_index("tag", |r: &Rec| vec![r.tag.clone()]);
        store.put(rec("a", "x"));
        store.remove("a");
        assert!(store.get("a").is_none());
        assert!(store.by_index("tag", "x").is_empty());
    }

    #[test]
    fn fifo_eviction_above_ceiling_keeps_indices_consistent() {
        let mut store: BoundedIndexedStore<Rec> =
            BoundedIndexedStore::new(2).with_index("tag", |r: &Rec| vec![r.tag.clone()]);
        store.put(rec("a", "x"));
        store.put(rec("b", "x"));
        store.put(rec("c", "x"));

        assert_eq!(store.len(), 2);
        assert!(store.get("a").is_none(), "oldest record should be evicted");
        assert_eq!(store.by_index("tag", "x").len(), 2);
        assert!(!store.by_index("tag", "x").contains("a"));
    }

    #[test]
    fn reindex_after_mutation_moves_record_between_buckets() {
        let mut store: BoundedIndexedStore<Rec> =
            BoundedIndexedStore::new(0).with_index("tag", |r: &Rec| vec![r.tag.clone()]);
        store.put(rec("a", "x"));
        if let Some(r) = store.get_mut("a") {
            r.tag = "y".to_string();
        }
        store.reindex("a");
        assert!(store.by_index("tag", "x").is_empty());
        assert!(store.by_index("tag", "y").contains("a"));
    }

    #[test]
    fn bounded_history_trims_to_half_on_overflow() {
        let mut history: BoundedHistory<u32> = BoundedHistory::new(10);
        for i in 0..11 {
            history.push(i);
        }
        assert_eq!(history.len(), 6);
        assert_eq!(*history.last().unwrap(), 10);
    }
}
