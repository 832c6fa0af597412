//! Case-insensitive string-keyed map.
//!
//! Keys are canonicalised to lowercase before every insert and lookup, so
//! `"ArcadiaComplete"` and `"arcadiacomplete"` address the same entry.
//! The spelling first used for a key is kept for dumps and saves.
//! Iteration order is sorted by canonical key, which keeps save output stable.

use std::collections::{btree_map, BTreeMap};

use crate::types::Count;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Slot<V> {
    name:  String,
    value: V,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiMap<V> {
    entries: BTreeMap<String, Slot<V>>,
}

/// A string-keyed integer table. Absent keys read as 0.
pub type CounterTable = CiMap<Count>;

impl<V> Default for CiMap<V> {
    fn default() -> Self {
        Self { entries: BTreeMap::new() }
    }
}

/// Canonical form of a key.
pub fn canonical(key: &str) -> String {
    key.to_lowercase()
}

impl<V> CiMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(&canonical(key)).map(|s| &s.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&canonical(key))
    }

    /// Create or overwrite. An existing entry keeps its original spelling.
    pub fn insert(&mut self, key: &str, value: V) {
        match self.entries.entry(canonical(key)) {
            btree_map::Entry::Occupied(mut slot) => slot.get_mut().value = value,
            btree_map::Entry::Vacant(slot) => {
                slot.insert(Slot { name: key.to_string(), value });
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(&canonical(key)).map(|s| s.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries as (original spelling, value), in canonical key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.values().map(|s| (s.name.as_str(), &s.value))
    }
}

impl CiMap<Count> {
    pub fn count(&self, key: &str) -> Count {
        self.get(key).copied().unwrap_or(0)
    }

    pub fn set_count(&mut self, key: &str, value: Count) {
        self.insert(key, value);
    }

    /// Same as `set_count(key, count(key) + 1)`. Returns the new value.
    pub fn increment(&mut self, key: &str) -> Count {
        let next = self.count(key).saturating_add(1);
        self.insert(key, next);
        next
    }
}
