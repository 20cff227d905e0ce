use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};

/// A set-valued map from each key to the distinct values stored under it.
///
/// Keys and values are kept ordered, so every traversal (keys, then each
/// key's values) comes out the same way for the same contents.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SetMultimap<K: Ord, V: Ord> {
    entries: BTreeMap<K, BTreeSet<V>>,
    len: usize,
}

impl<K: Ord, V: Ord> Default for SetMultimap<K, V> {
    fn default() -> Self {
        SetMultimap { entries: BTreeMap::new(), len: 0 }
    }
}

impl<K: Ord, V: Ord> SetMultimap<K, V> {

    pub fn new() -> SetMultimap<K, V> {
        Self::default()
    }

    /// Inserts `value` under `key`. Returns false if the pair was already present.
    pub fn add(&mut self, key: K, value: V) -> bool {
        let inserted = self.entries
            .entry(key)
            .or_insert_with(BTreeSet::new)
            .insert(value);
        if inserted { self.len += 1; }
        inserted
    }

    /// The values stored under `key`, empty if there are none.
    pub fn get<Q>(&self, key: &Q) -> impl Iterator<Item=&V>
        where K: Borrow<Q>, Q: Ord + ?Sized
    {
        self.entries.get(key).into_iter().flatten()
    }

    pub fn contains<Q>(&self, key: &Q, value: &V) -> bool
        where K: Borrow<Q>, Q: Ord + ?Sized
    {
        self.entries.get(key)
            .map(|values| values.contains(value))
            .unwrap_or(false)
    }

    /// Total number of (key, value) pairs.
    pub fn size(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item=&K> {
        self.entries.keys()
    }

    /// Every (key, value) pair, ordered by key then by value.
    pub fn iter(&self) -> impl Iterator<Item=(&K, &V)> {
        self.entries.iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key, value)))
    }

    /// Moves every pair of `other` into this map.
    pub fn extend(&mut self, other: SetMultimap<K, V>) {
        for (key, values) in other.entries {
            let target = self.entries.entry(key).or_insert_with(BTreeSet::new);
            for value in values {
                if target.insert(value) { self.len += 1; }
            }
        }
    }
}
