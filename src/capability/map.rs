//! Capability maps and the rank-based selection rule.

use crate::extension::Rank;
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// One extension's claim on a capability key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Candidate {
    /// Priority tier.
    pub rank: Rank,
    /// Capability version advertised by the extension.
    pub version: i32,
    /// Position of the extension in the loaded extension list.
    pub index: usize,
}

impl Candidate {
    /// Create a candidate.
    pub const fn new(rank: Rank, version: i32, index: usize) -> Self {
        Self {
            rank,
            version,
            index,
        }
    }
}

/// Map from a capability key to every candidate claiming it, in insertion
/// order.
///
/// Selection: the first inserted candidate wins, unless some candidate has
/// [`Rank::High`], in which case the first such candidate wins.
#[derive(Clone, Debug)]
pub struct CapabilityMap<K: Ord> {
    entries: BTreeMap<K, SmallVec<[Candidate; 2]>>,
}

impl<K: Ord> Default for CapabilityMap<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord> CapabilityMap<K> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate for `key`.
    pub fn insert(&mut self, key: K, candidate: Candidate) {
        self.entries.entry(key).or_default().push(candidate);
    }

    /// All candidates for `key`, in insertion order.
    pub fn candidates(&self, key: &K) -> &[Candidate] {
        self.entries.get(key).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// Pick the winning candidate for `key`.
    pub fn select(&self, key: &K) -> Option<Candidate> {
        let candidates = self.entries.get(key)?;
        candidates
            .iter()
            .find(|c| c.rank == Rank::High)
            .or_else(|| candidates.first())
            .copied()
    }

    /// Returns true if at least one candidate claims `key`.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over all keys with at least one candidate.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no key has a candidate.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Map holding exactly one candidate per scalar key.
///
/// The first registration for a key holds it. A later [`Rank::High`]
/// registration replaces the holder; a later [`Rank::Default`] one does not.
#[derive(Clone, Debug)]
pub struct LevelMap<K: Ord> {
    entries: BTreeMap<K, Candidate>,
}

impl<K: Ord> Default for LevelMap<K> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord> LevelMap<K> {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a candidate for `key`.
    pub fn insert(&mut self, key: K, candidate: Candidate) {
        match self.entries.entry(key) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                if candidate.rank == Rank::High {
                    slot.insert(candidate);
                }
            }
        }
    }

    /// The candidate holding `key`.
    pub fn select(&self, key: &K) -> Option<Candidate> {
        self.entries.get(key).copied()
    }

    /// Returns true if `key` is held.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over held keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.entries.keys()
    }

    /// Number of held keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no key is held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
