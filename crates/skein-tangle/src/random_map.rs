//! Random-access set with uniform sampling
//!
//! Backs the fair tip pool: O(1) insert/remove/contains plus uniform random
//! sampling without replacement. Entries live in a dense vec; a side map
//! tracks each entry's slot so removal can swap with the last element.

use hashbrown::HashMap;
use rand::seq::SliceRandom;
use rand::Rng;
use std::hash::Hash;

/// A set supporting O(1) mutation and uniform random sampling.
#[derive(Clone, Debug, Default)]
pub struct RandomMap<K: Eq + Hash + Copy> {
    entries: Vec<K>,
    slots: HashMap<K, usize>,
}

impl<K: Eq + Hash + Copy> RandomMap<K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            slots: HashMap::new(),
        }
    }

    /// Insert an entry. Returns true iff it was not present before.
    pub fn insert(&mut self, key: K) -> bool {
        if self.slots.contains_key(&key) {
            return false;
        }
        self.slots.insert(key, self.entries.len());
        self.entries.push(key);
        true
    }

    /// Remove an entry. Returns true iff it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        let Some(slot) = self.slots.remove(key) else {
            return false;
        };
        let last = self.entries.len() - 1;
        self.entries.swap(slot, last);
        self.entries.pop();
        if slot < self.entries.len() {
            self.slots.insert(self.entries[slot], slot);
        }
        true
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.clone()
    }

    /// Sample one entry uniformly at random.
    pub fn random_entry<R: Rng>(&self, rng: &mut R) -> Option<K> {
        if self.entries.is_empty() {
            return None;
        }
        let idx = rng.gen_range(0..self.entries.len());
        Some(self.entries[idx])
    }

    /// Sample up to `count` distinct entries uniformly at random without
    /// replacement.
    pub fn random_unique_entries<R: Rng>(&self, count: usize, rng: &mut R) -> Vec<K> {
        if count == 0 || self.entries.is_empty() {
            return Vec::new();
        }
        self.entries
            .choose_multiple(rng, count.min(self.entries.len()))
            .copied()
            .collect()
    }
}
