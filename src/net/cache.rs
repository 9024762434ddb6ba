/*
  Sable, a UCI-compatible chess engine driven by neural-guided tree search.
  Copyright (C) 2024 The Sable authors (see AUTHORS.md file)

  Sable is free software: you can redistribute it and/or modify
  it under the terms of the GNU General Public License as published by
  the Free Software Foundation, either version 3 of the License, or
  (at your option) any later version.

  Sable is distributed in the hope that it will be useful,
  but WITHOUT ANY WARRANTY; without even the implied warranty of
  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
  GNU General Public License for more details.

  You should have received a copy of the GNU General Public License
  along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

//! A bounded concurrent cache from history-aware position hashes to
//! finished evaluations.

use super::Evaluation;

use nohash_hasher::IntMap;

use std::sync::{Arc, RwLock};

/// The default soft capacity of the cache.
pub const DEFAULT_CAPACITY: usize = 100_000;

/// When the cache overflows, one entry in this many is kept out of every
/// four, i.e. roughly a quarter of the map is dropped.
const EVICTION_STRIDE: usize = 4;

/// A concurrent map from position keys to shared evaluations.
///
/// The capacity is soft: an insertion that overflows it first evicts a
/// fraction of arbitrary entries. Nothing observable depends on which
/// entries are chosen.
pub struct EvalCache {
    map: RwLock<IntMap<u64, Arc<Evaluation>>>,
    capacity: usize,
}

impl EvalCache {
    #[must_use]
    /// Create a cache with the given soft capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> EvalCache {
        assert!(capacity > 0, "cache capacity must be positive");
        EvalCache {
            map: RwLock::new(IntMap::default()),
            capacity,
        }
    }

    #[must_use]
    /// Look up the evaluation for a position key.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn get(&self, key: u64) -> Option<Arc<Evaluation>> {
        self.map.read().unwrap().get(&key).cloned()
    }

    /// Store an evaluation for a position key. Inserts are idempotent: an
    /// existing entry for the key is kept.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn insert(&self, key: u64, eval: Arc<Evaluation>) {
        let mut map = self.map.write().unwrap();
        if map.len() >= self.capacity {
            let mut i = 0;
            map.retain(|_, _| {
                i += 1;
                i % EVICTION_STRIDE != 0
            });
        }
        map.entry(key).or_insert(eval);
    }

    #[must_use]
    /// The number of cached evaluations.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    #[must_use]
    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached evaluation.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn clear(&self) {
        self.map.write().unwrap().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy(value: f32) -> Arc<Evaluation> {
        Arc::new(Evaluation {
            value,
            policy: Vec::new(),
        })
    }

    #[test]
    fn get_returns_inserted() {
        let cache = EvalCache::new(16);
        assert!(cache.get(42).is_none());
        cache.insert(42, dummy(0.5));
        assert_eq!(cache.get(42).unwrap().value, 0.5);
    }

    #[test]
    fn inserts_are_idempotent() {
        let cache = EvalCache::new(16);
        cache.insert(7, dummy(0.1));
        cache.insert(7, dummy(0.9));
        assert_eq!(cache.get(7).unwrap().value, 0.1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn overflow_evicts_a_fraction() {
        let cache = EvalCache::new(100);
        for key in 0..100 {
            cache.insert(key, dummy(0.0));
        }
        assert_eq!(cache.len(), 100);
        cache.insert(100, dummy(0.0));
        // a quarter of the old entries went away, the new one landed
        assert_eq!(cache.len(), 76);
        assert!(cache.get(100).is_some());
    }

    #[test]
    fn clear_empties() {
        let cache = EvalCache::new(16);
        cache.insert(1, dummy(0.0));
        cache.clear();
        assert!(cache.is_empty());
    }
}
