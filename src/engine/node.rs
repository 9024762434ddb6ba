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

//! Search-tree nodes and the process-wide pool that interns them.
//!
//! The tree is a DAG: transpositions share nodes. Nodes are therefore
//! addressed by history-aware position hash through a concurrent map, never
//! by owning pointers, and released en masse by [`NodePool::clear`].

use crate::base::Move;

use nohash_hasher::IntMap;

use std::sync::{Arc, Mutex, MutexGuard, RwLock};

#[derive(Clone, Debug, Default)]
/// The mutable statistics of one node, all guarded by the node's mutex.
pub struct NodeData {
    /// Visit count, including virtual visits of in-flight simulations.
    pub visits: u32,
    /// Total backed-up value, from the perspective of the player to move
    /// at this node.
    pub total_value: f32,
    /// Mean value `total_value / visits`, kept in step with its parts.
    pub mean_value: f32,
    /// The prior probability assigned by the parent's expansion, possibly
    /// perturbed by root noise.
    pub prior: f32,
    /// Outgoing edges: each legal move and the pool key of the node it
    /// leads to. Empty until the node is expanded, and kept in
    /// first-encounter order for deterministic tie-breaking.
    pub children: Vec<(Move, u64)>,
}

#[derive(Debug, Default)]
/// One search-tree node. All statistics live behind a single fine-grained
/// lock; selection snapshots what it needs under the lock and scores
/// outside it.
pub struct Node {
    data: Mutex<NodeData>,
}

impl Node {
    /// Lock this node's statistics.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn lock(&self) -> MutexGuard<'_, NodeData> {
        self.data.lock().unwrap()
    }

    #[must_use]
    /// Read the current visit count.
    pub fn visits(&self) -> u32 {
        self.lock().visits
    }
}

#[derive(Default)]
/// The process-wide map from history-aware position hash to node.
pub struct NodePool {
    map: RwLock<IntMap<u64, Arc<Node>>>,
}

impl NodePool {
    #[must_use]
    /// Create an empty pool.
    pub fn new() -> NodePool {
        NodePool::default()
    }

    #[must_use]
    /// Look up the node for a key, if it has been interned.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn get(&self, key: u64) -> Option<Arc<Node>> {
        self.map.read().unwrap().get(&key).cloned()
    }

    #[must_use]
    /// Get the node for a key, interning a fresh one if none exists.
    /// Get-or-create is atomic: two racing callers observe the same node.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn get_or_insert(&self, key: u64) -> Arc<Node> {
        if let Some(node) = self.get(key) {
            return node;
        }
        self.map
            .write()
            .unwrap()
            .entry(key)
            .or_default()
            .clone()
    }

    #[must_use]
    /// The number of interned nodes.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn len(&self) -> usize {
        self.map.read().unwrap().len()
    }

    #[must_use]
    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every node. Called on a new game or a new position.
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

    #[test]
    fn get_or_insert_is_stable() {
        let pool = NodePool::new();
        let a = pool.get_or_insert(17);
        let b = pool.get_or_insert(17);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn fresh_nodes_are_zeroed() {
        let pool = NodePool::new();
        let node = pool.get_or_insert(3);
        let data = node.lock();
        assert_eq!(data.visits, 0);
        assert_eq!(data.total_value, 0.0);
        assert!(data.children.is_empty());
    }

    #[test]
    fn clear_empties_the_pool() {
        let pool = NodePool::new();
        let _ = pool.get_or_insert(1);
        let _ = pool.get_or_insert(2);
        pool.clear();
        assert!(pool.is_empty());
        assert!(pool.get(1).is_none());
    }
}
