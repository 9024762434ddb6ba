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

//! The search engine: tree, evaluator, and the plumbing that binds them to
//! the UCI shell.

pub mod config;
pub mod limit;
pub mod mcts;
pub mod node;
pub mod time;

use crate::base::{Game, Move};
use crate::net::{cache, evaluator::Evaluator, Network};

use config::EngineConfig;
use limit::SearchLimit;
use mcts::{SearchBudget, Searcher};
use node::NodePool;

use std::sync::Arc;

/// One engine instance: a node pool, a running evaluator over a network
/// session, and the active search limit.
///
/// The instance is recreated on `ucinewgame` and when options change; the
/// evaluator worker is joined when the instance drops, before the network
/// session is released.
pub struct Engine {
    config: EngineConfig,
    pool: NodePool,
    evaluator: Evaluator,
    limit: SearchLimit,
}

impl Engine {
    #[must_use]
    /// Construct an engine over the given network session.
    pub fn new(network: Arc<dyn Network>, config: EngineConfig) -> Engine {
        Engine {
            config,
            pool: NodePool::new(),
            evaluator: Evaluator::new(network, cache::DEFAULT_CAPACITY),
            limit: SearchLimit::new(),
        }
    }

    #[must_use]
    /// The configuration this engine runs under.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Drop the whole search tree. Called for `ucinewgame` and whenever
    /// the position changes.
    pub fn clear_tree(&self) {
        self.pool.clear();
    }

    /// Request that the current search stop at the next simulation
    /// boundary.
    pub fn stop(&self) {
        self.limit.stop();
    }

    /// Search a game state under the given budget and return the best
    /// move, or `None` when the position has no legal move.
    pub fn search(&self, game: &Game, budget: SearchBudget) -> Option<Move> {
        let searcher = Searcher {
            pool: &self.pool,
            evaluator: &self.evaluator,
            config: &self.config,
        };
        searcher.search(game, budget, &self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::fens;
    use crate::net::UniformNetwork;

    use std::thread;
    use std::time::Duration;

    fn test_engine(threads: usize) -> Engine {
        let config = EngineConfig {
            threads,
            ..EngineConfig::new()
        };
        Engine::new(Arc::new(UniformNetwork::classic()), config)
    }

    #[test]
    fn returns_a_legal_move() {
        let engine = test_engine(2);
        let game = Game::new();
        let best = engine.search(&game, SearchBudget::Visits(128)).unwrap();
        assert!(crate::base::movegen::legal_moves(game.board()).contains(&best));
    }

    #[test]
    fn mated_position_yields_none() {
        let engine = test_engine(1);
        let game = Game::from_fen(fens::SCHOLARS_MATE_FEN).unwrap();
        assert_eq!(engine.search(&game, SearchBudget::Visits(16)), None);
    }

    #[test]
    fn stop_ends_an_infinite_search() {
        let engine = Arc::new(test_engine(2));
        let game = Game::new();
        let handle = {
            let engine = engine.clone();
            thread::spawn(move || engine.search(&game, SearchBudget::Infinite))
        };
        thread::sleep(Duration::from_millis(100));
        engine.stop();
        let best = handle.join().unwrap();
        assert!(best.is_some());
    }

    #[test]
    fn clear_tree_forgets_old_positions() {
        let engine = test_engine(1);
        let game = Game::new();
        let _ = engine.search(&game, SearchBudget::Visits(32));
        assert!(!engine.pool.is_empty());
        engine.clear_tree();
        assert!(engine.pool.is_empty());
    }
}
