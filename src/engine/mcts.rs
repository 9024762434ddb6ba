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

//! The Monte-Carlo tree search.
//!
//! Each simulation clones the root game state, descends by the PUCT rule
//! while applying virtual loss, expands the leaf through the network
//! evaluator, and backs the value up the descended path with alternating
//! sign. A node's statistics are always from the perspective of the player
//! to move at that node, so selection negates the child's mean value when
//! scoring it for the parent.

use super::{config::EngineConfig, limit::SearchLimit, node::Node, node::NodePool};
use crate::base::{movegen, Game, Move};
use crate::net::{evaluator::Evaluator, policy, NetError};

use std::{sync::Arc, thread, time::Duration};

/// The virtual loss subtracted from a node when a simulation passes
/// through it, discouraging concurrent descents into the same subtree.
const VIRTUAL_LOSS: f32 = 0.3;

/// Dirichlet concentration for root noise.
const NOISE_ALPHA: f64 = 0.3;

/// Mixing weight of root noise into the root priors.
const NOISE_EPSILON: f32 = 0.25;

/// Root noise is injected only when the root has fewer legal moves than
/// this.
const NOISE_MOVE_CUTOFF: usize = 20;

/// Added to the prior mass before normalizing, so a position whose legal
/// moves all received zero policy weight does not divide by zero.
/// Small against even the few-move positions whose whole legal mass is a
/// couple of slots of a uniform policy.
const PRIOR_EPSILON: f32 = 1e-8;

/// A hard cap on descent depth. The windowed history hash can alias a
/// shuffling line back onto an ancestor node, turning the DAG cyclic; a
/// descent that deep is scored as a draw instead of spinning.
const MAX_DESCENT: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// How much searching one `go` is entitled to.
pub enum SearchBudget {
    /// A fixed total number of simulations, split across the workers.
    Visits(u32),
    /// A wall-clock budget, polled between simulations.
    Timed(Duration),
    /// Run until an explicit stop.
    Infinite,
}

/// One search: borrows the node pool, the evaluator, and the
/// configuration it runs under.
pub struct Searcher<'a> {
    pub pool: &'a NodePool,
    pub evaluator: &'a Evaluator,
    pub config: &'a EngineConfig,
}

impl Searcher<'_> {
    /// Search the given state and return the most-visited root move, or
    /// `None` if the root has no legal move.
    pub fn search(&self, root: &Game, budget: SearchBudget, limit: &SearchLimit) -> Option<Move> {
        limit.start(match budget {
            SearchBudget::Timed(duration) => Some(duration),
            _ => None,
        });
        let root_key = root.history_hash();

        // the first simulation expands the root; noise can then perturb
        // the fresh priors before the workers race off
        self.simulate(root).ok()?;
        self.inject_root_noise(root_key);

        let threads = self.config.threads.max(1);
        match budget {
            SearchBudget::Visits(visits) => {
                // one simulation is already spent on the root expansion
                let remaining = visits.max(1) - 1;
                let base = remaining / threads as u32;
                let extra = remaining % threads as u32;
                thread::scope(|s| {
                    for t in 0..threads as u32 {
                        let count = base + u32::from(t < extra);
                        s.spawn(move || {
                            for _ in 0..count {
                                if self.simulate(root).is_err() {
                                    break;
                                }
                            }
                        });
                    }
                });
            }
            SearchBudget::Timed(_) | SearchBudget::Infinite => {
                thread::scope(|s| {
                    for _ in 0..threads {
                        s.spawn(move || {
                            while !limit.is_over() {
                                if self.simulate(root).is_err() {
                                    break;
                                }
                                limit.update_time();
                            }
                        });
                    }
                });
            }
        }

        self.best_move(root_key)
    }

    /// Run one simulation: descend, expand or score the leaf, and back the
    /// value up the path.
    fn simulate(&self, root: &Game) -> Result<(), NetError> {
        let mut game = *root;
        let mut node = self.pool.get_or_insert(game.history_hash());
        let mut path: Vec<Arc<Node>> = Vec::new();
        let mut fresh = false;

        loop {
            let snapshot = {
                let mut data = node.lock();
                data.visits += 1;
                data.total_value -= VIRTUAL_LOSS;
                data.mean_value = data.total_value / data.visits as f32;
                if data.children.is_empty() {
                    fresh = data.visits == 1;
                    None
                } else {
                    Some((data.visits, data.children.clone()))
                }
            };
            let Some((parent_visits, children)) = snapshot else {
                break;
            };
            if path.len() >= MAX_DESCENT {
                break;
            }

            // score the snapshot outside the parent's lock
            let sqrt_parent = (parent_visits as f32).sqrt();
            let mut best: Option<(Move, u64, f32)> = None;
            for (m, key) in children {
                let child = self.pool.get_or_insert(key);
                let (child_visits, child_mean, prior) = {
                    let data = child.lock();
                    (data.visits, data.mean_value, data.prior)
                };
                let exploration =
                    self.config.cpuct * prior * sqrt_parent / (1 + child_visits) as f32;
                // the child's mean is from its own mover's view; negate it
                // for the parent making the choice
                let score = -child_mean + exploration;
                // strict comparison keeps the first-encountered child on ties
                if best.map_or(true, |(_, _, best_score)| score > best_score) {
                    best = Some((m, key, score));
                }
            }
            let Some((m, key, _)) = best else {
                break;
            };
            game.make(m);
            node = self.pool.get_or_insert(key);
            path.push(node.clone());
        }

        let mut value = if fresh {
            self.expand(&game, &node)?
        } else {
            terminal_value(&game)
        };

        // back-propagation; the leaf is the last element of the path
        let mut nodes = path.iter().rev();
        if fresh {
            // expansion replaced the leaf's statistics wholesale, virtual
            // loss included
            nodes.next();
        } else if let Some(leaf) = nodes.next() {
            let mut data = leaf.lock();
            data.total_value += value + VIRTUAL_LOSS;
            data.mean_value = data.total_value / data.visits as f32;
        }
        for ancestor in nodes {
            value = -value;
            let mut data = ancestor.lock();
            data.total_value += value + VIRTUAL_LOSS;
            data.mean_value = data.total_value / data.visits as f32;
        }
        Ok(())
    }

    /// Expand a freshly visited leaf: evaluate it, intern its children,
    /// and seed their priors from the policy head.
    /// Terminal leaves are scored directly and get no children.
    fn expand(&self, game: &Game, node: &Arc<Node>) -> Result<f32, NetError> {
        let board = game.board();
        let legal = movegen::legal_moves(board);
        if legal.is_empty() {
            let value = if board.in_check(board.side_to_move) {
                -1.0
            } else {
                0.0
            };
            return Ok(settle(node, value, Vec::new()));
        }
        if board.halfmove_clock >= 100 {
            return Ok(settle(node, 0.0, Vec::new()));
        }

        let evaluation = self.evaluator.evaluate(game)?;
        let mover = board.side_to_move;
        let mut children = Vec::with_capacity(legal.len());
        let mut priors = Vec::with_capacity(legal.len());
        for m in legal {
            let mut child_board = *board;
            child_board.make(m);
            let key = game.history().child_hash(child_board.hash);
            let prior = policy::encode(mover, m).map_or(0.0, |slot| evaluation.policy[slot]);
            children.push((m, key));
            priors.push(prior);
        }

        let mass: f32 = priors.iter().sum::<f32>() + PRIOR_EPSILON;
        for (&(_, key), &prior) in children.iter().zip(&priors) {
            self.pool.get_or_insert(key).lock().prior = prior / mass;
        }
        Ok(settle(node, evaluation.value, children))
    }

    /// Mix Dirichlet noise into the root children's priors when the root
    /// is narrow enough to need the exploration help.
    fn inject_root_noise(&self, root_key: u64) {
        let Some(root) = self.pool.get(root_key) else {
            return;
        };
        let children = root.lock().children.clone();
        if children.is_empty() || children.len() >= NOISE_MOVE_CUTOFF {
            return;
        }
        let rng = fastrand::Rng::new();
        let noise = dirichlet(&rng, NOISE_ALPHA, children.len());
        for ((_, key), noise_part) in children.into_iter().zip(noise) {
            if let Some(child) = self.pool.get(key) {
                let mut data = child.lock();
                data.prior =
                    (1.0 - NOISE_EPSILON) * data.prior + NOISE_EPSILON * noise_part as f32;
            }
        }
    }

    /// Pick the most-visited root child, first encountered winning ties.
    fn best_move(&self, root_key: u64) -> Option<Move> {
        let root = self.pool.get(root_key)?;
        let children = root.lock().children.clone();
        let mut best: Option<(Move, u32)> = None;
        for (m, key) in children {
            let visits = self.pool.get(key).map_or(0, |node| node.visits());
            if best.map_or(true, |(_, best_visits)| visits > best_visits) {
                best = Some((m, visits));
            }
        }
        best.map(|(m, _)| m)
    }
}

/// Overwrite a leaf's statistics with its first real evaluation and
/// publish its children. Returns the value for back-propagation.
fn settle(node: &Arc<Node>, value: f32, children: Vec<(Move, u64)>) -> f32 {
    let mut data = node.lock();
    data.visits = 1;
    data.total_value = value;
    data.mean_value = value;
    data.children = children;
    value
}

/// Score a childless, already-visited leaf: a mate is a loss for the
/// mover, and stalemate, the 50-move rule, or a depth-capped shuffle are
/// draws.
fn terminal_value(game: &Game) -> f32 {
    let board = game.board();
    if !movegen::has_legal_moves(board) {
        if board.in_check(board.side_to_move) {
            return -1.0;
        }
        return 0.0;
    }
    0.0
}

/// Draw a Dirichlet(alpha) sample of the given length.
fn dirichlet(rng: &fastrand::Rng, alpha: f64, len: usize) -> Vec<f64> {
    let mut sample: Vec<f64> = (0..len).map(|_| sample_gamma(rng, alpha)).collect();
    let sum: f64 = sample.iter().sum();
    if sum <= 0.0 {
        return vec![1.0 / len as f64; len];
    }
    for x in &mut sample {
        *x /= sum;
    }
    sample
}

/// Marsaglia-Tsang gamma sampling. Shapes below one are boosted through
/// `Gamma(alpha) = Gamma(alpha + 1) * U^(1/alpha)`.
fn sample_gamma(rng: &fastrand::Rng, alpha: f64) -> f64 {
    if alpha < 1.0 {
        return sample_gamma(rng, alpha + 1.0) * positive_uniform(rng).powf(1.0 / alpha);
    }
    let d = alpha - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = sample_normal(rng);
        let v = (1.0 + c * x).powi(3);
        if v <= 0.0 {
            continue;
        }
        let u = positive_uniform(rng);
        if u < 1.0 - 0.0331 * x.powi(4) {
            return d * v;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v + v.ln()) {
            return d * v;
        }
    }
}

/// A standard normal deviate, by Box-Muller.
fn sample_normal(rng: &fastrand::Rng) -> f64 {
    let u1 = positive_uniform(rng);
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// A uniform deviate in (0, 1], safe to take logarithms of.
fn positive_uniform(rng: &fastrand::Rng) -> f64 {
    loop {
        let u = rng.f64();
        if u > 0.0 {
            return u;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::fens;
    use crate::net::UniformNetwork;

    fn fixture(threads: usize) -> (NodePool, Evaluator, EngineConfig) {
        let pool = NodePool::new();
        let evaluator = Evaluator::new(Arc::new(UniformNetwork::classic()), 10_000);
        let config = EngineConfig {
            threads,
            ..EngineConfig::new()
        };
        (pool, evaluator, config)
    }

    #[test]
    fn fixed_visits_distribute_by_puct() {
        let (pool, evaluator, config) = fixture(1);
        let searcher = Searcher {
            pool: &pool,
            evaluator: &evaluator,
            config: &config,
        };
        let game = Game::new();
        let limit = SearchLimit::new();
        let best = searcher.search(&game, SearchBudget::Visits(256), &limit);
        assert!(best.is_some());

        let root = pool.get(game.history_hash()).unwrap();
        let (visits, children) = {
            let data = root.lock();
            (data.visits, data.children.clone())
        };
        assert_eq!(visits, 256);
        assert_eq!(children.len(), 20);

        // with a zero-value, uniform-prior stub the PUCT rule spreads
        // visits evenly: every child within one of every other, summing to
        // all simulations except the root expansion
        let counts: Vec<u32> = children
            .iter()
            .map(|&(_, key)| pool.get(key).unwrap().visits())
            .collect();
        assert_eq!(counts.iter().sum::<u32>(), 255);
        let (min, max) = (
            counts.iter().min().unwrap(),
            counts.iter().max().unwrap(),
        );
        assert!(max - min <= 1, "uneven visit spread: {counts:?}");
    }

    #[test]
    fn multithreaded_visits_add_up() {
        let (pool, evaluator, config) = fixture(4);
        let searcher = Searcher {
            pool: &pool,
            evaluator: &evaluator,
            config: &config,
        };
        let game = Game::new();
        let limit = SearchLimit::new();
        let best = searcher.search(&game, SearchBudget::Visits(256), &limit);
        assert!(best.is_some());
        let root = pool.get(game.history_hash()).unwrap();
        assert_eq!(root.visits(), 256);
    }

    #[test]
    fn mate_has_no_best_move() {
        let (pool, evaluator, config) = fixture(1);
        let searcher = Searcher {
            pool: &pool,
            evaluator: &evaluator,
            config: &config,
        };
        let game = Game::from_fen(fens::SCHOLARS_MATE_FEN).unwrap();
        let limit = SearchLimit::new();
        let best = searcher.search(&game, SearchBudget::Visits(32), &limit);
        assert_eq!(best, None);
    }

    #[test]
    fn finding_the_mate_in_one() {
        let (pool, evaluator, config) = fixture(2);
        let searcher = Searcher {
            pool: &pool,
            evaluator: &evaluator,
            config: &config,
        };
        let game = Game::from_fen("3k4/R7/1R6/5K2/8/8/8/8 w - - 0 1").unwrap();
        let limit = SearchLimit::new();
        let best = searcher
            .search(&game, SearchBudget::Visits(2_000), &limit)
            .unwrap();
        assert!(movegen::legal_moves(game.board()).contains(&best));
        // Rb8 is the only mate in one; the search should focus there
        assert_eq!(best.to_string(), "b6b8");
    }

    #[test]
    fn timed_search_stops() {
        let (pool, evaluator, config) = fixture(2);
        let searcher = Searcher {
            pool: &pool,
            evaluator: &evaluator,
            config: &config,
        };
        let game = Game::new();
        let limit = SearchLimit::new();
        let best = searcher.search(
            &game,
            SearchBudget::Timed(Duration::from_millis(50)),
            &limit,
        );
        assert!(best.is_some());
    }

    #[test]
    fn root_noise_keeps_priors_normalized() {
        // two bare kings: three legal moves, well under the noise cutoff
        let (pool, evaluator, config) = fixture(1);
        let searcher = Searcher {
            pool: &pool,
            evaluator: &evaluator,
            config: &config,
        };
        let game = Game::from_fen(fens::TWO_KINGS_FEN).unwrap();
        let limit = SearchLimit::new();
        let best = searcher.search(&game, SearchBudget::Visits(64), &limit);
        assert!(best.is_some());

        let root = pool.get(game.history_hash()).unwrap();
        let children = root.lock().children.clone();
        let prior_sum: f32 = children
            .iter()
            .map(|&(_, key)| pool.get(key).unwrap().lock().prior)
            .sum();
        assert!((prior_sum - 1.0).abs() < 1e-3, "prior mass {prior_sum}");
    }

    #[test]
    fn gamma_sampler_matches_moments() {
        let rng = fastrand::Rng::with_seed(7);
        for alpha in [0.3, 1.0, 4.5] {
            let n = 20_000;
            let mean: f64 = (0..n).map(|_| sample_gamma(&rng, alpha)).sum::<f64>() / n as f64;
            // Gamma(alpha, 1) has mean alpha
            assert!(
                (mean - alpha).abs() < 0.1,
                "gamma({alpha}) sample mean {mean}"
            );
        }
    }

    #[test]
    fn dirichlet_sums_to_one() {
        let rng = fastrand::Rng::with_seed(11);
        let sample = dirichlet(&rng, NOISE_ALPHA, 12);
        assert_eq!(sample.len(), 12);
        let sum: f64 = sample.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(sample.iter().all(|&x| x >= 0.0));
    }
}
