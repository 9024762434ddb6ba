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

//! Game states, which pair a board with the recent position history the
//! network input and the transposition keys depend on.

use super::{board::Undo, movegen, Board, Move};

/// The number of recent positions retained by a [`PositionHistory`].
pub const HISTORY_LEN: usize = 8;

/// The number of recent positions mixed into the history-aware hash.
const HASH_DEPTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// A circular buffer of the last eight positions and their Zobrist hashes.
/// Slot T-0 is the current position; insertion order is significant.
pub struct PositionHistory {
    /// The snapshots, with their boards' Zobrist hashes.
    slots: [(Board, u64); HISTORY_LEN],
    /// The slot holding the current position.
    current: usize,
    /// How many positions have ever been pushed; slots beyond this count
    /// hold pre-start filler and are reported as missing.
    total: usize,
}

impl PositionHistory {
    #[must_use]
    /// Create a history seeded with a single starting position.
    pub fn new(start: Board) -> PositionHistory {
        let mut history = PositionHistory {
            slots: [(start, start.hash); HISTORY_LEN],
            current: 0,
            total: 0,
        };
        history.push(start);
        history
    }

    /// Record a new current position.
    pub fn push(&mut self, board: Board) {
        self.current = (self.current + 1) % HISTORY_LEN;
        self.slots[self.current] = (board, board.hash);
        self.total += 1;
    }

    #[must_use]
    /// Get the current position.
    pub fn current(&self) -> &Board {
        &self.slots[self.current].0
    }

    #[must_use]
    /// Get the position from `t` moves ago, or `None` if it predates the
    /// game start or has aged out of the buffer.
    pub fn get(&self, t: usize) -> Option<&(Board, u64)> {
        if t >= HISTORY_LEN || t >= self.total {
            return None;
        }
        Some(&self.slots[(self.current + HISTORY_LEN - t) % HISTORY_LEN])
    }

    #[must_use]
    /// Count how many of the last seven retained positions have the same
    /// Zobrist hash as `board`.
    pub fn count_repetitions(&self, board: &Board) -> u32 {
        (1..HISTORY_LEN)
            .filter_map(|t| self.get(t))
            .filter(|(_, hash)| *hash == board.hash)
            .count() as u32
    }

    #[must_use]
    /// Compute the history-aware hash of the current position: the XOR of
    /// the last four slot hashes, each multiplied by its recency weight.
    ///
    /// Two states with equal boards but different recent histories hash
    /// differently with overwhelming probability, which keeps them separate
    /// in the transposition table and the evaluation cache.
    pub fn history_hash(&self) -> u64 {
        let mut hash = 0;
        for t in 0..HASH_DEPTH {
            if let Some((_, slot_hash)) = self.get(t) {
                hash ^= slot_hash.wrapping_mul(t as u64 + 1);
            }
        }
        hash
    }

    #[must_use]
    /// Compute the history-aware hash this buffer would report after a
    /// board with hash `child_hash` was pushed, without mutating the
    /// buffer.
    ///
    /// Used while probing child positions during tree expansion, where a
    /// real push would overwrite the oldest retained slot.
    pub fn child_hash(&self, child_hash: u64) -> u64 {
        let mut hash = child_hash;
        for t in 0..HASH_DEPTH - 1 {
            if let Some((_, slot_hash)) = self.get(t) {
                hash ^= slot_hash.wrapping_mul(t as u64 + 2);
            }
        }
        hash
    }
}

#[derive(Clone, Copy, Debug)]
/// A full game state: the current board plus the recent history the
/// network input planes and history-aware hashing require.
pub struct Game {
    board: Board,
    history: PositionHistory,
}

impl Game {
    #[must_use]
    /// Create a game in the conventional starting position.
    pub fn new() -> Game {
        Game::from_board(Board::new())
    }

    #[must_use]
    /// Create a game whose history begins at the given position.
    pub fn from_board(board: Board) -> Game {
        Game {
            board,
            history: PositionHistory::new(board),
        }
    }

    /// Create a game from a FEN string.
    ///
    /// # Errors
    ///
    /// Returns an `Err` describing the failure if the FEN does not parse.
    pub fn from_fen(fen: &str) -> Result<Game, String> {
        Ok(Game::from_board(Board::from_fen(fen)?))
    }

    #[must_use]
    /// Get the current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    /// Get the position history, with the current board in slot T-0.
    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    /// Apply a move to the board and record the new position in the
    /// history.
    pub fn make(&mut self, m: Move) -> Undo {
        let undo = self.board.make(m);
        self.history.push(self.board);
        undo
    }

    /// Apply a move given in UCI long algebraic notation, validating its
    /// legality first.
    ///
    /// # Errors
    ///
    /// Returns an `Err` describing the failure if the string does not parse
    /// against the current board or names an illegal move. The game state
    /// is unchanged on error.
    pub fn make_uci(&mut self, uci: &str) -> Result<(), String> {
        let m = Move::from_uci(uci, &self.board)?;
        let pseudo = movegen::get_moves(&self.board, movegen::GenMode::All);
        if !pseudo.contains(&m) || !movegen::is_legal(&self.board, m) {
            return Err(format!("move `{uci}` is not legal here"));
        }
        self.make(m);
        Ok(())
    }

    #[must_use]
    /// Get the history-aware hash of the current state, the key used for
    /// tree nodes and evaluation-cache entries.
    pub fn history_hash(&self) -> u64 {
        self.history.history_hash()
    }

    #[must_use]
    /// Count repetitions of the current position within the retained
    /// history.
    pub fn repetitions(&self) -> u32 {
        self.history.count_repetitions(&self.board)
    }
}

impl Default for Game {
    fn default() -> Game {
        Game::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::fens;

    #[test]
    fn history_starts_with_one_slot() {
        let game = Game::new();
        assert_eq!(game.history().get(0).map(|(b, _)| *b), Some(*game.board()));
        assert!(game.history().get(1).is_none());
        assert!(game.history().get(7).is_none());
    }

    #[test]
    fn slots_age_out_after_eight() {
        let mut game = Game::new();
        // shuffle knights for ten plies
        for uci in [
            "g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6", "f3g1", "f6g8", "g1f3", "g8f6",
        ] {
            game.make_uci(uci).unwrap();
        }
        assert!(game.history().get(7).is_some());
        assert!(game.history().get(8).is_none());
    }

    #[test]
    fn repetitions_counted_in_window() {
        let mut game = Game::new();
        assert_eq!(game.repetitions(), 0);
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            game.make_uci(uci).unwrap();
        }
        // back at the start position: one earlier occurrence in the window
        assert_eq!(game.repetitions(), 1);
    }

    #[test]
    fn illegal_uci_moves_are_rejected() {
        let mut game = Game::new();
        assert!(game.make_uci("e2e5").is_err());
        assert!(game.make_uci("e7e5").is_err());
        assert!(game.make_uci("e2e4").is_ok());
    }

    #[test]
    fn same_board_different_history_distinct_hashes() {
        // shuffle the knights out and back: the board returns to the start
        // position, but the recent history does not
        let mut a = Game::new();
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            a.make_uci(uci).unwrap();
        }
        let b = Game::new();
        assert_eq!(b.board().hash, a.board().hash);
        assert_ne!(b.history_hash(), a.history_hash());
    }

    #[test]
    fn child_hash_matches_a_real_push() {
        let mut game = Game::from_fen(fens::KIWIPETE_FEN).unwrap();
        let m = Move::from_uci("e2a6", game.board()).unwrap();
        let mut probe = *game.board();
        probe.make(m);
        let predicted = game.history().child_hash(probe.hash);
        game.make(m);
        assert_eq!(predicted, game.history_hash());
    }
}
