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

//! Perft, the move-generation correctness oracle: count the exact number of
//! legal game-tree leaves at a fixed depth.

use super::{movegen, Board};

use std::time::Instant;

#[allow(dead_code)]
/// Run a perft on the given position and print node count and speed.
///
/// # Panics
///
/// Panics if `fen` fails to parse.
pub fn perft(fen: &str, depth: u8) -> u64 {
    let board = Board::from_fen(fen).unwrap();
    let tic = Instant::now();
    let num_nodes = perft_search(&board, depth);
    let elapsed = tic.elapsed().as_secs_f64();
    println!(
        "perft {depth}: {num_nodes} nodes in {elapsed:.2}s ({:.0} nodes/sec)",
        num_nodes as f64 / elapsed
    );
    num_nodes
}

/// The core counting recursion. Counts legal moves only.
fn perft_search(board: &Board, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = movegen::legal_moves(board);
    if depth == 1 {
        return moves.len() as u64;
    }
    let mut total = 0;
    for m in moves {
        let mut scratch = *board;
        scratch.make(m);
        total += perft_search(&scratch, depth - 1);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::board::START_FEN;
    use crate::base::fens;

    fn perft_assistant(fen: &str, node_counts: &[u64]) {
        for (depth, &expected) in node_counts.iter().enumerate() {
            assert_eq!(expected, perft(fen, depth as u8), "depth {depth} of {fen}");
        }
    }

    #[test]
    fn perft_start_position() {
        perft_assistant(START_FEN, &[1, 20, 400, 8_902, 197_281]);
    }

    #[test]
    fn perft_kiwipete() {
        perft_assistant(fens::KIWIPETE_FEN, &[1, 48, 2_039, 97_862, 4_085_603]);
    }

    #[test]
    fn perft_rook_endgame() {
        perft_assistant(fens::ROOK_ENDGAME_FEN, &[1, 14, 191, 2_812, 43_238]);
    }

    #[test]
    fn perft_en_passant_tension() {
        perft_assistant(
            fens::DOUBLE_PAWN_TENSION_FEN,
            &[1, 31, 868, 27_336, 788_456],
        );
    }
}
