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

//! Well-known FEN strings used across the test suite.

/// The "kiwipete" position, a standard move-generation stress test with
/// castling, pins, and en passant all in play.
pub const KIWIPETE_FEN: &str =
    "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

/// A rook endgame with checks and promotions close to the surface.
pub const ROOK_ENDGAME_FEN: &str = "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1";

/// A position where white can capture en passant on f6.
pub const EN_PASSANT_READY_FEN: &str =
    "rnbqkb1r/ppppp1pp/7n/4Pp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3";

/// A position with mutual en passant tension on d6.
pub const DOUBLE_PAWN_TENSION_FEN: &str =
    "rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 3";

/// White is ready to promote the f7-pawn.
pub const PROMOTION_READY_FEN: &str = "8/5P2/2k5/4K3/8/8/8/8 w - - 0 1";

/// The position immediately after white pulls off Scholar's Mate: black is
/// checkmated.
pub const SCHOLARS_MATE_FEN: &str =
    "rnbqk2r/pppp1Qpp/5n2/2b1p3/2B1P3/8/PPPP1PPP/RNB1K1NR b KQkq - 0 4";

/// A stalemate: black to move has no legal move and is not in check.
pub const STALEMATE_FEN: &str = "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1";

/// Two bare kings, the simplest legal position.
pub const TWO_KINGS_FEN: &str = "7k/8/8/8/8/8/8/K7 w - - 0 1";
