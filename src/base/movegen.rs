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

//! Move generation: pseudo-legal emission per piece type, plus the
//! legality filter.

use super::{attacks, Bitboard, Board, Color, Move, Piece, Square};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
/// The possible modes for move generation.
pub enum GenMode {
    /// Generate all pseudo-legal moves.
    All,
    /// Generate only captures (including en passant and capturing
    /// promotions).
    Captures,
}

/// Squares which must be empty for a kingside castle, per color.
const KINGSIDE_EMPTY: [Bitboard; 2] = [
    Bitboard::new(0x0000_0000_0000_0060),
    Bitboard::new(0x6000_0000_0000_0000),
];

/// Squares which must be empty for a queenside castle, per color.
const QUEENSIDE_EMPTY: [Bitboard; 2] = [
    Bitboard::new(0x0000_0000_0000_000E),
    Bitboard::new(0x0E00_0000_0000_0000),
];

#[must_use]
/// Generate the pseudo-legal moves of the side to move.
/// Pseudo-legal moves follow the movement rules but may leave the mover's
/// own king attacked; apply [`is_legal`] to filter them.
pub fn get_moves(board: &Board, mode: GenMode) -> Vec<Move> {
    let mut moves = Vec::with_capacity(48);
    let us = board.side_to_move;
    let occupancy = board.occupancy();
    let ours = board.occupancy_of(us);
    let theirs = board.occupancy_of(!us);
    // in captures mode, only moves landing on enemy material are kept
    let targets = match mode {
        GenMode::All => !ours,
        GenMode::Captures => theirs,
    };

    pawn_moves(board, mode, theirs, &mut moves);

    for from in board.pieces(us, Piece::Knight) {
        for to in attacks::knight_attacks(from) & targets {
            moves.push(Move::normal(from, to));
        }
    }
    for from in board.pieces(us, Piece::Bishop) {
        for to in attacks::bishop_attacks(from, occupancy) & targets {
            moves.push(Move::normal(from, to));
        }
    }
    for from in board.pieces(us, Piece::Rook) {
        for to in attacks::rook_attacks(from, occupancy) & targets {
            moves.push(Move::normal(from, to));
        }
    }
    for from in board.pieces(us, Piece::Queen) {
        for to in attacks::queen_attacks(from, occupancy) & targets {
            moves.push(Move::normal(from, to));
        }
    }
    for from in board.pieces(us, Piece::King) {
        for to in attacks::king_attacks(from) & targets {
            moves.push(Move::normal(from, to));
        }
    }

    if mode == GenMode::All {
        castle_moves(board, occupancy, &mut moves);
    }

    moves
}

/// Emit pawn pushes, captures, en passant, and promotions.
fn pawn_moves(board: &Board, mode: GenMode, theirs: Bitboard, moves: &mut Vec<Move>) {
    let us = board.side_to_move;
    let occupancy = board.occupancy();
    let (forward, start_rank, promo_rank): (i8, u8, u8) = match us {
        Color::White => (8, 1, 6),
        Color::Black => (-8, 6, 1),
    };

    for from in board.pieces(us, Piece::Pawn) {
        let promoting = from.rank() == promo_rank;

        // diagonal captures, including onto the en passant square
        let mut capture_targets = attacks::pawn_attacks(us, from) & theirs;
        for to in capture_targets {
            push_pawn_move(from, to, promoting, moves);
        }
        if let Some(ep) = board.ep_square {
            capture_targets = attacks::pawn_attacks(us, from);
            if capture_targets.contains(ep) {
                moves.push(Move::en_passant(from, ep));
            }
        }

        if mode == GenMode::Captures {
            continue;
        }

        // single push; a pawn always has a forward square since it cannot
        // stand on the back rank
        let Some(push) = from.offset(forward) else {
            continue;
        };
        if !occupancy.contains(push) {
            push_pawn_move(from, push, promoting, moves);
            // double push through two empty squares from the start rank
            if from.rank() == start_rank {
                if let Some(double) = push.offset(forward) {
                    if !occupancy.contains(double) {
                        moves.push(Move::double_push(from, double));
                    }
                }
            }
        }
    }
}

/// Emit one pawn move, expanding a promotion into its four piece choices.
fn push_pawn_move(from: Square, to: Square, promoting: bool, moves: &mut Vec<Move>) {
    if promoting {
        for piece in Piece::PROMOTABLE {
            moves.push(Move::promoting(from, to, piece));
        }
    } else {
        moves.push(Move::normal(from, to));
    }
}

/// Emit castles for which the right is held and the squares between king
/// and rook are empty.
/// Attack-safety of the king's path is deferred to the legality filter.
fn castle_moves(board: &Board, occupancy: Bitboard, moves: &mut Vec<Move>) {
    let us = board.side_to_move;
    let back = match us {
        Color::White => 0,
        Color::Black => 7,
    };
    if board.castle_rights.kingside(us) && (occupancy & KINGSIDE_EMPTY[us.index()]).is_empty() {
        moves.push(Move::castling(
            Square::from_coords(4, back),
            Square::from_coords(6, back),
        ));
    }
    if board.castle_rights.queenside(us) && (occupancy & QUEENSIDE_EMPTY[us.index()]).is_empty() {
        moves.push(Move::castling(
            Square::from_coords(4, back),
            Square::from_coords(2, back),
        ));
    }
}

#[must_use]
/// Determine whether a pseudo-legal move is legal: after playing it, the
/// mover's king must not be attacked.
///
/// A castle additionally requires that the king is not currently in check
/// and that the square the king passes through is not attacked.
pub fn is_legal(board: &Board, m: Move) -> bool {
    let us = board.side_to_move;
    if m.is_castle() {
        if board.in_check(us) {
            return false;
        }
        let transit = Square::from_coords(
            (m.from_square().file() + m.to_square().file()) / 2,
            m.from_square().rank(),
        );
        if board.square_attacked(transit, !us) {
            return false;
        }
    }
    let mut scratch = *board;
    scratch.make(m);
    match scratch.king_square(us) {
        Some(king) => !scratch.square_attacked(king, scratch.side_to_move),
        None => true,
    }
}

#[must_use]
/// Generate the legal moves of the side to move.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = get_moves(board, GenMode::All);
    moves.retain(|&m| is_legal(board, m));
    moves
}

#[must_use]
/// Determine whether the side to move has any legal move at all.
/// Cheaper than [`legal_moves`] when only mate/stalemate detection is
/// needed.
pub fn has_legal_moves(board: &Board) -> bool {
    get_moves(board, GenMode::All)
        .into_iter()
        .any(|m| is_legal(board, m))
}
