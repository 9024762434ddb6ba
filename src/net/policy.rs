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

//! The policy-index codec: a bijection between moves and the 1,858 slots
//! of the network's policy head.
//!
//! Slots are enumerated in white's frame: every queen-ray destination from
//! every square (1,456 slots), every knight destination (336), and the
//! under-promotions to knight, bishop, and rook (66). Promotion to a queen
//! rides the plain from/to slot of the same geometry, as the pawn push or
//! capture it is.
//!
//! A black move is mirrored into white's frame by rotating both of its
//! squares 180 degrees before the table lookup; a decoded entry is rotated
//! back. The index itself is never mirrored, so one convention holds in
//! both directions.

use crate::base::{Board, Color, Move, Piece, Square};

use once_cell::sync::Lazy;

use std::collections::HashMap;

/// The number of slots in the policy head.
pub const POLICY_SIZE: usize = 1858;

/// One slot: from-square, to-square, and under-promotion piece, all in
/// white's frame.
type Slot = (Square, Square, Option<Piece>);

/// Pack a slot into a table key.
fn pack(from: Square, to: Square, promote: Option<Piece>) -> u32 {
    let code = promote.map_or(0, |p| p as u32);
    (from.index() as u32) | ((to.index() as u32) << 6) | (code << 12)
}

struct PolicyMap {
    /// Slot contents by index: the decode direction.
    slots: Vec<Slot>,
    /// Index by packed slot: the encode direction.
    index: HashMap<u32, u16>,
}

/// Queen-ray file and rank steps, then knight jumps, in enumeration order.
const RAY_STEPS: [(i8, i8); 8] = [
    (0, 1),
    (1, 1),
    (1, 0),
    (1, -1),
    (0, -1),
    (-1, -1),
    (-1, 0),
    (-1, 1),
];
const KNIGHT_STEPS: [(i8, i8); 8] = [
    (1, 2),
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
];

static MAP: Lazy<PolicyMap> = Lazy::new(|| {
    let mut slots = Vec::with_capacity(POLICY_SIZE);

    for from_idx in 0..64u8 {
        let from = Square::new(from_idx);
        let (file, rank) = (from.file() as i8, from.rank() as i8);
        for (df, dr) in RAY_STEPS {
            for dist in 1..8 {
                let (f, r) = (file + df * dist, rank + dr * dist);
                if !(0..8).contains(&f) || !(0..8).contains(&r) {
                    break;
                }
                slots.push((from, Square::from_coords(f as u8, r as u8), None));
            }
        }
        for (df, dr) in KNIGHT_STEPS {
            let (f, r) = (file + df, rank + dr);
            if (0..8).contains(&f) && (0..8).contains(&r) {
                slots.push((from, Square::from_coords(f as u8, r as u8), None));
            }
        }
    }

    // under-promotions: a pawn on rank 7 stepping or capturing onto rank 8
    for file in 0..8i8 {
        let from = Square::from_coords(file as u8, 6);
        for df in [-1, 0, 1] {
            let f = file + df;
            if !(0..8).contains(&f) {
                continue;
            }
            let to = Square::from_coords(f as u8, 7);
            for promote in [Piece::Knight, Piece::Bishop, Piece::Rook] {
                slots.push((from, to, Some(promote)));
            }
        }
    }

    debug_assert_eq!(slots.len(), POLICY_SIZE);
    let index = slots
        .iter()
        .enumerate()
        .map(|(i, &(from, to, promote))| (pack(from, to, promote), i as u16))
        .collect();
    PolicyMap { slots, index }
});

#[must_use]
/// Encode a move played by `mover` as its policy-head slot, or `None` for a
/// move with no slot. Every standard chess move has one.
pub fn encode(mover: Color, m: Move) -> Option<usize> {
    let (mut from, mut to) = (m.from_square(), m.to_square());
    if mover == Color::Black {
        from = from.flipped();
        to = to.flipped();
    }
    // queen promotions share the plain slot of their from/to pair
    let promote = m.promote_type().filter(|&p| p != Piece::Queen);
    MAP.index.get(&pack(from, to, promote)).map(|&i| i as usize)
}

#[must_use]
/// Decode a policy slot back into a move on the given board, rebuilding
/// the tags (double push, en passant, castle, queen promotion) that the
/// slot geometry does not carry.
///
/// Returns `None` for an out-of-range index or a slot with no mover piece
/// on its from-square.
pub fn decode(board: &Board, index: usize) -> Option<Move> {
    let &(from, to, promote) = MAP.slots.get(index)?;
    let (from, to) = match board.side_to_move {
        Color::White => (from, to),
        Color::Black => (from.flipped(), to.flipped()),
    };
    let (color, piece) = board.piece_on(from)?;
    if color != board.side_to_move {
        return None;
    }
    if let Some(p) = promote {
        return (piece == Piece::Pawn).then(|| Move::promoting(from, to, p));
    }
    Some(match piece {
        Piece::Pawn if to.rank() == 0 || to.rank() == 7 => {
            Move::promoting(from, to, Piece::Queen)
        }
        Piece::Pawn if from.rank().abs_diff(to.rank()) == 2 => Move::double_push(from, to),
        Piece::Pawn if from.file() != to.file() && board.piece_on(to).is_none() => {
            Move::en_passant(from, to)
        }
        Piece::King if from.file().abs_diff(to.file()) == 2 => Move::castling(from, to),
        _ => Move::normal(from, to),
    })
}
