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

//! Input-tensor encoding: one position becomes a `[planes, 8, 8]` float
//! volume, the batch dimension being added by the evaluator.
//!
//! The first 104 planes are 8 history frames of 13 planes each: the
//! mover's six piece types, the opponent's six, and a repetition
//! indicator. When the mover is black every piece plane is rotated 180
//! degrees, so the mover's pieces always start at the bottom of the grid.
//! Auxiliary planes (castling, the rule-50 counter, side to move, and a
//! trailing all-ones plane for extended layouts) follow.

use crate::base::{Board, Color, Game, Piece};

/// Planes per history frame.
const FRAME_PLANES: usize = 13;

/// Frames of history in the input.
const FRAMES: usize = 8;

/// The number of history planes before the auxiliary block.
pub const HISTORY_PLANES: usize = FRAMES * FRAME_PLANES;

/// The classic single-frame legacy layout.
pub const CLASSIC_PLANES: usize = 112;

/// The extended legacy layout, whose final plane is all ones.
pub const EXTENDED_PLANES: usize = 119;

/// Encode a game state into `planes * 64` floats, row-major by plane.
///
/// # Panics
///
/// Panics if `planes` is smaller than the 110 planes the fixed layout
/// occupies; supported models use 112 or 119.
#[must_use]
pub fn encode(game: &Game, planes: usize) -> Vec<f32> {
    assert!(planes >= HISTORY_PLANES + 6, "unsupported plane count {planes}");
    let mut out = vec![0.0f32; planes * 64];
    let mover = game.board().side_to_move;

    for frame in 0..FRAMES {
        // frames which predate the game or aged out stay all-zero
        let Some((board, _)) = game.history().get(frame) else {
            continue;
        };
        let base = frame * FRAME_PLANES;
        fill_piece_planes(&mut out, base, board, mover);
        if frame == 0 {
            let reps = game.repetitions().min(3) as f32 / 3.0;
            if reps > 0.0 {
                fill_plane(&mut out, base + 12, reps);
            }
        }
    }

    let board = game.board();
    let rights = [
        board.castle_rights.kingside(mover),
        board.castle_rights.queenside(mover),
        board.castle_rights.kingside(!mover),
        board.castle_rights.queenside(!mover),
    ];
    for (i, &held) in rights.iter().enumerate() {
        if held {
            fill_plane(&mut out, HISTORY_PLANES + i, 1.0);
        }
    }
    fill_plane(
        &mut out,
        HISTORY_PLANES + 4,
        f32::from(board.halfmove_clock.min(99)) / 99.0,
    );
    if mover == Color::White {
        fill_plane(&mut out, HISTORY_PLANES + 5, 1.0);
    }
    if planes >= EXTENDED_PLANES {
        fill_plane(&mut out, planes - 1, 1.0);
    }
    out
}

/// Write the twelve piece planes of one history frame: the mover's pieces
/// in plane order, then the opponent's, each rotated into the mover's
/// frame.
fn fill_piece_planes(out: &mut [f32], base: usize, board: &Board, mover: Color) {
    for (i, &piece) in Piece::ALL.iter().enumerate() {
        for (offset, color) in [(0, mover), (6, !mover)] {
            let plane = base + i + offset;
            for sq in board.pieces(color, piece) {
                let cell = match mover {
                    Color::White => sq.index(),
                    Color::Black => sq.flipped().index(),
                };
                out[plane * 64 + cell] = 1.0;
            }
        }
    }
}

/// Fill one whole plane with a constant.
fn fill_plane(out: &mut [f32], plane: usize, value: f32) {
    out[plane * 64..(plane + 1) * 64].fill(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Square;

    fn plane(out: &[f32], plane: usize) -> &[f32] {
        &out[plane * 64..(plane + 1) * 64]
    }

    #[test]
    fn classic_layout_shape() {
        let out = encode(&Game::new(), CLASSIC_PLANES);
        assert_eq!(out.len(), CLASSIC_PLANES * 64);
    }

    #[test]
    fn startpos_frame_zero() {
        let out = encode(&Game::new(), CLASSIC_PLANES);
        // white pawns on rank 2
        for file in 0..8 {
            assert_eq!(plane(&out, 0)[Square::from_coords(file, 1).index()], 1.0);
        }
        // opponent pawns appear on rank 7 of the mover-framed grid
        for file in 0..8 {
            assert_eq!(plane(&out, 6)[Square::from_coords(file, 6).index()], 1.0);
        }
        // mover king on e1
        assert_eq!(plane(&out, 5)[Square::E1.index()], 1.0);
        assert_eq!(plane(&out, 5).iter().sum::<f32>(), 1.0);
        // frames beyond the game start are all zero
        assert!(plane(&out, FRAME_PLANES).iter().all(|&x| x == 0.0));
        // no repetitions yet
        assert!(plane(&out, 12).iter().all(|&x| x == 0.0));
    }

    #[test]
    fn black_frames_are_rotated() {
        let mut game = Game::new();
        game.make_uci("e2e4").unwrap();
        let out = encode(&game, CLASSIC_PLANES);
        // the mover is black; its pawns sit on rank 7, rotated onto rank 2
        for file in 0..8 {
            assert_eq!(plane(&out, 0)[Square::from_coords(file, 1).index()], 1.0);
        }
        // the black king on e8 rotates onto d1
        assert_eq!(plane(&out, 5)[Square::D1.index()], 1.0);
        // white's e4 pawn rotates onto d5 in the opponent-pawn plane
        assert_eq!(plane(&out, 6)[Square::D5.index()], 1.0);
    }

    #[test]
    fn aux_planes() {
        let out = encode(&Game::new(), CLASSIC_PLANES);
        for i in 0..4 {
            assert!(plane(&out, HISTORY_PLANES + i).iter().all(|&x| x == 1.0));
        }
        assert!(plane(&out, HISTORY_PLANES + 4).iter().all(|&x| x == 0.0));
        // white to move
        assert!(plane(&out, HISTORY_PLANES + 5).iter().all(|&x| x == 1.0));
        // classic layout has no all-ones tail
        assert!(plane(&out, CLASSIC_PLANES - 1).iter().all(|&x| x == 0.0));

        let extended = encode(&Game::new(), EXTENDED_PLANES);
        assert!(plane(&extended, EXTENDED_PLANES - 1)
            .iter()
            .all(|&x| x == 1.0));
    }

    #[test]
    fn rule50_plane_scales() {
        let game =
            Game::from_fen("7k/5Q2/6K1/8/8/8/8/8 w - - 40 1").unwrap();
        let out = encode(&game, CLASSIC_PLANES);
        let expected = 40.0 / 99.0;
        assert!(plane(&out, HISTORY_PLANES + 4)
            .iter()
            .all(|&x| (x - expected).abs() < 1e-6));
    }

    #[test]
    fn repetition_plane_fires_after_shuffle() {
        let mut game = Game::new();
        for uci in ["g1f3", "g8f6", "f3g1", "f6g8"] {
            game.make_uci(uci).unwrap();
        }
        let out = encode(&game, CLASSIC_PLANES);
        let expected = 1.0 / 3.0;
        assert!(plane(&out, 12).iter().all(|&x| (x - expected).abs() < 1e-6));
    }

    #[test]
    fn history_frames_track_past_boards() {
        let mut game = Game::new();
        game.make_uci("e2e4").unwrap();
        game.make_uci("c7c5").unwrap();
        let out = encode(&game, CLASSIC_PLANES);
        // frame 1 is the position after e2e4: the mover there is white in
        // the current mover's (white's) frame, so its e4 pawn is plane 0
        assert_eq!(plane(&out, FRAME_PLANES)[Square::E4.index()], 1.0);
        // frame 2 is the starting position
        assert_eq!(plane(&out, 2 * FRAME_PLANES)[Square::E2.index()], 1.0);
        // frame 3 predates the game
        assert!(plane(&out, 3 * FRAME_PLANES).iter().all(|&x| x == 0.0));
    }
}
