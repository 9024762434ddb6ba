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

//! State representations of boards, which contain piece positions and the
//! flags of a single position, but no game history.

use super::{attacks, zobrist, Bitboard, CastleRights, Color, Move, Piece, Square};

use std::fmt::{Display, Formatter};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
/// A representation of one position. Does not handle repetition detection;
/// that is the job of [`super::game::PositionHistory`].
pub struct Board {
    /// One occupancy bitboard per (color, piece type) pair, indexed by
    /// [`Piece::bb_index`]: white pawns through white kings, then black
    /// pawns through black kings.
    /// The twelve boards are pairwise disjoint at all times.
    pieces: [Bitboard; 12],
    /// The color of the player to move.
    pub side_to_move: Color,
    /// The square a pawn may capture onto in en passant, set only
    /// immediately after a double pawn push.
    pub ep_square: Option<Square>,
    /// The castling rights of both players.
    pub castle_rights: CastleRights,
    /// The number of plies since the last capture or pawn move.
    pub halfmove_clock: u16,
    /// The move number, starting at 1 and incremented after black moves.
    pub fullmove: u16,
    /// The Zobrist hash of this position, maintained incrementally.
    /// Always equal to the output of `fresh_hash()`.
    pub hash: u64,
}

#[derive(Copy, Clone, Debug)]
/// A record sufficient to restore a board to its exact pre-move state.
/// Owned by the caller for the duration of a search descent and discarded
/// afterwards.
pub struct Undo {
    prior: Board,
}

/// The FEN of the conventional starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

impl Board {
    #[must_use]
    /// Construct a board in the conventional starting position.
    pub fn new() -> Board {
        let mut board = Board {
            pieces: [
                Bitboard::new(0x0000_0000_0000_FF00), // white pawns
                Bitboard::new(0x0000_0000_0000_0042), // white knights
                Bitboard::new(0x0000_0000_0000_0024), // white bishops
                Bitboard::new(0x0000_0000_0000_0081), // white rooks
                Bitboard::new(0x0000_0000_0000_0008), // white queen
                Bitboard::new(0x0000_0000_0000_0010), // white king
                Bitboard::new(0x00FF_0000_0000_0000), // black pawns
                Bitboard::new(0x4200_0000_0000_0000), // black knights
                Bitboard::new(0x2400_0000_0000_0000), // black bishops
                Bitboard::new(0x8100_0000_0000_0000), // black rooks
                Bitboard::new(0x0800_0000_0000_0000), // black queen
                Bitboard::new(0x1000_0000_0000_0000), // black king
            ],
            side_to_move: Color::White,
            ep_square: None,
            castle_rights: CastleRights::ALL,
            halfmove_clock: 0,
            fullmove: 1,
            hash: 0,
        };
        board.hash = board.fresh_hash();
        board
    }

    /// Create a board from a FEN string.
    /// The halfmove-clock and fullmove fields are optional and default to 0
    /// and 1.
    ///
    /// # Errors
    ///
    /// Returns an `Err` describing the failure if the FEN has fewer than
    /// four fields, an invalid piece placement, or a bad side-to-move,
    /// castling, or en passant token.
    ///
    /// # Examples
    ///
    /// ```
    /// use sable::base::Board;
    ///
    /// let board = Board::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")?;
    /// assert_eq!(board, Board::new());
    /// # Ok::<(), String>(())
    /// ```
    pub fn from_fen(fen: &str) -> Result<Board, String> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(format!(
                "FEN `{fen}` has {} fields; at least 4 required",
                fields.len()
            ));
        }

        let mut pieces = [Bitboard::EMPTY; 12];
        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(format!("FEN board has {} ranks, expected 8", ranks.len()));
        }
        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                } else {
                    let (color, piece) = Piece::from_fen_char(c)
                        .ok_or_else(|| format!("invalid piece character `{c}`"))?;
                    if file >= 8 {
                        return Err(format!("rank `{rank_str}` overflows the board"));
                    }
                    pieces[piece.bb_index(color)].insert(Square::from_coords(file, rank));
                    file += 1;
                }
            }
            if file != 8 {
                return Err(format!("rank `{rank_str}` does not cover 8 files"));
            }
        }

        let side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            tok => return Err(format!("invalid side-to-move token `{tok}`")),
        };

        let mut rights = 0u8;
        if fields[2] != "-" {
            for c in fields[2].chars() {
                rights |= match c {
                    'K' => 1,
                    'Q' => 2,
                    'k' => 4,
                    'q' => 8,
                    _ => return Err(format!("invalid castling character `{c}`")),
                };
            }
        }

        let ep_square = match fields[3] {
            "-" => None,
            tok => {
                let sq: Square = tok.parse()?;
                if sq.rank() != 2 && sq.rank() != 5 {
                    return Err(format!("en passant square {sq} not on rank 3 or 6"));
                }
                Some(sq)
            }
        };

        let halfmove_clock = match fields.get(4) {
            Some(tok) => tok
                .parse::<u16>()
                .map_err(|_| format!("invalid halfmove clock `{tok}`"))?,
            None => 0,
        };
        let fullmove = match fields.get(5) {
            Some(tok) => tok
                .parse::<u16>()
                .map_err(|_| format!("invalid fullmove number `{tok}`"))?,
            None => 1,
        };

        let mut board = Board {
            pieces,
            side_to_move,
            ep_square,
            castle_rights: CastleRights::new(rights),
            halfmove_clock,
            fullmove,
            hash: 0,
        };
        board.hash = board.fresh_hash();
        Ok(board)
    }

    #[must_use]
    /// Serialize this board as a six-field FEN string.
    pub fn fen(&self) -> String {
        let mut out = String::new();
        for rank in (0..8).rev() {
            let mut empty_run = 0;
            for file in 0..8 {
                match self.piece_on(Square::from_coords(file, rank)) {
                    Some((color, piece)) => {
                        if empty_run > 0 {
                            out.push(char::from_digit(empty_run, 10).unwrap());
                            empty_run = 0;
                        }
                        out.push(piece.fen_char(color));
                    }
                    None => empty_run += 1,
                }
            }
            if empty_run > 0 {
                out.push(char::from_digit(empty_run, 10).unwrap());
            }
            if rank > 0 {
                out.push('/');
            }
        }

        out.push(' ');
        out.push(match self.side_to_move {
            Color::White => 'w',
            Color::Black => 'b',
        });

        out.push(' ');
        if self.castle_rights == CastleRights::NONE {
            out.push('-');
        } else {
            for (c, bit) in [('K', 0), ('Q', 1), ('k', 2), ('q', 3)] {
                if self.castle_rights.has_bit(bit) {
                    out.push(c);
                }
            }
        }

        match self.ep_square {
            Some(sq) => out.push_str(&format!(" {sq}")),
            None => out.push_str(" -"),
        }
        out.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove));
        out
    }

    #[must_use]
    /// Get the bitboard of one piece type of one color.
    pub fn pieces(&self, color: Color, piece: Piece) -> Bitboard {
        self.pieces[piece.bb_index(color)]
    }

    #[must_use]
    /// Get the bitboard at a raw index in 0..12 of the piece array.
    pub fn pieces_by_index(&self, index: usize) -> Bitboard {
        self.pieces[index]
    }

    #[must_use]
    /// Get the set of all occupied squares.
    pub fn occupancy(&self) -> Bitboard {
        self.pieces
            .iter()
            .fold(Bitboard::EMPTY, |acc, &bb| acc | bb)
    }

    #[must_use]
    /// Get the set of squares occupied by one color.
    pub fn occupancy_of(&self, color: Color) -> Bitboard {
        let base = color.index() * Piece::NUM;
        self.pieces[base..base + Piece::NUM]
            .iter()
            .fold(Bitboard::EMPTY, |acc, &bb| acc | bb)
    }

    #[must_use]
    /// Find the piece occupying a square, if any.
    pub fn piece_on(&self, sq: Square) -> Option<(Color, Piece)> {
        self.piece_index_on(sq).map(|idx| {
            (
                if idx < Piece::NUM {
                    Color::White
                } else {
                    Color::Black
                },
                Piece::from_index(idx % Piece::NUM),
            )
        })
    }

    /// Find the piece-array index of the piece occupying a square.
    fn piece_index_on(&self, sq: Square) -> Option<usize> {
        self.pieces.iter().position(|bb| bb.contains(sq))
    }

    #[must_use]
    /// Get the square of the given color's king, or `None` if that king has
    /// been captured (which only occurs transiently during legality
    /// filtering).
    pub fn king_square(&self, color: Color) -> Option<Square> {
        self.pieces(color, Piece::King).first()
    }

    #[must_use]
    /// Determine whether `sq` is attacked by any piece of color `by`.
    ///
    /// The pawn probe uses the mirror trick: a white pawn attacks `sq`
    /// exactly when a black pawn on `sq` would attack the white pawn's
    /// square, so the pattern of the opposite color is intersected with
    /// `by`'s pawns.
    pub fn square_attacked(&self, sq: Square, by: Color) -> bool {
        let occupancy = self.occupancy();
        let diagonals = self.pieces(by, Piece::Bishop) | self.pieces(by, Piece::Queen);
        let laterals = self.pieces(by, Piece::Rook) | self.pieces(by, Piece::Queen);

        (attacks::pawn_attacks(!by, sq) & self.pieces(by, Piece::Pawn)).has_any()
            || (attacks::knight_attacks(sq) & self.pieces(by, Piece::Knight)).has_any()
            || (attacks::king_attacks(sq) & self.pieces(by, Piece::King)).has_any()
            || (attacks::bishop_attacks(sq, occupancy) & diagonals).has_any()
            || (attacks::rook_attacks(sq, occupancy) & laterals).has_any()
    }

    #[must_use]
    /// Determine whether the given color's king is currently attacked.
    pub fn in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(k) => self.square_attacked(k, !color),
            None => false,
        }
    }

    /// Apply a pseudo-legal move to this board, returning a record which
    /// restores the pre-move state bit-identically when passed to
    /// [`Board::unmake`].
    ///
    /// # Panics
    ///
    /// Panics if there is no piece on the move's from-square.
    pub fn make(&mut self, m: Move) -> Undo {
        let undo = Undo { prior: *self };
        let mover = self.side_to_move;
        let from = m.from_square();
        let to = m.to_square();
        let moving_idx = self
            .piece_index_on(from)
            .expect("make called with an empty from-square");

        // Remove the captured piece, if any. For en passant the victim is
        // not on the to-square but one rank behind it.
        let capture_sq = if m.is_en_passant() {
            let behind = match mover {
                Color::White => -8,
                Color::Black => 8,
            };
            to.offset(behind).unwrap_or(to)
        } else {
            to
        };
        let captured_idx = if m.is_en_passant() {
            Some(Piece::Pawn.bb_index(!mover))
        } else {
            self.piece_index_on(to)
        };
        if let Some(idx) = captured_idx {
            self.pieces[idx].remove(capture_sq);
            self.hash ^= zobrist::piece_key(idx, capture_sq);
        }

        // Relocate the moving piece, swapping in the promotion piece at the
        // destination if applicable.
        self.pieces[moving_idx].remove(from);
        self.hash ^= zobrist::piece_key(moving_idx, from);
        let placed_idx = match m.promote_type() {
            Some(p) => p.bb_index(mover),
            None => moving_idx,
        };
        self.pieces[placed_idx].insert(to);
        self.hash ^= zobrist::piece_key(placed_idx, to);

        // A castle also relocates the rook: h-file to f-file on the king
        // side, a-file to d-file on the queen side.
        if m.is_castle() {
            let back = from.rank();
            let (rook_from, rook_to) = if to.file() == 6 {
                (Square::from_coords(7, back), Square::from_coords(5, back))
            } else {
                (Square::from_coords(0, back), Square::from_coords(3, back))
            };
            let rook_idx = Piece::Rook.bb_index(mover);
            self.pieces[rook_idx].remove(rook_from);
            self.pieces[rook_idx].insert(rook_to);
            self.hash ^= zobrist::piece_key(rook_idx, rook_from);
            self.hash ^= zobrist::piece_key(rook_idx, rook_to);
        }

        // Castle rights decay when the king or a rook leaves home, or when
        // anything is captured on a rook's home square.
        let new_rights = self.castle_rights.after_touch(from).after_touch(to);
        let changed = self.castle_rights.bits() ^ new_rights.bits();
        for bit in 0..4 {
            if changed & (1 << bit) != 0 {
                self.hash ^= zobrist::castle_key(bit);
            }
        }
        self.castle_rights = new_rights;

        // The en passant square exists only immediately after a double
        // push, on the square the pawn skipped.
        if let Some(ep) = self.ep_square {
            self.hash ^= zobrist::ep_key(ep.file());
        }
        self.ep_square = if m.is_double_push() {
            Some(Square::from_coords(from.file(), (from.rank() + to.rank()) / 2))
        } else {
            None
        };
        if let Some(ep) = self.ep_square {
            self.hash ^= zobrist::ep_key(ep.file());
        }

        let is_pawn_move = moving_idx % Piece::NUM == Piece::Pawn as usize;
        if is_pawn_move || captured_idx.is_some() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock += 1;
        }

        self.side_to_move = !mover;
        self.hash ^= zobrist::side_key();
        if self.side_to_move == Color::White {
            self.fullmove += 1;
        }

        undo
    }

    /// Restore this board to the state recorded by a previous
    /// [`Board::make`].
    pub fn unmake(&mut self, undo: Undo) {
        *self = undo.prior;
    }

    #[must_use]
    /// Recompute the Zobrist hash of this position from scratch.
    /// `self.hash` must always equal this value; the incremental updates in
    /// `make` keep it that way.
    pub fn fresh_hash(&self) -> u64 {
        let mut hash = 0;
        for (idx, bb) in self.pieces.iter().enumerate() {
            for sq in *bb {
                hash ^= zobrist::piece_key(idx, sq);
            }
        }
        if self.side_to_move == Color::Black {
            hash ^= zobrist::side_key();
        }
        for bit in 0..4 {
            if self.castle_rights.has_bit(bit) {
                hash ^= zobrist::castle_key(bit);
            }
        }
        if let Some(ep) = self.ep_square {
            hash ^= zobrist::ep_key(ep.file());
        }
        hash
    }
}

impl Default for Board {
    fn default() -> Board {
        Board::new()
    }
}

impl Display for Board {
    /// Draw the board as an 8x8 character grid, rank 8 first.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for rank in (0..8).rev() {
            for file in 0..8 {
                let c = match self.piece_on(Square::from_coords(file, rank)) {
                    Some((color, piece)) => piece.fen_char(color),
                    None => '.',
                };
                write!(f, "{c} ")?;
            }
            writeln!(f)?;
        }
        write!(f, "{} to move", match self.side_to_move {
            Color::White => "white",
            Color::Black => "black",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::fens;
    use crate::base::movegen;

    /// Check the structural invariants of a board: the twelve bitboards are
    /// pairwise disjoint, and the incremental hash agrees with a fresh one.
    fn validate(board: &Board) {
        let mut seen = Bitboard::EMPTY;
        for idx in 0..12 {
            let bb = board.pieces_by_index(idx);
            assert!(
                (seen & bb).is_empty(),
                "piece boards overlap in position {}",
                board.fen()
            );
            seen |= bb;
        }
        assert_eq!(seen, board.occupancy());
        assert_eq!(board.hash, board.fresh_hash(), "stale hash in {}", board.fen());
    }

    #[test]
    fn startpos_matches_fen() {
        let board = Board::from_fen(START_FEN).unwrap();
        assert_eq!(board, Board::new());
        validate(&board);
    }

    #[test]
    fn fen_round_trip() {
        for fen in [
            START_FEN,
            fens::KIWIPETE_FEN,
            fens::ROOK_ENDGAME_FEN,
            fens::EN_PASSANT_READY_FEN,
        ] {
            let board = Board::from_fen(fen).unwrap();
            assert_eq!(board.fen(), fen);
            // property: re-parsing the emitted FEN preserves the hash
            assert_eq!(Board::from_fen(&board.fen()).unwrap().hash, board.hash);
        }
    }

    #[test]
    fn malformed_fens_rejected() {
        // fewer than four fields
        assert!(Board::from_fen("8/8/8/8/8/8/8/8 w -").is_err());
        // invalid piece character
        assert!(Board::from_fen("rnbqkbnr/ppppxppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
        // bad side-to-move token
        assert!(Board::from_fen("8/8/8/8/8/8/8/8 x - - 0 1").is_err());
        // short rank
        assert!(Board::from_fen("rnbqkbnr/ppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
    }

    #[test]
    fn make_unmake_restores_bit_identically() {
        for fen in [
            START_FEN,
            fens::KIWIPETE_FEN,
            fens::ROOK_ENDGAME_FEN,
            fens::EN_PASSANT_READY_FEN,
            fens::PROMOTION_READY_FEN,
        ] {
            let board = Board::from_fen(fen).unwrap();
            for m in movegen::get_moves(&board, movegen::GenMode::All) {
                let mut scratch = board;
                let undo = scratch.make(m);
                validate(&scratch);
                scratch.unmake(undo);
                assert_eq!(scratch, board, "undo of {m} broke {fen}");
            }
        }
    }

    #[test]
    fn en_passant_removes_the_bypassing_pawn() {
        let mut board = Board::from_fen(fens::EN_PASSANT_READY_FEN).unwrap();
        let m = Move::en_passant(Square::E5, Square::F6);
        board.make(m);
        assert_eq!(board.piece_on(Square::F5), None);
        assert_eq!(
            board.piece_on(Square::F6),
            Some((Color::White, Piece::Pawn))
        );
    }

    #[test]
    fn castle_moves_the_rook() {
        let mut board = Board::from_fen(fens::KIWIPETE_FEN).unwrap();
        board.make(Move::castling(Square::E1, Square::G1));
        assert_eq!(
            board.piece_on(Square::F1),
            Some((Color::White, Piece::Rook))
        );
        assert_eq!(board.piece_on(Square::H1), None);
        assert!(!board.castle_rights.kingside(Color::White));
        assert!(!board.castle_rights.queenside(Color::White));
    }

    #[test]
    fn rook_capture_clears_opponent_right() {
        // the b2 bishop takes the h8 rook along the long diagonal
        let mut board =
            Board::from_fen("rnbqk2r/pppppp1p/8/8/8/8/PBPPPPPP/RNBQK1NR w KQkq - 0 1").unwrap();
        board.make(Move::normal(Square::B2, Square::H8));
        assert!(!board.castle_rights.kingside(Color::Black));
        assert!(board.castle_rights.queenside(Color::Black));
    }

    #[test]
    fn clocks_follow_the_rules() {
        let mut board = Board::new();
        board.make(Move::normal(Square::G1, Square::F3));
        assert_eq!(board.halfmove_clock, 1);
        assert_eq!(board.fullmove, 1);
        board.make(Move::double_push(Square::D7, Square::D5));
        assert_eq!(board.halfmove_clock, 0);
        assert_eq!(board.fullmove, 2);
        assert_eq!(board.ep_square, Some(Square::D6));
        board.make(Move::normal(Square::B1, Square::C3));
        assert_eq!(board.ep_square, None);
    }

    #[test]
    fn attack_queries() {
        let board = Board::new();
        assert!(board.square_attacked(Square::F3, Color::White));
        assert!(board.square_attacked(Square::E2, Color::White));
        assert!(!board.square_attacked(Square::E4, Color::White));
        assert!(board.square_attacked(Square::F6, Color::Black));
        assert!(!board.in_check(Color::White));

        let checked = Board::from_fen(fens::SCHOLARS_MATE_FEN).unwrap();
        assert!(checked.in_check(Color::Black));
    }
}
