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

//! Hash key generation for boards.
//!
//! Keys are drawn once from a fixed seed, so hashes are stable across runs
//! and across processes. This stability is part of the engine's external
//! contract.

use super::Square;

use once_cell::sync::Lazy;

/// The seed from which every key is derived. Changing it invalidates any
/// persisted hash.
const KEY_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// The full set of Zobrist keys.
struct Keys {
    /// One key per (piece index 0..12, square).
    pieces: [[u64; 64]; 12],
    /// XORed into the hash when black is to move.
    side: u64,
    /// One key per castle right, in the order white kingside, white
    /// queenside, black kingside, black queenside.
    castle: [u64; 4],
    /// One key per file of a possible en passant square.
    ep_file: [u64; 8],
}

static KEYS: Lazy<Keys> = Lazy::new(|| {
    let rng = fastrand::Rng::with_seed(KEY_SEED);
    let mut pieces = [[0u64; 64]; 12];
    for square_keys in pieces.iter_mut() {
        for key in square_keys.iter_mut() {
            *key = rng.u64(..);
        }
    }
    let side = rng.u64(..);
    let mut castle = [0u64; 4];
    for key in castle.iter_mut() {
        *key = rng.u64(..);
    }
    let mut ep_file = [0u64; 8];
    for key in ep_file.iter_mut() {
        *key = rng.u64(..);
    }
    Keys {
        pieces,
        side,
        castle,
        ep_file,
    }
});

#[inline]
#[must_use]
/// Get the key for a piece, identified by its index in the board's
/// 12-element bitboard array, on a square.
pub fn piece_key(piece_index: usize, sq: Square) -> u64 {
    KEYS.pieces[piece_index][sq.index()]
}

#[inline]
#[must_use]
/// Get the key XORed into the hash exactly when black is to move.
pub fn side_key() -> u64 {
    KEYS.side
}

#[inline]
#[must_use]
/// Get the key for one castle right, indexed as in [`super::CastleRights`].
pub fn castle_key(right: usize) -> u64 {
    KEYS.castle[right]
}

#[inline]
#[must_use]
/// Get the key for an en passant square on the given file.
pub fn ep_key(file: u8) -> u64 {
    KEYS.ep_file[file as usize & 7]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable() {
        // the seed pins every key; spot-check that repeated access agrees
        assert_eq!(piece_key(0, Square::A1), piece_key(0, Square::A1));
        assert_eq!(side_key(), side_key());
    }

    #[test]
    fn keys_are_distinct() {
        // not a proof, but catches gross generator misuse
        let mut seen = std::collections::HashSet::new();
        for piece in 0..12 {
            for idx in 0..64 {
                assert!(seen.insert(piece_key(piece, Square::new(idx))));
            }
        }
        assert!(seen.insert(side_key()));
        for right in 0..4 {
            assert!(seen.insert(castle_key(right)));
        }
        for file in 0..8 {
            assert!(seen.insert(ep_key(file)));
        }
    }
}
