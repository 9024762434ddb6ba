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

//! Sable is a UCI-compatible chess engine which selects its moves by
//! Monte-Carlo tree search guided by a policy + value neural network with
//! Lc0-compatible output heads.
//!
//! The crate is split into four areas:
//!
//! * [`base`] contains the chess rules: bitboards, move generation, and
//!   game state with repetition history.
//! * [`net`] contains the bridge to the neural network: the policy-index
//!   codec, the input-tensor encoder, and a batching evaluator.
//! * [`engine`] contains the tree search itself.
//! * [`uci`] contains the line protocol spoken with a chess GUI.

pub mod base;
pub mod engine;
pub mod net;
pub mod uci;
