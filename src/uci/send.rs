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

//! Formatting of engine-to-GUI UCI messages.

use crate::base::Move;

use std::fmt::{self, Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
/// A message the engine sends to the GUI. `Display` renders the protocol
/// line, without its trailing newline.
pub enum UciMessage<'a> {
    /// Engine identification, sent in response to `uci`.
    Id {
        name: &'a str,
        author: &'a str,
    },
    /// End of the identification block.
    UciOk,
    /// Response to `isready`.
    ReadyOk,
    /// Declare a configurable option.
    Option {
        name: &'a str,
        opt: OptionType,
    },
    /// The final result of a search. `None` means the position has no
    /// legal move, rendered as the null move `0000`.
    BestMove(Option<Move>),
    /// Informational output; used for debug diagnostics.
    Info(&'a str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// The type of a declared option.
pub enum OptionType {
    /// An integer in a range.
    Spin { default: i64, min: i64, max: i64 },
    /// A boolean checkbox.
    Check { default: bool },
}

impl Display for UciMessage<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            UciMessage::Id { name, author } => {
                write!(f, "id name {name}\nid author {author}")
            }
            UciMessage::UciOk => write!(f, "uciok"),
            UciMessage::ReadyOk => write!(f, "readyok"),
            UciMessage::Option { name, opt } => {
                write!(f, "option name {name} type ")?;
                match opt {
                    OptionType::Spin { default, min, max } => {
                        write!(f, "spin default {default} min {min} max {max}")
                    }
                    OptionType::Check { default } => write!(f, "check default {default}"),
                }
            }
            UciMessage::BestMove(Some(m)) => write!(f, "bestmove {m}"),
            UciMessage::BestMove(None) => write!(f, "bestmove 0000"),
            UciMessage::Info(s) => write!(f, "info string {s}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Square;

    #[test]
    fn messages_render_protocol_lines() {
        assert_eq!(
            UciMessage::Id {
                name: "Sable 0.1.0",
                author: "The Sable authors",
            }
            .to_string(),
            "id name Sable 0.1.0\nid author The Sable authors"
        );
        assert_eq!(UciMessage::UciOk.to_string(), "uciok");
        assert_eq!(UciMessage::ReadyOk.to_string(), "readyok");
        assert_eq!(
            UciMessage::Option {
                name: "Threads",
                opt: OptionType::Spin {
                    default: 4,
                    min: 1,
                    max: 512,
                },
            }
            .to_string(),
            "option name Threads type spin default 4 min 1 max 512"
        );
        assert_eq!(
            UciMessage::Option {
                name: "UseGPU",
                opt: OptionType::Check { default: false },
            }
            .to_string(),
            "option name UseGPU type check default false"
        );
    }

    #[test]
    fn bestmove_renders_null_move() {
        assert_eq!(
            UciMessage::BestMove(Some(Move::normal(Square::E2, Square::E4))).to_string(),
            "bestmove e2e4"
        );
        assert_eq!(UciMessage::BestMove(None).to_string(), "bestmove 0000");
    }
}
