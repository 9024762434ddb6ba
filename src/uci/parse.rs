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

//! Parsing of GUI-to-engine UCI commands.

#[derive(Clone, Debug, PartialEq, Eq)]
/// A command sent by the GUI.
pub enum UciCommand {
    /// Identify as a UCI engine.
    Uci,
    /// Switch debug output on or off.
    Debug(bool),
    /// Ask whether the engine is done processing.
    IsReady,
    /// Set an engine option.
    SetOption {
        name: String,
        value: Option<String>,
    },
    /// The next position will be from a new game.
    NewGame,
    /// Set the position: an optional FEN (`None` means the starting
    /// position) and moves to replay on top of it, in UCI notation.
    /// The moves stay unparsed here; they can only be interpreted against
    /// the board they will be played on.
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    /// Start searching.
    Go(Vec<GoOption>),
    /// Stop the current search.
    Stop,
    /// The opponent played the expected move; treated as a stop.
    PonderHit,
    /// Shut down.
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// A constraint given with `go`.
pub enum GoOption {
    /// Search for exactly this many milliseconds.
    MoveTime(u64),
    /// White's remaining clock, in milliseconds.
    WhiteTime(u64),
    /// Black's remaining clock, in milliseconds.
    BlackTime(u64),
    /// White's per-move increment, in milliseconds.
    WhiteInc(u64),
    /// Black's per-move increment, in milliseconds.
    BlackInc(u64),
    /// Moves until the next time control.
    MovesToGo(u32),
    /// Run a fixed number of simulations.
    Visits(u32),
    /// Search until told to stop.
    Infinite,
}

/// The result of processing one line. Per the UCI convention, errors are
/// logged or ignored, never fatal.
pub type UciParseResult = Result<UciCommand, String>;

/// Parse a single UCI instruction.
///
/// # Errors
///
/// Returns an `Err` describing the failure for an empty line, an unknown
/// command, or a malformed argument list.
pub fn parse_line(line: &str) -> UciParseResult {
    let mut tokens = line.split_whitespace();
    let first = tokens.next().ok_or("line contains no tokens")?;
    match first {
        "uci" => Ok(UciCommand::Uci),
        "debug" => match tokens.next() {
            Some("on") | None => Ok(UciCommand::Debug(true)),
            Some("off") => Ok(UciCommand::Debug(false)),
            Some(tok) => Err(format!("unrecognized debug setting `{tok}`")),
        },
        "isready" => Ok(UciCommand::IsReady),
        "setoption" => parse_set_option(&mut tokens),
        "ucinewgame" => Ok(UciCommand::NewGame),
        "position" => parse_position(&mut tokens),
        "go" => parse_go(&mut tokens),
        "stop" => Ok(UciCommand::Stop),
        "ponderhit" => Ok(UciCommand::PonderHit),
        "quit" => Ok(UciCommand::Quit),
        _ => Err(format!("unrecognized UCI command `{first}`")),
    }
}

/// Parse a `setoption` line, after the `setoption` token was consumed.
/// Both the name and the value may span multiple tokens.
fn parse_set_option<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> UciParseResult {
    let name_tok = tokens
        .next()
        .ok_or("reached end of line looking for `name` in `setoption`")?;
    if name_tok != "name" {
        return Err(format!("expected token `name` in `setoption`, got `{name_tok}`"));
    }

    let mut name = String::new();
    loop {
        let Some(tok) = tokens.next() else {
            return Ok(UciCommand::SetOption { name, value: None });
        };
        if tok == "value" {
            break;
        }
        if !name.is_empty() {
            name += " ";
        }
        name += tok;
    }

    let mut value = String::new();
    for tok in tokens {
        if !value.is_empty() {
            value += " ";
        }
        value += tok;
    }
    Ok(UciCommand::SetOption {
        name,
        value: Some(value),
    })
}

/// Parse a `position` line, after the `position` token was consumed: either
/// `startpos` or `fen <6 fields>`, optionally followed by `moves m1 m2 ..`.
fn parse_position<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> UciParseResult {
    let mut moves_seen = false;
    let fen = match tokens.next().ok_or("reached end of line parsing position")? {
        "startpos" => {
            match tokens.next() {
                Some("moves") => moves_seen = true,
                Some(tok) => return Err(format!("expected `moves` after `startpos`, got `{tok}`")),
                None => {}
            }
            None
        }
        "fen" => {
            let mut fen = String::new();
            for tok in tokens.by_ref() {
                if tok == "moves" {
                    moves_seen = true;
                    break;
                }
                if !fen.is_empty() {
                    fen += " ";
                }
                fen += tok;
            }
            if fen.is_empty() {
                return Err("reached end of line parsing FEN".into());
            }
            Some(fen)
        }
        tok => return Err(format!("illegal position token `{tok}`")),
    };

    let moves = if moves_seen {
        tokens.map(String::from).collect()
    } else {
        Vec::new()
    };
    Ok(UciCommand::Position { fen, moves })
}

/// Parse a `go` line, after the `go` token was consumed.
fn parse_go<'a>(tokens: &mut impl Iterator<Item = &'a str>) -> UciParseResult {
    let mut options = Vec::new();
    while let Some(tok) = tokens.next() {
        options.push(match tok {
            "movetime" => GoOption::MoveTime(parse_int(tokens.next())?),
            "wtime" => GoOption::WhiteTime(parse_int(tokens.next())?),
            "btime" => GoOption::BlackTime(parse_int(tokens.next())?),
            "winc" => GoOption::WhiteInc(parse_int(tokens.next())?),
            "binc" => GoOption::BlackInc(parse_int(tokens.next())?),
            "movestogo" => GoOption::MovesToGo(parse_int(tokens.next())? as u32),
            // `nodes` is an alias: a node of this search is a visit
            "visits" | "nodes" => GoOption::Visits(parse_int(tokens.next())? as u32),
            "infinite" => GoOption::Infinite,
            _ => return Err(format!("unrecognized option `{tok}` for `go`")),
        });
    }
    Ok(UciCommand::Go(options))
}

/// Parse an integer argument of a `go` option.
fn parse_int(token: Option<&str>) -> Result<u64, String> {
    let token = token.ok_or("reached end of line expecting an integer")?;
    token
        .parse::<u64>()
        .map_err(|_| format!("`{token}` is not a nonnegative integer"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_commands() {
        assert_eq!(parse_line("uci"), Ok(UciCommand::Uci));
        assert_eq!(parse_line("  isready  "), Ok(UciCommand::IsReady));
        assert_eq!(parse_line("ucinewgame"), Ok(UciCommand::NewGame));
        assert_eq!(parse_line("stop"), Ok(UciCommand::Stop));
        assert_eq!(parse_line("quit"), Ok(UciCommand::Quit));
        assert_eq!(parse_line("debug on"), Ok(UciCommand::Debug(true)));
        assert_eq!(parse_line("debug off"), Ok(UciCommand::Debug(false)));
        assert!(parse_line("xyzzy").is_err());
        assert!(parse_line("").is_err());
    }

    #[test]
    fn setoption_with_and_without_value() {
        assert_eq!(
            parse_line("setoption name Threads value 4"),
            Ok(UciCommand::SetOption {
                name: "Threads".into(),
                value: Some("4".into()),
            })
        );
        assert_eq!(
            parse_line("setoption name Clear Hash"),
            Ok(UciCommand::SetOption {
                name: "Clear Hash".into(),
                value: None,
            })
        );
    }

    #[test]
    fn position_variants() {
        assert_eq!(
            parse_line("position startpos"),
            Ok(UciCommand::Position {
                fen: None,
                moves: Vec::new(),
            })
        );
        assert_eq!(
            parse_line("position startpos moves e2e4 e7e5"),
            Ok(UciCommand::Position {
                fen: None,
                moves: vec!["e2e4".into(), "e7e5".into()],
            })
        );
        assert_eq!(
            parse_line("position fen 7k/8/8/8/8/8/8/K7 w - - 0 1 moves a1b2"),
            Ok(UciCommand::Position {
                fen: Some("7k/8/8/8/8/8/8/K7 w - - 0 1".into()),
                moves: vec!["a1b2".into()],
            })
        );
        assert!(parse_line("position").is_err());
        assert!(parse_line("position fen").is_err());
        assert!(parse_line("position sidewards").is_err());
    }

    #[test]
    fn go_options() {
        assert_eq!(parse_line("go"), Ok(UciCommand::Go(Vec::new())));
        assert_eq!(
            parse_line("go movetime 2500"),
            Ok(UciCommand::Go(vec![GoOption::MoveTime(2500)]))
        );
        assert_eq!(
            parse_line("go wtime 30000 btime 28000 winc 1000 binc 1000 movestogo 12"),
            Ok(UciCommand::Go(vec![
                GoOption::WhiteTime(30000),
                GoOption::BlackTime(28000),
                GoOption::WhiteInc(1000),
                GoOption::BlackInc(1000),
                GoOption::MovesToGo(12),
            ]))
        );
        assert_eq!(
            parse_line("go visits 800"),
            Ok(UciCommand::Go(vec![GoOption::Visits(800)]))
        );
        assert_eq!(
            parse_line("go nodes 400"),
            Ok(UciCommand::Go(vec![GoOption::Visits(400)]))
        );
        assert_eq!(
            parse_line("go infinite"),
            Ok(UciCommand::Go(vec![GoOption::Infinite]))
        );
        assert!(parse_line("go movetime fish").is_err());
        assert!(parse_line("go sideways").is_err());
    }
}
