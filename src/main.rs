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

//! The main UCI procedure.
//!
//! The shell listens for GUI commands on stdin and spins searches off onto
//! their own thread, so `stop` can land while a search runs.

use sable::base::Game;
use sable::engine::{
    config::{EngineConfig, DEFAULT_CPUCT_TENTHS, DEFAULT_VISIT_LIMIT},
    mcts::SearchBudget,
    time, Engine,
};
use sable::net::UniformNetwork;
use sable::uci::{parse_line, GoOption, OptionType, UciCommand, UciMessage};

use std::{
    io::stdin,
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};

/// Run a UCI engine.
fn main() {
    let mut debug = false;
    let mut config = EngineConfig::default();
    let mut engine = Arc::new(new_engine(&config));
    let mut game = Game::new();
    let mut search_handle: Option<JoinHandle<()>> = None;

    loop {
        let mut buf = String::new();
        match stdin().read_line(&mut buf) {
            // EOF: shut down as if we had been sent `quit`
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                debug_info(&format!("failed to read line: {e}"), debug);
                continue;
            }
        }
        let command = match parse_line(&buf) {
            Ok(command) => command,
            Err(e) => {
                // unknown commands are logged and skipped, per convention
                debug_info(&format!("failed to parse line: {e}"), debug);
                continue;
            }
        };

        match command {
            UciCommand::Uci => {
                println!(
                    "{}",
                    UciMessage::Id {
                        name: "Sable 0.1.0",
                        author: "The Sable authors",
                    }
                );
                declare_options(&config);
                println!("{}", UciMessage::UciOk);
            }
            UciCommand::Debug(setting) => debug = setting,
            UciCommand::IsReady => println!("{}", UciMessage::ReadyOk),
            UciCommand::SetOption { name, value } => {
                finish_search(&engine, &mut search_handle);
                apply_option(&mut config, &name, value.as_deref(), debug);
                engine = Arc::new(new_engine(&config));
            }
            UciCommand::NewGame => {
                finish_search(&engine, &mut search_handle);
                engine = Arc::new(new_engine(&config));
            }
            UciCommand::Position { fen, moves } => {
                finish_search(&engine, &mut search_handle);
                let mut next = match &fen {
                    Some(fen) => match Game::from_fen(fen) {
                        Ok(game) => game,
                        Err(e) => {
                            // a bad FEN voids the whole command
                            debug_info(&format!("ignoring position: {e}"), debug);
                            continue;
                        }
                    },
                    None => Game::new(),
                };
                for m in &moves {
                    // an unplayable move is skipped; later moves still apply
                    if let Err(e) = next.make_uci(m) {
                        debug_info(&format!("skipping move: {e}"), debug);
                    }
                }
                game = next;
                engine.clear_tree();
            }
            UciCommand::Go(options) => {
                finish_search(&engine, &mut search_handle);
                let budget = pick_budget(&options, &game, &config);
                let engine = engine.clone();
                search_handle = Some(thread::spawn(move || {
                    let best = engine.search(&game, budget);
                    println!("{}", UciMessage::BestMove(best));
                }));
            }
            UciCommand::Stop | UciCommand::PonderHit => engine.stop(),
            UciCommand::Quit => break,
        }
    }

    finish_search(&engine, &mut search_handle);
}

/// Build an engine over a fresh network session.
/// Model loading is the runtime's concern; without one, the uniform
/// stand-in keeps the engine playable. `UseGPU` is forwarded to the
/// session, which ignores it when there is no device to pick.
fn new_engine(config: &EngineConfig) -> Engine {
    Engine::new(Arc::new(UniformNetwork::classic()), *config)
}

/// Declare the configurable options after `uci`.
fn declare_options(config: &EngineConfig) {
    let options = [
        (
            "Threads",
            OptionType::Spin {
                default: config.threads as i64,
                min: 1,
                max: 512,
            },
        ),
        ("UseGPU", OptionType::Check { default: false }),
        (
            "CPuct",
            OptionType::Spin {
                default: DEFAULT_CPUCT_TENTHS,
                min: 1,
                max: 1000,
            },
        ),
        (
            "VisitLimit",
            OptionType::Spin {
                default: i64::from(DEFAULT_VISIT_LIMIT),
                min: 1,
                max: 1 << 24,
            },
        ),
    ];
    for (name, opt) in options {
        println!("{}", UciMessage::Option { name, opt });
    }
}

/// Apply one `setoption` to the configuration.
fn apply_option(config: &mut EngineConfig, name: &str, value: Option<&str>, debug: bool) {
    let value = value.unwrap_or("");
    let applied = match name.to_ascii_lowercase().as_str() {
        "threads" => value
            .parse::<usize>()
            .map(|threads| config.threads = threads.clamp(1, 512))
            .is_ok(),
        "usegpu" => value
            .parse::<bool>()
            .map(|use_gpu| config.use_gpu = use_gpu)
            .is_ok(),
        "cpuct" => value
            .parse::<i64>()
            .map(|tenths| config.set_cpuct_tenths(tenths))
            .is_ok(),
        "visitlimit" => value
            .parse::<u32>()
            .map(|limit| config.visit_limit = limit.max(1))
            .is_ok(),
        _ => false,
    };
    if !applied {
        debug_info(&format!("ignoring option `{name}` = `{value}`"), debug);
    }
}

/// Translate `go` options into a search budget. Explicit `movetime` wins,
/// then the game clock, then a visit count; a bare `go` searches the
/// configured visit limit.
fn pick_budget(options: &[GoOption], game: &Game, config: &EngineConfig) -> SearchBudget {
    let mut clocks = [None; 2];
    let mut increments = [0, 0];
    let mut movestogo = None;
    let mut movetime = None;
    let mut visits = None;
    let mut infinite = false;
    for option in options {
        match *option {
            GoOption::MoveTime(ms) => movetime = Some(ms),
            GoOption::WhiteTime(ms) => clocks[0] = Some(ms),
            GoOption::BlackTime(ms) => clocks[1] = Some(ms),
            GoOption::WhiteInc(ms) => increments[0] = ms,
            GoOption::BlackInc(ms) => increments[1] = ms,
            GoOption::MovesToGo(count) => movestogo = Some(count),
            GoOption::Visits(count) => visits = Some(count),
            GoOption::Infinite => infinite = true,
        }
    }

    if let Some(ms) = movetime {
        return SearchBudget::Timed(Duration::from_millis(ms));
    }
    if infinite {
        return SearchBudget::Infinite;
    }
    let mover = game.board().side_to_move.index();
    if let Some(remaining) = clocks[mover] {
        return SearchBudget::Timed(time::move_budget(remaining, increments[mover], movestogo));
    }
    let cap = config.visit_limit;
    SearchBudget::Visits(visits.map_or(cap, |v| v.min(cap)))
}

/// Stop any running search and wait for its `bestmove` to go out.
fn finish_search(engine: &Engine, handle: &mut Option<JoinHandle<()>>) {
    engine.stop();
    if let Some(handle) = handle.take() {
        let _ = handle.join();
    }
}

/// Print an `info string` diagnostic when debug mode is on.
fn debug_info(message: &str, debug: bool) {
    if debug {
        println!("{}", UciMessage::Info(message));
    }
}
