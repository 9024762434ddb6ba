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

//! Time management: decide how much of the remaining clock one move may
//! spend.

use std::time::Duration;

/// Assumed moves remaining when the GUI does not send `movestogo`.
const DEFAULT_MOVES_TO_GO: f64 = 30.0;

/// Never search for less than this, whatever the clock says.
const MIN_BUDGET_MS: f64 = 10.0;

#[must_use]
/// Decide the time budget for one move from the mover's clock state, all
/// quantities in milliseconds: a near-equal share of the remaining time
/// over the moves to the next control, most of the increment, and a small
/// buffer held back for communication overhead.
pub fn move_budget(remaining_ms: u64, increment_ms: u64, movestogo: Option<u32>) -> Duration {
    let horizon = movestogo.map_or(DEFAULT_MOVES_TO_GO, f64::from) + 2.5;
    let budget = remaining_ms as f64 / horizon + 0.8 * increment_ms as f64 - 50.0;
    Duration::from_millis(budget.max(MIN_BUDGET_MS) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_of_remaining_clock() {
        // 60s left, no increment, no movestogo: 60000/32.5 - 50
        let budget = move_budget(60_000, 0, None);
        assert_eq!(budget, Duration::from_millis(1_796));
    }

    #[test]
    fn movestogo_shrinks_the_horizon() {
        // 60s for 10 moves: 60000/12.5 - 50
        let budget = move_budget(60_000, 0, Some(10));
        assert_eq!(budget, Duration::from_millis(4_750));
    }

    #[test]
    fn increment_mostly_added() {
        let without = move_budget(60_000, 0, None);
        let with = move_budget(60_000, 1_000, None);
        assert_eq!(with - without, Duration::from_millis(800));
    }

    #[test]
    fn floor_on_dead_clock() {
        assert_eq!(move_budget(20, 0, None), Duration::from_millis(10));
    }
}
