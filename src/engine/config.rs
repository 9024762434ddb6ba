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

//! Configuration options for a search, as set over UCI.

use std::thread;

/// The default exploration constant, in the tenths used by the UCI spin
/// option.
pub const DEFAULT_CPUCT_TENTHS: i64 = 25;

/// The default cap on visits for a fixed-visit search.
pub const DEFAULT_VISIT_LIMIT: u32 = 800;

#[derive(Clone, Copy, Debug, PartialEq)]
/// Configuration options for a search.
pub struct EngineConfig {
    /// The number of search worker threads.
    pub threads: usize,
    /// The PUCT exploration constant.
    pub cpuct: f32,
    /// The cap on visits for fixed-visit searches.
    pub visit_limit: u32,
    /// Whether the network should run on a GPU device. Forwarded to the
    /// network construction; runtimes without a device ignore it.
    pub use_gpu: bool,
}

impl EngineConfig {
    #[must_use]
    /// Construct a configuration with the default values: one worker per
    /// hardware thread and the standard exploration constant.
    pub fn new() -> EngineConfig {
        EngineConfig {
            threads: thread::available_parallelism().map_or(1, usize::from),
            cpuct: DEFAULT_CPUCT_TENTHS as f32 / 10.0,
            visit_limit: DEFAULT_VISIT_LIMIT,
            use_gpu: false,
        }
    }

    /// Set the exploration constant from the UCI spin value, which carries
    /// tenths.
    pub fn set_cpuct_tenths(&mut self, tenths: i64) {
        self.cpuct = tenths.max(1) as f32 / 10.0;
    }
}

impl Default for EngineConfig {
    fn default() -> EngineConfig {
        EngineConfig::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::new();
        assert!(config.threads >= 1);
        assert!((config.cpuct - 2.5).abs() < 1e-6);
        assert_eq!(config.visit_limit, DEFAULT_VISIT_LIMIT);
        assert!(!config.use_gpu);
    }

    #[test]
    fn cpuct_comes_in_tenths() {
        let mut config = EngineConfig::new();
        config.set_cpuct_tenths(15);
        assert!((config.cpuct - 1.5).abs() < 1e-6);
        // nonsense values are clamped to stay positive
        config.set_cpuct_tenths(-3);
        assert!(config.cpuct > 0.0);
    }
}
