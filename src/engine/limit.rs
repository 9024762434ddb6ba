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

//! Search limiting.
//!
//! Timed searches poll a shared limit between simulations, and the UCI
//! `stop` command flips it from another thread. Cancellation is
//! cooperative: a simulation already in flight always runs to its end.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
    time::{Duration, Instant},
};

#[derive(Debug, Default)]
/// A limit on how long a search may continue. Shared between the search
/// workers and the UCI shell.
pub struct SearchLimit {
    /// Whether the search is over, by deadline or by explicit stop.
    over: AtomicBool,
    /// The deadline of a timed search, if one is running.
    deadline: RwLock<Option<Instant>>,
}

impl SearchLimit {
    #[must_use]
    /// Create a limit which never expires on its own.
    pub fn new() -> SearchLimit {
        SearchLimit::default()
    }

    /// Arm the limit for a new search. A `duration` of `None` means the
    /// search only ends by visit exhaustion or an explicit stop.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn start(&self, duration: Option<Duration>) {
        *self.deadline.write().unwrap() = duration.map(|d| Instant::now() + d);
        self.over.store(false, Ordering::Relaxed);
    }

    /// Request that the search stop at the next simulation boundary.
    pub fn stop(&self) {
        self.over.store(true, Ordering::Relaxed);
    }

    #[must_use]
    /// Poll whether the search is over.
    pub fn is_over(&self) -> bool {
        self.over.load(Ordering::Relaxed)
    }

    /// Compare the clock against the deadline, marking the search over if
    /// it has passed.
    ///
    /// # Panics
    ///
    /// Panics if the lock is poisoned.
    pub fn update_time(&self) {
        if let Some(deadline) = *self.deadline.read().unwrap() {
            if Instant::now() >= deadline {
                self.over.store(true, Ordering::Relaxed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_marks_over() {
        let limit = SearchLimit::new();
        assert!(!limit.is_over());
        limit.stop();
        assert!(limit.is_over());
        // re-arming clears the flag
        limit.start(None);
        assert!(!limit.is_over());
    }

    #[test]
    fn deadline_expires() {
        let limit = SearchLimit::new();
        limit.start(Some(Duration::from_millis(0)));
        limit.update_time();
        assert!(limit.is_over());
    }

    #[test]
    fn untimed_never_expires() {
        let limit = SearchLimit::new();
        limit.start(None);
        limit.update_time();
        assert!(!limit.is_over());
    }
}
