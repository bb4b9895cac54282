//! Wall-clock and node budget tracking for one search run
//!
//! The stop flag is sticky: once a budget trips, the manager reports stopped
//! until the next `start`. The search polls `check_stop_condition` at
//! bounded intervals and unwinds cooperatively.

use std::time::Instant;

use super::types::SearchLimits;

/// Tracks the time/node budget of a single search run.
#[derive(Debug, Default)]
pub struct TimeManager {
    start: Option<Instant>,
    limits: SearchLimits,
    stopped: bool,
    timed_out: bool,
}

impl TimeManager {
    pub fn new() -> Self {
        Self {
            start: None,
            limits: SearchLimits::default(),
            stopped: false,
            timed_out: false,
        }
    }

    /// Begin a new run: record the start instant and clear the stop flag.
    pub fn start(&mut self, limits: &SearchLimits) {
        self.start = Some(Instant::now());
        self.limits = limits.clone();
        self.stopped = false;
        self.timed_out = false;
    }

    /// Check the budget; flips (and keeps) the stop flag when exceeded.
    ///
    /// A `time_limit_ms` of 0 means unlimited time, a `max_nodes` of 0 means
    /// unlimited nodes; the other dimension still applies. While `in_panic`,
    /// the time budget is extended by `panic_extra_time_ms`.
    pub fn check_stop_condition(&mut self, nodes_visited: u64, in_panic: bool) -> bool {
        if self.stopped {
            return true;
        }
        if self.limits.max_nodes > 0 && nodes_visited > self.limits.max_nodes {
            self.stopped = true;
            return true;
        }
        if self.limits.time_limit_ms > 0 {
            let mut budget = self.limits.time_limit_ms;
            if in_panic {
                budget += self.limits.panic_extra_time_ms;
            }
            if self.elapsed_ms() >= budget {
                self.stopped = true;
                self.timed_out = true;
                return true;
            }
        }
        false
    }

    /// Sticky stop flag for the current run
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether the stop was caused by the wall clock (as opposed to the
    /// node budget)
    #[inline]
    pub fn stopped_on_time(&self) -> bool {
        self.timed_out
    }

    /// Milliseconds since `start`; 0 before the first start
    pub fn elapsed_ms(&self) -> u64 {
        self.start
            .map(|s| s.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }
}
