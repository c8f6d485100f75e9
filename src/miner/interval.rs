// src/miner/interval.rs
//! Rate-limited interval timer.
//!
//! Drives the periodic template refresh and hashrate merge from the
//! coordinator's `on_idle` without ever firing more often than the
//! configured period.

use std::time::{Duration, Instant};

/// Fires at most once per period.
///
/// The first period starts at construction, so a freshly created interval
/// does not fire immediately.
pub struct Interval {
    period: Duration,
    last: Instant,
}

impl Interval {
    /// Creates an interval with the given minimum period between firings.
    pub fn new(period: Duration) -> Self {
        Interval {
            period,
            last: Instant::now(),
        }
    }

    /// Returns true when a full period has elapsed since the last firing
    /// (or since construction), and re-arms the timer.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> bool {
        if now.duration_since(self.last) >= self.period {
            self.last = now;
            true
        } else {
            false
        }
    }
}
