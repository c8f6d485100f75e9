// src/miner/hashrate.rs
//! Sliding-window hashrate tracking.

use std::collections::VecDeque;
use std::time::Instant;

/// Number of per-interval samples kept for the smoothed rate.
pub const HASHRATE_WINDOW: usize = 20;

/// Tracks recent per-interval hash counts and derives rates.
///
/// The externally visible "speed" is the instantaneous rate of the last
/// sample; the windowed average is a smoothing aid for presentation, not a
/// correctness signal.
pub struct HashrateTracker {
    window: VecDeque<u64>,
    current: u64,
    last_merge: Option<Instant>,
}

impl HashrateTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        HashrateTracker {
            window: VecDeque::with_capacity(HASHRATE_WINDOW),
            current: 0,
            last_merge: None,
        }
    }

    /// Records one interval worth of hashing.
    ///
    /// `rate = hashes * 1000 / (elapsed_ms + 1)`; the `+1` keeps a
    /// zero-width interval from dividing by zero. The sample is appended to
    /// the window, evicting the oldest entry past capacity, and becomes the
    /// new instantaneous rate.
    pub fn sample(&mut self, hashes: u64, elapsed_ms: u64) -> u64 {
        let rate = hashes * 1000 / (elapsed_ms + 1);
        self.current = rate;
        self.window.push_back(rate);
        if self.window.len() > HASHRATE_WINDOW {
            self.window.pop_front();
        }
        rate
    }

    /// Samples against the wall clock since the previous merge.
    ///
    /// The first call only arms the timer and returns `None`; subsequent
    /// calls return the sampled rate.
    pub fn merge(&mut self, hashes: u64) -> Option<u64> {
        let now = Instant::now();
        let rate = self
            .last_merge
            .map(|last| self.sample(hashes, now.duration_since(last).as_millis() as u64));
        self.last_merge = Some(now);
        rate
    }

    /// Instantaneous rate of the most recent sample, in hashes per second.
    pub fn current_rate(&self) -> u64 {
        self.current
    }

    /// Windowed average rate, in hashes per second; 0 with no samples.
    pub fn average(&self) -> u64 {
        if self.window.is_empty() {
            return 0;
        }
        self.window.iter().sum::<u64>() / self.window.len() as u64
    }

    /// Drops all samples; used when a mining session starts.
    pub fn reset(&mut self) {
        self.window.clear();
        self.current = 0;
        self.last_merge = None;
    }
}

impl Default for HashrateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_rate_formula() {
        let mut hr = HashrateTracker::new();
        // 1000 hashes over 999 ms: 1000 * 1000 / (999 + 1) = 1000 H/s
        assert_eq!(hr.sample(1000, 999), 1000);
        assert_eq!(hr.current_rate(), 1000);
    }

    #[test]
    fn zero_width_interval_does_not_divide_by_zero() {
        let mut hr = HashrateTracker::new();
        assert_eq!(hr.sample(5000, 0), 5_000_000);
    }

    #[test]
    fn window_is_bounded() {
        let mut hr = HashrateTracker::new();
        for i in 0..HASHRATE_WINDOW as u64 + 5 {
            hr.sample(i * 1000, 999);
        }
        assert_eq!(hr.window.len(), HASHRATE_WINDOW);
        // oldest samples were evicted, so the average excludes them
        assert_eq!(*hr.window.front().unwrap(), 5000);
    }

    #[test]
    fn current_rate_is_last_sample_not_average() {
        let mut hr = HashrateTracker::new();
        hr.sample(10_000, 999);
        hr.sample(2000, 999);
        assert_eq!(hr.current_rate(), 2000);
        assert_eq!(hr.average(), 6000);
    }

    #[test]
    fn first_merge_only_arms() {
        let mut hr = HashrateTracker::new();
        assert!(hr.merge(100).is_none());
        assert!(hr.merge(100).is_some());
    }

    #[test]
    fn reset_clears_everything() {
        let mut hr = HashrateTracker::new();
        hr.sample(1000, 999);
        hr.reset();
        assert_eq!(hr.current_rate(), 0);
        assert_eq!(hr.average(), 0);
        assert!(hr.merge(1).is_none());
    }
}
