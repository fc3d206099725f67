//! Microsecond time sources for `TimeUS` fields.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Supplies the timestamp stamped into records.
pub trait TimeSource {
    /// Microseconds since some fixed origin. Never decreases.
    fn micros64(&self) -> u64;
}

/// Microseconds since the clock was created.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    #[inline]
    fn micros64(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Clock advanced by hand. Used for reproducible logs.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn starting_at(micros: u64) -> Self {
        Self {
            now: AtomicU64::new(micros),
        }
    }

    /// Moves the clock forward and returns the new time.
    pub fn advance(&self, micros: u64) -> u64 {
        self.now.fetch_add(micros, Ordering::Relaxed) + micros
    }
}

impl TimeSource for ManualClock {
    fn micros64(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_never_decreases() {
        let clock = MonotonicClock::new();
        let mut last = clock.micros64();
        for _ in 0..1000 {
            let now = clock.micros64();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::starting_at(1_000);
        assert_eq!(clock.micros64(), 1_000);
        assert_eq!(clock.advance(20_000), 21_000);
        assert_eq!(clock.micros64(), 21_000);
    }
}
