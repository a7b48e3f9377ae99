//! Host clock.
use std::{
    thread,
    time::{Duration, Instant},
};

use crate::conf::Hz;

/// Timer to synchronize a host thread with the software clock of the virtual machine.
///
/// It is designed to work with the yielding cooperative pattern
/// of the interpreter. The VM never waits on its own; the host loop
/// asks the clock whether a cycle is due, or blocks on it.
pub struct Clock {
    interval: Duration,
    last: Instant,
}

impl Clock {
    /// Creates a new clock with the current time as internal state.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Instant::now(),
        }
    }

    pub fn from_hz(freq: Hz) -> Self {
        Self::new(freq.into())
    }

    /// Length of a single cycle.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the clock state back to zero.
    pub fn reset(&mut self) {
        self.last = Instant::now()
    }

    /// Check without blocking whether a cycle has elapsed.
    ///
    /// When it has, the clock moves on to the next cycle.
    pub fn tick(&mut self) -> bool {
        if self.last.elapsed() >= self.interval {
            self.last += self.interval;
            true
        } else {
            false
        }
    }

    /// Block the current thread until the next clock cycle.
    pub fn wait(&mut self) {
        loop {
            if self.last.elapsed() < self.interval {
                // Sleep does not have enough resolution at 60Hz,
                // and spinning causes high CPU usage.
                thread::yield_now();
            } else {
                // Reset back to zero, rather than trying to catch up.
                //
                // If the host was paused for a long time, it should
                // simply continue at the next cycle at its usual speed.
                self.reset();
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zero_interval_always_ticks() {
        let mut clock = Clock::from_hz(Hz(0));
        assert_eq!(clock.interval(), Duration::ZERO);
        assert!(clock.tick());
        assert!(clock.tick());
        clock.wait();
    }

    #[test]
    fn test_long_interval_does_not_tick() {
        let mut clock = Clock::new(Duration::from_secs(3600));
        assert!(!clock.tick());
    }

    #[test]
    fn test_wait_elapses_interval() {
        let mut clock = Clock::new(Duration::from_millis(2));
        let start = Instant::now();
        clock.wait();
        assert!(start.elapsed() >= Duration::from_millis(1));
    }
}
