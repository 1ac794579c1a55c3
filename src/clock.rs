use std::cell::Cell;

use chrono::Utc;

/// Source of entry timestamps. Recency decides eviction order, so the clock
/// is injected rather than read inline, letting tests drive it tick by tick.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// The wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to. Two entries written between calls to
/// `advance` share a timestamp, which is how collisions get exercised.
#[derive(Debug)]
pub struct ManualClock {
    now : Cell<i64>
}

impl ManualClock {
    pub fn new(start_ms : i64) -> Self {
        ManualClock { now : Cell::new(start_ms) }
    }

    /// Move the clock forward by `ms` milliseconds.
    pub fn advance(&self, ms : i64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms : i64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    #[allow(unused_imports)]
    use super::*;

    #[allow(unused_imports)]
    use spectral::prelude::*;

    #[test]
    fn manual_clock_advances_on_demand() {
        let clock = ManualClock::new(100);
        asserting("starts where told").that(&clock.now_ms()).is_equal_to(100);
        clock.advance(5);
        asserting("advances by the step").that(&clock.now_ms()).is_equal_to(105);
        clock.set(1);
        asserting("can be reset").that(&clock.now_ms()).is_equal_to(1);
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let first = clock.now_ms();
        let second = clock.now_ms();
        asserting("time does not run backwards").that(&(second >= first)).is_equal_to(true);
    }
}
