use crate::domain::Timestamp;
use crate::ports::TimeSource;
use std::time::{Duration, Instant};

/// Clock for production use, counting from the moment it was created.
///
/// Backed by [`Instant`], so announcement ages are immune to wall-clock
/// adjustments.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    #[must_use]
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
    fn now(&self) -> Timestamp {
        let elapsed = self.origin.elapsed();
        Timestamp::from_millis(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_starts_near_zero_and_never_goes_back() {
        let clock = MonotonicClock::new();
        let first = clock.now();
        assert!(first.as_millis() < 1_000);

        std::thread::sleep(Duration::from_millis(5));
        let second = clock.now();
        assert!(second.saturating_since(first) >= Duration::from_millis(5));
    }
}
