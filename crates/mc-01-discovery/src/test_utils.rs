//! Test utilities for discovery.
//!
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust
//! use mc_01_discovery::test_utils::ManualTimeSource;
//! use mc_01_discovery::TimeSource;
//! use std::time::Duration;
//!
//! let clock = ManualTimeSource::new();
//! clock.advance(Duration::from_secs(11));
//! assert_eq!(clock.now().as_millis(), 11_000);
//! ```

use crate::domain::Timestamp;
use crate::ports::TimeSource;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Thread-safe clock that only moves when told to.
///
/// Share it through an `Arc` between the code under test and the test body.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    millis: AtomicU64,
}

impl ManualTimeSource {
    /// A clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis()),
        }
    }

    /// Advance the clock.
    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }

    pub fn set(&self, at: Timestamp) {
        self.millis.store(at.as_millis(), Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst))
    }
}
