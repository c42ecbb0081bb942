//! # Ports
//!
//! Driven ports required by the session service.

use std::time::Duration;

/// Blocking pause between retry attempts.
///
/// Production sleeps the calling thread; tests record the requested
/// durations instead of waiting.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}
