//! Clock adapter.

mod time;

pub use time::MonotonicClock;
