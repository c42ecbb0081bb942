use std::time::Duration;

/// Point in time in milliseconds, as reported by a `TimeSource`.
///
/// Only differences between timestamps are meaningful; the epoch is
/// whatever the time source uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1000))
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn saturating_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    pub fn add(&self, duration: Duration) -> Self {
        let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(millis))
    }
}

/// Whether a directory service is currently considered reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reachability {
    /// A valid announcement arrived within the silence window.
    Reachable,
    /// Never connected, silence window elapsed, or explicitly disconnected.
    #[default]
    Unreachable,
}

impl Reachability {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_elapsed_saturates() {
        let early = Timestamp::from_secs(5);
        let late = Timestamp::from_secs(7);
        assert_eq!(late.saturating_since(early), Duration::from_secs(2));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
    }

    #[test]
    fn test_timestamp_add() {
        let t = Timestamp::from_millis(500).add(Duration::from_millis(1500));
        assert_eq!(t, Timestamp::from_secs(2));
    }

    #[test]
    fn test_default_reachability_is_unreachable() {
        assert!(!Reachability::default().is_reachable());
    }
}
