use shared_bus::ANNOUNCEMENTS_CHANNEL;
use std::time::Duration;

/// Timing and channel settings for discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Entries older than this are never selected.
    pub expiry: Duration,
    /// Without a valid announcement for this long the directory is
    /// considered unreachable.
    pub silence_timeout: Duration,
    /// Bus channel announcements arrive on.
    pub channel: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::from_secs(12),
            silence_timeout: Duration::from_secs(12),
            channel: ANNOUNCEMENTS_CHANNEL.to_string(),
        }
    }
}

impl DiscoveryConfig {
    #[must_use]
    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}
