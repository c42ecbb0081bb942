use std::fmt;

/// Errors raised by discovery operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    /// The monitor was shut down and cannot subscribe again.
    ShutDown,
    /// An empty channel name was requested.
    InvalidChannel,
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShutDown => write!(f, "Connection monitor has been shut down"),
            Self::InvalidChannel => write!(f, "Channel name must not be empty"),
        }
    }
}

impl std::error::Error for DiscoveryError {}
