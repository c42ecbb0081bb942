use mc_01_discovery::DiscoveryError;
use mc_02_session::SessionError;
use mc_03_media_cache::CacheError;
use shared_bus::UnknownTopic;
use shared_types::RemoteError;
use thiserror::Error;

/// A blocking prompt was interrupted by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Interrupted")]
pub struct Interrupted;

/// Why a command was refused or failed.
///
/// Rendered as a single line at the dispatch boundary; nothing here
/// terminates the client.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("No directory service available, try again later")]
    NoActiveDirectory,

    #[error("You must log in first")]
    NotAuthenticated,

    #[error("Administrator privileges required")]
    NotElevated,

    #[error("No media selected, use `catalog use <id>` first")]
    NoSelection,

    #[error("Unknown command `{0}`")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(String),

    #[error("{0}, expected Announcements, UserUpdates, CatalogUpdates or FileAvailabilityAnnounce")]
    Topic(#[from] UnknownTopic),

    #[error("Event listener not running")]
    NoEventListener,

    #[error("Interrupted")]
    Interrupted,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<Interrupted> for GatewayError {
    fn from(_: Interrupted) -> Self {
        Self::Interrupted
    }
}

impl GatewayError {
    /// Refusals produced by a failing guard, before anything ran.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self,
            Self::NoActiveDirectory | Self::NotAuthenticated | Self::NotElevated | Self::NoSelection
        )
    }
}
