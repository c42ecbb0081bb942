use crate::domain::{DiscoveryError, Reachability};
use shared_bus::{ServiceAnnouncement, Topic};
use shared_types::{DirectoryService, InstanceId};
use std::sync::Arc;
use tokio::sync::watch;

/// What happened to a delivered announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnouncementOutcome {
    /// Recorded; `new_instance` is true the first time an id is seen.
    Recorded { new_instance: bool },
    /// The proxy is not a directory service. Dropped.
    Ignored,
}

/// Handling logic for one announcement: validate, record, reset timer.
///
/// Delivery mechanics (threads, retries, duplicates) belong to the caller;
/// implementations must tolerate duplicate and out-of-order delivery.
pub trait AnnouncementHandler: Send + Sync {
    fn on_announcement(&self, announcement: &ServiceAnnouncement) -> AnnouncementOutcome;
}

/// Snapshot for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryStatus {
    pub reachability: Reachability,
    /// Channel currently subscribed to, if any.
    pub channel: Option<String>,
    /// Known instances with the number of milliseconds since each was seen.
    pub instances: Vec<(InstanceId, u64)>,
}

/// What the command layer needs from discovery.
pub trait DirectoryLocator: Send + Sync {
    /// Cheap read of the current reachability signal.
    fn is_reachable(&self) -> bool;

    /// Change notifications for reachability. Intermediate states may be
    /// coalesced.
    fn reachability(&self) -> watch::Receiver<Reachability>;

    /// A live directory, or `None` when every known instance is stale or dead.
    fn select_active(&self) -> Option<Arc<dyn DirectoryService>>;

    /// Stop listening for announcements and mark the directory unreachable.
    fn disconnect(&self);

    /// Subscribe again, optionally to a different channel.
    fn reconnect(&self, channel: Option<&str>) -> Result<(), DiscoveryError>;

    fn status(&self) -> DiscoveryStatus;
}

/// Logging subscriptions to platform topics, one per topic.
pub trait TopicListener: Send + Sync {
    /// Start logging `topic`. Returns `Ok(false)` if already listening.
    fn listen(&self, topic: Topic) -> Result<bool, DiscoveryError>;

    /// Stop logging `topic`. Returns `false` if it was not being listened to.
    fn stop(&self, topic: Topic) -> bool;

    /// Topics currently listened to, in declaration order.
    fn topics(&self) -> Vec<Topic>;
}
