use super::state::ReachabilityState;
use crate::domain::AnnouncementRegistry;
use crate::ports::{AnnouncementHandler, AnnouncementOutcome, TimeSource};
use parking_lot::Mutex;
use shared_bus::ServiceAnnouncement;
use shared_types::{CapabilityResolver, DirectoryService};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub(crate) type SharedRegistry = Arc<Mutex<AnnouncementRegistry<Arc<dyn DirectoryService>>>>;

/// Validate → record → reset, for one announcement at a time.
///
/// Holds no delivery state, so duplicate and reordered announcements only
/// refresh timestamps.
pub struct AnnouncementProcessor {
    registry: SharedRegistry,
    resolver: Arc<dyn CapabilityResolver>,
    time_source: Arc<dyn TimeSource>,
    state: Arc<ReachabilityState>,
    /// Capacity-1 channel into the silence timer. A full channel already
    /// holds a pending reset.
    timer_reset: mpsc::Sender<()>,
}

impl AnnouncementProcessor {
    pub(crate) fn new(
        registry: SharedRegistry,
        resolver: Arc<dyn CapabilityResolver>,
        time_source: Arc<dyn TimeSource>,
        state: Arc<ReachabilityState>,
        timer_reset: mpsc::Sender<()>,
    ) -> Self {
        Self {
            registry,
            resolver,
            time_source,
            state,
            timer_reset,
        }
    }
}

impl AnnouncementHandler for AnnouncementProcessor {
    fn on_announcement(&self, announcement: &ServiceAnnouncement) -> AnnouncementOutcome {
        let directory = match self.resolver.resolve_directory(&announcement.proxy) {
            Ok(directory) => directory,
            Err(e) => {
                info!(
                    origin = %announcement.origin_id,
                    error = %e,
                    "Ignored announcement"
                );
                return AnnouncementOutcome::Ignored;
            }
        };

        let now = self.time_source.now();
        let new_instance = self.registry.lock().record_announcement(
            announcement.origin_id.clone(),
            Arc::clone(&directory),
            now,
        );
        if new_instance {
            info!(instance_id = %announcement.origin_id, "Directory instance announced");
        } else {
            debug!(instance_id = %announcement.origin_id, "Directory announcement refreshed");
        }

        // Re-arm the timer first so an expiry racing this announcement cannot
        // undo the transition below.
        let _ = self.timer_reset.try_send(());
        if self
            .state
            .mark_reachable(announcement.origin_id.clone(), directory)
        {
            info!(instance_id = %announcement.origin_id, "Directory reachable");
        }

        AnnouncementOutcome::Recorded { new_instance }
    }
}
