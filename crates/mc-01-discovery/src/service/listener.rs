//! Platform event listener: one logging subscription per [`Topic`].

use super::tasks::run_event_log;
use crate::domain::DiscoveryError;
use crate::ports::TopicListener;
use parking_lot::Mutex;
use shared_bus::{EventFilter, EventSubscriber, Topic};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

struct TopicTask {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TopicTask {
    fn cancel(self) {
        let _ = self.stop.send(true);
        self.task.abort();
    }
}

/// Logs platform events for the topics it was asked to listen to.
///
/// Listening is idempotent per topic. After [`EventListener::stop_all`] no
/// topic can be listened to again.
pub struct EventListener {
    bus: Arc<dyn EventSubscriber>,
    runtime: Handle,
    topics: Mutex<BTreeMap<Topic, TopicTask>>,
    logged: Arc<AtomicU64>,
    shut_down: AtomicBool,
}

impl EventListener {
    pub fn new(bus: Arc<dyn EventSubscriber>, runtime: Handle) -> Self {
        Self {
            bus,
            runtime,
            topics: Mutex::new(BTreeMap::new()),
            logged: Arc::new(AtomicU64::new(0)),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Events logged so far across all topics.
    pub fn events_logged(&self) -> u64 {
        self.logged.load(Ordering::Relaxed)
    }

    /// Stop every topic for good. Returns how many were being listened to.
    pub fn stop_all(&self) -> usize {
        self.shut_down.store(true, Ordering::SeqCst);
        let topics = std::mem::take(&mut *self.topics.lock());
        let stopped = topics.len();
        for (topic, task) in topics {
            task.cancel();
            debug!(topic = %topic, "Stopped listening");
        }
        if stopped > 0 {
            info!(topics = stopped, "Event listener stopped");
        }
        stopped
    }
}

impl TopicListener for EventListener {
    fn listen(&self, topic: Topic) -> Result<bool, DiscoveryError> {
        let mut topics = self.topics.lock();
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(DiscoveryError::ShutDown);
        }
        if topics.contains_key(&topic) {
            debug!(topic = %topic, "Already listening");
            return Ok(false);
        }

        let (stop, stop_rx) = watch::channel(false);
        let subscription = self.bus.subscribe(EventFilter::channel(topic.as_str()));
        let task = self.runtime.spawn(run_event_log(
            subscription,
            topic,
            Arc::clone(&self.logged),
            stop_rx,
        ));
        topics.insert(topic, TopicTask { stop, task });
        info!(topic = %topic, "Listening for platform events");
        Ok(true)
    }

    fn stop(&self, topic: Topic) -> bool {
        let Some(task) = self.topics.lock().remove(&topic) else {
            return false;
        };
        task.cancel();
        info!(topic = %topic, "Stopped listening for platform events");
        true
    }

    fn topics(&self) -> Vec<Topic> {
        self.topics.lock().keys().copied().collect()
    }
}

impl Drop for EventListener {
    fn drop(&mut self) {
        for (_, task) in std::mem::take(self.topics.get_mut()) {
            task.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_bus::{
        BusEvent, CatalogChange, CatalogUpdate, EventPublisher, FileAvailability,
        InMemoryEventBus, UserChange, UserUpdate,
    };
    use shared_types::{InstanceId, MediaId};
    use std::time::Duration;

    fn listener() -> (Arc<InMemoryEventBus>, EventListener) {
        let bus = Arc::new(InMemoryEventBus::new());
        let listener = EventListener::new(bus.clone(), Handle::current());
        (bus, listener)
    }

    fn user_removed(user: &str) -> BusEvent {
        BusEvent::UserUpdated(UserUpdate {
            origin_id: InstanceId::new("auth-1"),
            change: UserChange::RemoveUser { user: user.into() },
        })
    }

    fn files_announced() -> BusEvent {
        BusEvent::FilesAnnounced(FileAvailability {
            origin_id: InstanceId::new("files-1"),
            media_ids: vec![MediaId::new("m1")],
        })
    }

    async fn logged_reaches(listener: &EventListener, expected: u64) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while listener.events_logged() < expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("events logged in time");
    }

    #[tokio::test]
    async fn test_listen_is_idempotent_per_topic() {
        let (bus, listener) = listener();

        assert_eq!(listener.listen(Topic::UserUpdates), Ok(true));
        assert_eq!(listener.listen(Topic::UserUpdates), Ok(false));
        assert_eq!(bus.subscribers_on("UserUpdates"), 1);
        assert_eq!(listener.topics(), vec![Topic::UserUpdates]);
    }

    #[tokio::test]
    async fn test_only_listened_topics_are_logged() {
        let (bus, listener) = listener();
        listener.listen(Topic::UserUpdates).unwrap();

        bus.publish(files_announced()).await;
        bus.publish(user_removed("bob")).await;
        logged_reaches(&listener, 1).await;

        listener.listen(Topic::CatalogUpdates).unwrap();
        bus.publish(BusEvent::CatalogUpdated(CatalogUpdate {
            origin_id: InstanceId::new("catalog-1"),
            change: CatalogChange::AddTags {
                media_id: MediaId::new("m1"),
                user: "alice".into(),
                tags: vec!["scifi".into()],
            },
        }))
        .await;
        logged_reaches(&listener, 2).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(listener.events_logged(), 2);
    }

    #[tokio::test]
    async fn test_stop_releases_the_subscription() {
        let (bus, listener) = listener();
        listener.listen(Topic::UserUpdates).unwrap();

        assert!(listener.stop(Topic::UserUpdates));
        assert!(!listener.stop(Topic::UserUpdates));
        assert!(listener.topics().is_empty());

        tokio::time::timeout(Duration::from_secs(1), async {
            while bus.subscribers_on("UserUpdates") > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("subscription released");

        bus.publish(user_removed("bob")).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(listener.events_logged(), 0);
    }

    #[tokio::test]
    async fn test_stop_all_ends_listening_for_good() {
        let (_bus, listener) = listener();
        listener.listen(Topic::Announcements).unwrap();
        listener.listen(Topic::FileAvailabilityAnnounce).unwrap();

        assert_eq!(listener.stop_all(), 2);
        assert!(listener.topics().is_empty());
        assert_eq!(listener.stop_all(), 0);
        assert_eq!(listener.listen(Topic::UserUpdates), Err(DiscoveryError::ShutDown));
    }
}
