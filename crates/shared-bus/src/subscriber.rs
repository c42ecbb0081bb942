//! # Subscriptions
//!
//! A [`Subscription`] is the receiving end of one `subscribe` call. There is
//! no explicit unsubscribe: dropping the handle detaches it from the bus and
//! releases its channel slot.

use crate::channels::ListenerGuard;
use crate::events::{BusEvent, EventFilter};
use thiserror::Error;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::Receiver;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

pub trait EventSubscriber: Send + Sync {
    /// Start receiving events accepted by `filter`. Events published before
    /// this call are never delivered.
    fn subscribe(&self, filter: EventFilter) -> Subscription;
}

pub struct Subscription {
    receiver: Receiver<BusEvent>,
    filter: EventFilter,
    listener: ListenerGuard,
}

impl Subscription {
    pub(crate) fn new(
        receiver: Receiver<BusEvent>,
        filter: EventFilter,
        listener: ListenerGuard,
    ) -> Self {
        Self {
            receiver,
            filter,
            listener,
        }
    }

    /// Wait for the next accepted event. `None` once the bus is gone.
    ///
    /// Events lost to lag are skipped with a warning; announcements repeat,
    /// so the next one makes up for them.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next accepted event if one is already queued.
    pub fn try_recv(&mut self) -> Result<Option<BusEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(skipped)) => self.lagged(skipped),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    fn lagged(&self, skipped: u64) {
        warn!(
            channels = self.listener.key(),
            skipped,
            "Subscriber fell behind, events dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ServiceAnnouncement;
    use crate::publisher::InMemoryEventBus;
    use crate::EventPublisher;
    use shared_types::entities::{InstanceId, ProxyRef};
    use std::time::Duration;
    use tokio::time::timeout;

    fn announcement(channel: &str, origin: &str) -> BusEvent {
        BusEvent::ServiceAnnounced(ServiceAnnouncement::new(
            channel,
            InstanceId::new(origin),
            ProxyRef::new(format!("{origin} -t:tcp")),
        ))
    }

    async fn next(sub: &mut Subscription) -> BusEvent {
        timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event")
    }

    #[tokio::test]
    async fn test_only_matching_channel_is_delivered() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::channel("Announcements"));

        bus.publish(announcement("CatalogUpdates", "catalog-1")).await;
        bus.publish(announcement("Announcements", "main-1")).await;

        let event = next(&mut sub).await;
        assert_eq!(event.channel(), "Announcements");
        assert_eq!(event.origin().as_str(), "main-1");
        assert_eq!(sub.try_recv(), Ok(None));
    }

    #[tokio::test]
    async fn test_earlier_events_are_not_replayed() {
        let bus = InMemoryEventBus::new();
        bus.publish(announcement("Announcements", "main-1")).await;

        let mut sub = bus.subscribe(EventFilter::all());
        assert_eq!(sub.try_recv(), Ok(None));

        bus.publish(announcement("Announcements", "main-2")).await;
        assert_eq!(next(&mut sub).await.origin().as_str(), "main-2");
    }

    #[tokio::test]
    async fn test_lagging_subscriber_keeps_newest_events() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut sub = bus.subscribe(EventFilter::all());

        for origin in ["main-1", "main-2", "main-3"] {
            bus.publish(announcement("Announcements", origin)).await;
        }

        assert_eq!(next(&mut sub).await.origin().as_str(), "main-2");
        assert_eq!(next(&mut sub).await.origin().as_str(), "main-3");
    }

    #[test]
    fn test_drop_releases_channel_slot() {
        let bus = InMemoryEventBus::new();
        {
            let _first = bus.subscribe(EventFilter::channel("Announcements"));
            let _second = bus.subscribe(EventFilter::channel("Announcements"));
            assert_eq!(bus.subscribers_on("Announcements"), 2);
        }

        assert_eq!(bus.subscriber_count(), 0);
        assert_eq!(bus.subscribers_on("Announcements"), 0);
    }

    #[tokio::test]
    async fn test_closed_bus_ends_the_subscription() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        drop(bus);

        assert!(sub.recv().await.is_none());
        assert_eq!(sub.try_recv(), Err(SubscriptionError::Closed));
    }
}
