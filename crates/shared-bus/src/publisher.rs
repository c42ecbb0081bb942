//! # Publishing
//!
//! Announcers hold an `Arc<dyn EventPublisher>`; the monitor holds the same
//! bus as an `EventSubscriber`. Both sides meet in [`InMemoryEventBus`].

use crate::channels::ChannelTable;
use crate::events::{BusEvent, EventFilter};
use crate::subscriber::{EventSubscriber, Subscription};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Hand `event` to every live subscription.
    ///
    /// Returns how many receivers were attached when it was sent. Zero is
    /// normal: an announcement nobody hears is simply lost.
    async fn publish(&self, event: BusEvent) -> usize;

    /// Events accepted so far, heard or not.
    fn events_published(&self) -> u64;
}

/// Single-process bus over a `tokio::sync::broadcast` channel.
///
/// Every subscription sees the shared stream and discards what its filter
/// rejects. A subscriber that falls more than `capacity` events behind
/// loses the oldest ones.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<BusEvent>,
    channels: ChannelTable,
    published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            channels: ChannelTable::default(),
            published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Live subscriptions across all channels.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Live subscriptions whose filter names exactly `channel`.
    #[must_use]
    pub fn subscribers_on(&self, channel: &str) -> usize {
        self.channels.listeners(channel)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSubscriber for InMemoryEventBus {
    fn subscribe(&self, filter: EventFilter) -> Subscription {
        let listener = self.channels.join(&filter.channels);
        debug!(channels = listener.key(), "Subscribed");
        Subscription::new(self.sender.subscribe(), filter, listener)
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: BusEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let channel = event.channel().to_string();
        // `send` only fails when there are no receivers at all.
        let heard_by = self.sender.send(event).unwrap_or(0);
        trace!(channel = %channel, receivers = heard_by, "Published");
        heard_by
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
