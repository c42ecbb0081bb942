//! # Shared Bus - Announcement Channels
//!
//! In-process stand-in for the platform's publish/subscribe service. Backend
//! services publish on named channels; the client subscribes to the channels
//! it cares about.
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────────┐
//! │ Directory    │                    │ ConnectionMonitor│
//! │ instance     │    publish()       │                  │
//! │              │ ──────┐            │                  │
//! └──────────────┘       │            └──────────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐           │
//!                  │  Event Bus   │           │
//!                  │              │ ──────────┘
//!                  └──────────────┘  subscribe()
//! ```
//!
//! ## Delivery
//!
//! At-least-once from the subscriber's point of view: publishers may repeat
//! announcements freely and there is no ordering between publishers.
//! Consumers must be idempotent.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod channels;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{
    BusEvent, CatalogChange, CatalogUpdate, EventFilter, FileAvailability, ServiceAnnouncement,
    Topic, UnknownTopic, UserChange, UserUpdate,
};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{EventSubscriber, Subscription, SubscriptionError};

/// Channel directory instances announce themselves on.
pub const ANNOUNCEMENTS_CHANNEL: &str = "Announcements";

/// Maximum events to buffer per subscriber before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;
