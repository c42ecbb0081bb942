//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** `AnnouncementHandler` is invoked by the bus
//!   dispatch loop; `DirectoryLocator` and `TopicListener` are what the
//!   command layer consumes.
//! - **Driven Ports (Outbound):** `TimeSource`.

pub mod inbound;
pub mod outbound;

pub use inbound::{
    AnnouncementHandler, AnnouncementOutcome, DirectoryLocator, DiscoveryStatus, TopicListener,
};
pub use outbound::TimeSource;
