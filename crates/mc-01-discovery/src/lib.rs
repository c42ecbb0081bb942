//! # Directory Discovery & Reachability
//!
//! **Subsystem ID:** 1
//!
//! Tracks directory-service instances that announce themselves on the
//! `Announcements` channel, picks a live one on demand, and exposes a
//! reachable/unreachable signal driven by an independent silence timer.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** `AnnouncementRegistry` (expiry, check-and-evict
//!   selection), `DiscoveryConfig`, `Reachability`
//! - **Ports Layer:** `AnnouncementHandler` and `DirectoryLocator` (driving),
//!   `TimeSource` (driven)
//! - **Service Layer:** `ConnectionMonitor` wiring the bus, the registry and
//!   the silence timer; `EventListener` logging platform topics
//! - **Adapters Layer:** `MonotonicClock`
//!
//! ## Background Work
//!
//! While subscribed, the monitor runs exactly two tasks: one subscription
//! dispatch loop and one silence timer. Announcements never spawn tasks.
//! The event listener adds one logging task per topic it listens to.
//!
//! ## Example
//!
//! ```rust
//! use mc_01_discovery::{AnnouncementRegistry, DiscoveryConfig, Timestamp};
//! use shared_types::InstanceId;
//!
//! let mut registry = AnnouncementRegistry::new(&DiscoveryConfig::default());
//! registry.record_announcement(InstanceId::new("main-1"), "handle", Timestamp::from_secs(0));
//!
//! // Still fresh at 11s, gone at 13s.
//! assert_eq!(registry.select_active(Timestamp::from_secs(11), |_| true), Some("handle"));
//! assert_eq!(registry.select_active(Timestamp::from_secs(13), |_| true), None);
//! assert!(registry.is_empty());
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (ManualTimeSource)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::MonotonicClock;
pub use domain::{
    AnnouncementEntry, AnnouncementRegistry, DiscoveryConfig, DiscoveryError, Reachability,
    RegistryStats, Timestamp,
};
pub use ports::{
    AnnouncementHandler, AnnouncementOutcome, DirectoryLocator, DiscoveryStatus, TimeSource,
    TopicListener,
};
pub use service::{AnnouncementProcessor, ConnectionMonitor, EventListener, ReachabilityState};
