//! Domain Layer - Pure discovery logic with no I/O
//!
//! This module contains:
//! - Millisecond timestamps supplied by the caller
//! - The announcement registry with expiry and check-and-evict selection
//! - Discovery timing configuration
//! - The reachability value published to consumers

pub mod config;
pub mod errors;
pub mod registry;
pub mod types;

pub use config::DiscoveryConfig;
pub use errors::DiscoveryError;
pub use registry::{AnnouncementEntry, AnnouncementRegistry, RegistryStats};
pub use types::{Reachability, Timestamp};
