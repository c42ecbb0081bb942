//! # Connection Monitor Service
//!
//! Wires the bus subscription, the announcement registry and the silence
//! timer together. [`EventListener`] logs the other platform topics on
//! subscriptions of its own.
//!
//! ## Writers
//!
//! The dispatch task and the silence timer are the only writers of the
//! reachability signal, apart from explicit `unsubscribe`, `disconnect` and
//! `shutdown`, which all end in unreachable. The registry is shared with the
//! foreground, which pings candidates with the registry released and evicts
//! the dead ones afterwards.

mod listener;
mod monitor;
mod processor;
mod state;
mod tasks;

pub use listener::EventListener;
pub use monitor::ConnectionMonitor;
pub use processor::AnnouncementProcessor;
pub use state::ReachabilityState;
