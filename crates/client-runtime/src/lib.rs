//! # Client Runtime Library
//!
//! Wiring for the interactive media client. The `media-client` binary in
//! `main.rs` is the entry point; the pieces live here so they can be tested.
//!
//! ```text
//!  ClientConfig ──▶ ClientRuntime ──┬─ InMemoryEventBus ◀── sandbox announcer
//!                                   ├─ ConnectionMonitor (dispatch + silence timer)
//!                                   └─ prompt refresher, ctrl-c forwarder
//!
//!  Console (foreground thread) ──▶ CommandGateway ──▶ SessionState / MediaCache
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod console;
pub mod runtime;
pub mod sandbox;

pub use config::{load_config, ClientConfig, ConfigError};
pub use console::{
    spawn_terminal_reader, Console, ConsolePrompter, Input, InputQueue, ReadRequest, ReadRequests,
    Terminal,
};
pub use runtime::ClientRuntime;
pub use sandbox::Sandbox;
