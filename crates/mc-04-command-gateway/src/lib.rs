//! # Command Gateway
//!
//! **Subsystem ID:** 4
//!
//! Turns user commands into calls on the discovered directory's services,
//! but only when the command's preconditions hold.
//!
//! ## Dispatch
//!
//! ```text
//!  line ──▶ Command::parse ──▶ CommandSpec (guards, remote?)
//!                                   │
//!                 ┌─────────────────┴─────────────────┐
//!                 ▼                                   ▼
//!        guard fails: refusal                all guards hold: run
//!        (no side effect)                     │
//!                                             ├─ Unauthorized ─▶ refresh once, retry once
//!                                             ├─ WrongMediaId ─▶ evict cache entry
//!                                             └─ any error ────▶ Reply::Error
//! ```
//!
//! ## Guards
//!
//! | Guard | Holds when |
//! |-------|------------|
//! | `Reachable` | the reachability signal is up |
//! | `Authenticated` | a user is logged in |
//! | `HasSelection` | a cached record is selected |
//! | `AsElevated` | elevated, or elevation succeeds after prompting; undone afterwards |
//!
//! Remote commands hold the [`InteractiveLock`] while they run.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (ScriptedPrompter, StaticLocator)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::LocalFileUploader;
pub use domain::{
    help_lines, Command, CommandKind, CommandSpec, GatewayConfig, GatewayError, Guard,
    Interrupted, PromptLabel, Reply, COMMANDS, DEFAULT_CHUNK_SIZE,
};
pub use ports::Prompter;
pub use service::{CommandGateway, InteractiveLock};
