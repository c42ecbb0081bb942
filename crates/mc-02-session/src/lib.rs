//! # Session State
//!
//! **Subsystem ID:** 2
//!
//! Identity of the interactive user and the credential attached to remote
//! calls.
//!
//! ```text
//!             login                elevate
//! Anonymous ─────────▶ Authenticated ─────────▶ Elevated
//!     ▲                    │   ▲                   │
//!     │       logout       │   └── de_elevate ─────┘
//!     └────────────────────┘
//! ```
//!
//! ## Credentials
//!
//! Passwords are hashed on entry and only the hash is kept, so a token
//! refresh never needs the user again. Elevation installs the hashed
//! administrative secret as the current token and parks the user's token;
//! de-elevation puts it back and forgets the administrative credential.
//!
//! ## Retry Policy
//!
//! `TemporaryUnavailable` is retried a bounded number of times with a fixed
//! delay between attempts. `Unauthorized` is final and is never retried.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

/// Test utilities (RecordingSleeper)
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::ThreadSleeper;
pub use domain::{ElevationOutcome, RetryPolicy, Session, SessionError, SessionStatus};
pub use ports::Sleeper;
pub use service::SessionState;
