//! # Shared Types Crate
//!
//! This crate contains the identifiers, the remote error taxonomy and the
//! capability traits through which the client talks to backend services.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Transport Boundary**: Remote services are reached only through the
//!   traits in [`capabilities`]. Converting an opaque reference into a typed
//!   capability is fallible and goes through [`CapabilityResolver`].
//! - **No Plaintext Secrets**: Passwords are reduced to a [`CredentialHash`]
//!   before they leave the caller.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod capabilities;
pub mod entities;
pub mod errors;

#[cfg(feature = "in-memory")]
pub mod in_memory;

pub use capabilities::*;
pub use entities::*;
pub use errors::*;
