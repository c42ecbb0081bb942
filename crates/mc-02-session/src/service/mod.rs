//! # Session Service
//!
//! `SessionState` owns the one live `Session` and performs the remote calls
//! that move it between states.

mod state;

pub use state::SessionState;

#[cfg(test)]
mod tests;
