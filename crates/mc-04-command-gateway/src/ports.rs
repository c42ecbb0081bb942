//! # Ports
//!
//! Driven port for interactive input.

use crate::domain::Interrupted;

/// Asks the user for a value mid-command.
///
/// An interrupt (ctrl-c, closed input) aborts only the command that asked.
pub trait Prompter: Send + Sync {
    fn prompt(&self, label: &str) -> Result<String, Interrupted>;

    /// Like [`Prompter::prompt`] for values that must not be echoed.
    fn prompt_secret(&self, label: &str) -> Result<String, Interrupted>;
}
