//! Domain layer: command grammar, dispatch table, replies and errors.

pub mod command;
pub mod config;
pub mod errors;
pub mod prompt;
pub mod reply;
pub mod table;

pub use command::{Command, CommandKind};
pub use config::{GatewayConfig, DEFAULT_CHUNK_SIZE};
pub use errors::{GatewayError, Interrupted};
pub use prompt::PromptLabel;
pub use reply::Reply;
pub use table::{help_lines, CommandSpec, Guard, COMMANDS};
