//! Dispatch table: preconditions per command.
//!
//! Guards run in the order they are listed; the first one that fails
//! refuses the command before it has any effect.

use super::command::CommandKind;
use super::command::CommandKind as K;
use Guard::{AsElevated, Authenticated, HasSelection, Reachable};

/// A precondition checked before a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Guard {
    /// The reachability signal is up.
    Reachable,
    /// A user is logged in.
    Authenticated,
    /// A cached record is selected.
    HasSelection,
    /// Elevate for this command only, prompting for the administrative
    /// secret if needed. Dropped again afterwards unless the session was
    /// already elevated.
    AsElevated,
}

/// One row of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub kind: CommandKind,
    pub usage: &'static str,
    pub guards: &'static [Guard],
    /// Talks to remote services; holds the interactive lock while running.
    pub remote: bool,
}

impl CommandSpec {
    const fn local(kind: CommandKind, usage: &'static str, guards: &'static [Guard]) -> Self {
        Self {
            kind,
            usage,
            guards,
            remote: false,
        }
    }

    const fn remote(kind: CommandKind, usage: &'static str, guards: &'static [Guard]) -> Self {
        Self {
            kind,
            usage,
            guards,
            remote: true,
        }
    }

    pub fn requires(&self, guard: Guard) -> bool {
        self.guards.contains(&guard)
    }
}

/// Ordered like [`CommandKind`] so a kind indexes its own row.
pub static COMMANDS: [CommandSpec; 23] = [
    CommandSpec::local(K::Status, "status", &[]),
    CommandSpec::remote(K::Login, "login [user]", &[]),
    CommandSpec::local(K::Logout, "logout", &[]),
    CommandSpec::local(K::Disconnect, "disconnect", &[]),
    CommandSpec::local(K::Reconnect, "reconnect [channel]", &[]),
    CommandSpec::remote(K::SearchByName, "catalog name <text> [--exact]", &[Reachable]),
    CommandSpec::remote(
        K::SearchByTags,
        "catalog tags <tag>... [--all]",
        &[Reachable, Authenticated],
    ),
    CommandSpec::local(K::ShowCatalog, "catalog show", &[]),
    CommandSpec::local(K::Select, "catalog use <id>", &[]),
    CommandSpec::remote(
        K::Fetch,
        "selected fetch",
        &[Reachable, Authenticated, HasSelection],
    ),
    CommandSpec::remote(
        K::AddTags,
        "selected tags add <tag>...",
        &[Reachable, Authenticated, HasSelection],
    ),
    CommandSpec::remote(
        K::RemoveTags,
        "selected tags remove <tag>...",
        &[Reachable, Authenticated, HasSelection],
    ),
    CommandSpec::remote(
        K::Download,
        "selected download [path]",
        &[Reachable, Authenticated, HasSelection],
    ),
    CommandSpec::remote(
        K::Rename,
        "selected rename <name>",
        &[Reachable, HasSelection, AsElevated],
    ),
    CommandSpec::remote(
        K::Remove,
        "selected remove",
        &[Reachable, HasSelection, AsElevated],
    ),
    CommandSpec::remote(K::Upload, "upload <path>", &[Reachable, AsElevated]),
    CommandSpec::remote(K::AddUser, "users add <user>", &[Reachable, AsElevated]),
    CommandSpec::remote(K::RemoveUser, "users remove <user>", &[Reachable, AsElevated]),
    CommandSpec::remote(K::Admin, "admin", &[Reachable]),
    CommandSpec::local(K::Events, "events", &[]),
    CommandSpec::local(K::EventsOn, "events on <topic>", &[]),
    CommandSpec::local(K::EventsOff, "events off <topic>", &[]),
    CommandSpec::local(K::Exit, "exit", &[]),
];

/// One usage line per command, in table order.
pub fn help_lines() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|spec| spec.usage)
}
