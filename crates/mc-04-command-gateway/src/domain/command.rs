//! Command grammar.
//!
//! Words are separated by whitespace; there is no quoting. Free-text
//! arguments (titles, new names) take the rest of the line.

use super::errors::GatewayError;
use super::table::{CommandSpec, COMMANDS};
use shared_bus::Topic;
use shared_types::MediaId;
use std::path::PathBuf;

/// Discriminant used to look a command up in the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Status,
    Login,
    Logout,
    Disconnect,
    Reconnect,
    SearchByName,
    SearchByTags,
    ShowCatalog,
    Select,
    Fetch,
    AddTags,
    RemoveTags,
    Download,
    Rename,
    Remove,
    Upload,
    AddUser,
    RemoveUser,
    Admin,
    Events,
    EventsOn,
    EventsOff,
    Exit,
}

impl CommandKind {
    /// Dispatch table row for this command.
    pub fn spec(self) -> &'static CommandSpec {
        &COMMANDS[self as usize]
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Status,
    Login { username: Option<String> },
    Logout,
    Disconnect,
    Reconnect { channel: Option<String> },
    SearchByName { name: String, exact: bool },
    SearchByTags { tags: Vec<String>, include_all: bool },
    ShowCatalog,
    Select { media_id: MediaId },
    Fetch,
    AddTags { tags: Vec<String> },
    RemoveTags { tags: Vec<String> },
    Download { path: Option<PathBuf> },
    Rename { name: String },
    Remove,
    Upload { path: PathBuf },
    AddUser { username: String },
    RemoveUser { username: String },
    Admin,
    Events,
    EventsOn { topic: Topic },
    EventsOff { topic: Topic },
    Exit,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::Status => CommandKind::Status,
            Self::Login { .. } => CommandKind::Login,
            Self::Logout => CommandKind::Logout,
            Self::Disconnect => CommandKind::Disconnect,
            Self::Reconnect { .. } => CommandKind::Reconnect,
            Self::SearchByName { .. } => CommandKind::SearchByName,
            Self::SearchByTags { .. } => CommandKind::SearchByTags,
            Self::ShowCatalog => CommandKind::ShowCatalog,
            Self::Select { .. } => CommandKind::Select,
            Self::Fetch => CommandKind::Fetch,
            Self::AddTags { .. } => CommandKind::AddTags,
            Self::RemoveTags { .. } => CommandKind::RemoveTags,
            Self::Download { .. } => CommandKind::Download,
            Self::Rename { .. } => CommandKind::Rename,
            Self::Remove => CommandKind::Remove,
            Self::Upload { .. } => CommandKind::Upload,
            Self::AddUser { .. } => CommandKind::AddUser,
            Self::RemoveUser { .. } => CommandKind::RemoveUser,
            Self::Admin => CommandKind::Admin,
            Self::Events => CommandKind::Events,
            Self::EventsOn { .. } => CommandKind::EventsOn,
            Self::EventsOff { .. } => CommandKind::EventsOff,
            Self::Exit => CommandKind::Exit,
        }
    }

    /// Parse one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, GatewayError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&head, rest)) = words.split_first() else {
            return Ok(None);
        };

        let command = match (head, rest) {
            ("status", []) => Self::Status,
            ("login", []) => Self::Login { username: None },
            ("login", [user]) => Self::Login {
                username: Some(user.to_string()),
            },
            ("logout", []) => Self::Logout,
            ("disconnect", []) => Self::Disconnect,
            ("reconnect", []) => Self::Reconnect { channel: None },
            ("reconnect", [channel]) => Self::Reconnect {
                channel: Some(channel.to_string()),
            },
            ("catalog", ["name", terms @ ..]) => {
                let (exact, words) = take_flag(terms, "--exact");
                if words.is_empty() {
                    return Err(usage(head));
                }
                Self::SearchByName {
                    name: words.join(" "),
                    exact,
                }
            }
            ("catalog", ["tags", terms @ ..]) => {
                let (include_all, tags) = take_flag(terms, "--all");
                if tags.is_empty() {
                    return Err(usage(head));
                }
                Self::SearchByTags { tags, include_all }
            }
            ("catalog", ["show"]) => Self::ShowCatalog,
            ("catalog", ["use", id]) => Self::Select {
                media_id: MediaId::new(*id),
            },
            ("selected", ["fetch"]) => Self::Fetch,
            ("selected", ["tags", "add", tags @ ..]) if !tags.is_empty() => Self::AddTags {
                tags: owned(tags),
            },
            ("selected", ["tags", "remove", tags @ ..]) if !tags.is_empty() => {
                Self::RemoveTags { tags: owned(tags) }
            }
            ("selected", ["download"]) => Self::Download { path: None },
            ("selected", ["download", path]) => Self::Download {
                path: Some(PathBuf::from(*path)),
            },
            ("selected", ["rename", name @ ..]) if !name.is_empty() => Self::Rename {
                name: name.join(" "),
            },
            ("selected", ["remove"]) => Self::Remove,
            ("upload", [path]) => Self::Upload {
                path: PathBuf::from(*path),
            },
            ("users", ["add", user]) => Self::AddUser {
                username: user.to_string(),
            },
            ("users", ["remove", user]) => Self::RemoveUser {
                username: user.to_string(),
            },
            ("admin", []) => Self::Admin,
            ("events", []) => Self::Events,
            ("events", ["on", topic]) => Self::EventsOn {
                topic: topic.parse()?,
            },
            ("events", ["off", topic]) => Self::EventsOff {
                topic: topic.parse()?,
            },
            ("exit", []) => Self::Exit,
            _ if is_known(head) => return Err(usage(head)),
            _ => return Err(GatewayError::UnknownCommand(head.to_string())),
        };
        Ok(Some(command))
    }
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

/// Split `flag` out of `words`, reporting whether it was present.
fn take_flag(words: &[&str], flag: &str) -> (bool, Vec<String>) {
    let present = words.contains(&flag);
    let rest = words
        .iter()
        .filter(|w| **w != flag)
        .map(|w| w.to_string())
        .collect();
    (present, rest)
}

fn first_word(usage: &str) -> &str {
    usage.split_whitespace().next().unwrap_or_default()
}

fn is_known(head: &str) -> bool {
    COMMANDS.iter().any(|spec| first_word(spec.usage) == head)
}

/// Every usage line sharing the first word `head`.
fn usage(head: &str) -> GatewayError {
    let lines: Vec<&str> = COMMANDS
        .iter()
        .filter(|spec| first_word(spec.usage) == head)
        .map(|spec| spec.usage)
        .collect();
    GatewayError::Usage(lines.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn test_blank_line() {
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn test_free_text_takes_rest_of_line() {
        assert_eq!(
            parse("catalog name the  big --exact lebowski"),
            Command::SearchByName {
                name: "the big lebowski".into(),
                exact: true
            }
        );
        assert_eq!(
            parse("selected rename A New Title"),
            Command::Rename {
                name: "A New Title".into()
            }
        );
    }

    #[test]
    fn test_tag_flags() {
        assert_eq!(
            parse("catalog tags --all scifi noir"),
            Command::SearchByTags {
                tags: vec!["scifi".into(), "noir".into()],
                include_all: true
            }
        );
        assert_eq!(
            parse("selected tags remove a"),
            Command::RemoveTags {
                tags: vec!["a".into()]
            }
        );
    }

    #[test]
    fn test_optional_arguments() {
        assert_eq!(parse("login"), Command::Login { username: None });
        assert_eq!(
            parse("reconnect Other"),
            Command::Reconnect {
                channel: Some("Other".into())
            }
        );
        assert_eq!(
            parse("selected download /tmp/x"),
            Command::Download {
                path: Some(PathBuf::from("/tmp/x"))
            }
        );
    }

    #[test]
    fn test_bad_arguments_report_usage() {
        let err = Command::parse("users add bob hunter2").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Usage: users add <user> | users remove <user>"
        );
        assert!(matches!(
            Command::parse("catalog name --exact"),
            Err(GatewayError::Usage(_))
        ));
    }

    #[test]
    fn test_event_topics() {
        assert_eq!(
            parse("events on catalogupdates"),
            Command::EventsOn {
                topic: Topic::CatalogUpdates
            }
        );
        assert_eq!(
            parse("events off UserUpdates"),
            Command::EventsOff {
                topic: Topic::UserUpdates
            }
        );
        assert!(matches!(
            Command::parse("events on Weather"),
            Err(GatewayError::Topic(_))
        ));
        assert!(matches!(
            Command::parse("events on"),
            Err(GatewayError::Usage(_))
        ));
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            Command::parse("play now"),
            Err(GatewayError::UnknownCommand(word)) if word == "play"
        ));
    }

    #[test]
    fn test_table_is_indexed_by_kind() {
        for (index, spec) in COMMANDS.iter().enumerate() {
            assert_eq!(spec.kind as usize, index, "{}", spec.usage);
        }
        assert_eq!(parse("selected remove").kind().spec().usage, "selected remove");
    }
}
