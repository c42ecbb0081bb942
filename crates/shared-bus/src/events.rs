//! # Bus Events
//!
//! Messages that flow through the shared bus. Every event belongs to exactly
//! one named channel and carries the id of the instance that sent it.
//!
//! Announcements travel on a configurable channel; the other platform
//! updates each have a fixed [`Topic`].

use serde::{Deserialize, Serialize};
use shared_types::entities::{AuthToken, CredentialHash, InstanceId, MediaId, ProxyRef};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Platform topics a client can listen to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Topic {
    Announcements,
    UserUpdates,
    CatalogUpdates,
    FileAvailabilityAnnounce,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::Announcements,
        Topic::UserUpdates,
        Topic::CatalogUpdates,
        Topic::FileAvailabilityAnnounce,
    ];

    /// Channel name on the bus.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Announcements => "Announcements",
            Self::UserUpdates => "UserUpdates",
            Self::CatalogUpdates => "CatalogUpdates",
            Self::FileAvailabilityAnnounce => "FileAvailabilityAnnounce",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown topic `{0}`")]
pub struct UnknownTopic(pub String);

impl FromStr for Topic {
    type Err = UnknownTopic;

    /// Topic names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|topic| topic.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

/// A service instance asserting it is alive.
///
/// The proxy is opaque: receivers decide which interface it implements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAnnouncement {
    pub channel: String,
    pub origin_id: InstanceId,
    pub proxy: ProxyRef,
}

impl ServiceAnnouncement {
    pub fn new(channel: impl Into<String>, origin_id: InstanceId, proxy: ProxyRef) -> Self {
        Self {
            channel: channel.into(),
            origin_id,
            proxy,
        }
    }
}

/// Account changes published by an authentication service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserChange {
    NewToken { user: String, token: AuthToken },
    RevokeToken { token: AuthToken },
    NewUser { user: String, credential: CredentialHash },
    RemoveUser { user: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserUpdate {
    pub origin_id: InstanceId,
    pub change: UserChange,
}

/// Catalog edits published by a catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CatalogChange {
    RenameTile {
        media_id: MediaId,
        name: String,
    },
    AddTags {
        media_id: MediaId,
        user: String,
        tags: Vec<String>,
    },
    RemoveTags {
        media_id: MediaId,
        user: String,
        tags: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogUpdate {
    pub origin_id: InstanceId,
    pub change: CatalogChange,
}

/// Media a file service currently holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAvailability {
    pub origin_id: InstanceId,
    pub media_ids: Vec<MediaId>,
}

/// All events that can be published to the bus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusEvent {
    /// A service instance announced itself.
    ServiceAnnounced(ServiceAnnouncement),
    UserUpdated(UserUpdate),
    CatalogUpdated(CatalogUpdate),
    FilesAnnounced(FileAvailability),
}

impl BusEvent {
    /// Channel this event was published on.
    #[must_use]
    pub fn channel(&self) -> &str {
        match self {
            Self::ServiceAnnounced(a) => &a.channel,
            Self::UserUpdated(_) => Topic::UserUpdates.as_str(),
            Self::CatalogUpdated(_) => Topic::CatalogUpdates.as_str(),
            Self::FilesAnnounced(_) => Topic::FileAvailabilityAnnounce.as_str(),
        }
    }

    /// Instance that published the event.
    #[must_use]
    pub fn origin(&self) -> &InstanceId {
        match self {
            Self::ServiceAnnounced(a) => &a.origin_id,
            Self::UserUpdated(u) => &u.origin_id,
            Self::CatalogUpdated(c) => &c.origin_id,
            Self::FilesAnnounced(f) => &f.origin_id,
        }
    }

    /// Name of the platform operation behind the event.
    #[must_use]
    pub fn operation(&self) -> &'static str {
        match self {
            Self::ServiceAnnounced(_) => "announce",
            Self::UserUpdated(u) => match u.change {
                UserChange::NewToken { .. } => "newToken",
                UserChange::RevokeToken { .. } => "revokeToken",
                UserChange::NewUser { .. } => "newUser",
                UserChange::RemoveUser { .. } => "removeUser",
            },
            Self::CatalogUpdated(c) => match c.change {
                CatalogChange::RenameTile { .. } => "renameTile",
                CatalogChange::AddTags { .. } => "addTags",
                CatalogChange::RemoveTags { .. } => "removeTags",
            },
            Self::FilesAnnounced(_) => "announceFiles",
        }
    }

    /// One-line description for event logs. Tokens and credential hashes
    /// are left out.
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::ServiceAnnounced(a) => format!("announce {}", a.proxy),
            Self::UserUpdated(u) => match &u.change {
                UserChange::NewToken { user, .. } => format!("create token for {user}"),
                UserChange::RevokeToken { .. } => "revoke a token".to_string(),
                UserChange::NewUser { user, .. } => format!("create user {user}"),
                UserChange::RemoveUser { user } => format!("remove user {user}"),
            },
            Self::CatalogUpdated(c) => match &c.change {
                CatalogChange::RenameTile { media_id, name } => {
                    format!("rename tile {media_id} to {name}")
                }
                CatalogChange::AddTags {
                    media_id,
                    user,
                    tags,
                } => format!("add tags [{}] to {media_id} for {user}", tags.join(", ")),
                CatalogChange::RemoveTags {
                    media_id,
                    user,
                    tags,
                } => format!("remove tags [{}] from {media_id} of {user}", tags.join(", ")),
            },
            Self::FilesAnnounced(f) => {
                let ids: Vec<&str> = f.media_ids.iter().map(MediaId::as_str).collect();
                format!("announce files [{}]", ids.join(", "))
            }
        }
    }
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    /// Channels to include. Empty means all channels.
    pub channels: Vec<String>,
    /// Origins to include. Empty means all origins.
    pub origins: Vec<InstanceId>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for a single channel.
    #[must_use]
    pub fn channel(name: impl Into<String>) -> Self {
        Self {
            channels: vec![name.into()],
            origins: Vec::new(),
        }
    }

    /// Create a filter for events from specific instances.
    #[must_use]
    pub fn from_origins(origins: Vec<InstanceId>) -> Self {
        Self {
            channels: Vec::new(),
            origins,
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &BusEvent) -> bool {
        let channel_match =
            self.channels.is_empty() || self.channels.iter().any(|c| c == event.channel());

        let origin_match = self.origins.is_empty() || self.origins.contains(event.origin());

        channel_match && origin_match
    }
}
