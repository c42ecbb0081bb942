use shared_types::{Media, MediaId, TileSummary};
use std::collections::BTreeSet;
use std::fmt;

/// Whatever is currently known about one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialMediaRecord {
    pub id: MediaId,
    pub name: Option<String>,
    pub tags: Option<BTreeSet<String>>,
    /// Present once the record has been fetched in full.
    pub full: Option<Media>,
}

impl PartialMediaRecord {
    /// A record known only by id.
    pub fn bare(id: MediaId) -> Self {
        Self {
            id,
            name: None,
            tags: None,
            full: None,
        }
    }

    /// Projection returned by a name search.
    pub fn named(id: MediaId, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::bare(id)
        }
    }

    /// Projection returned by a tag search.
    pub fn tagged<I, S>(id: MediaId, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: Some(tags.into_iter().map(Into::into).collect()),
            ..Self::bare(id)
        }
    }

    /// A full fetch fills every field.
    pub fn from_media(media: Media) -> Self {
        Self {
            id: media.id.clone(),
            name: Some(media.info.name.clone()),
            tags: Some(media.info.tags.clone()),
            full: Some(media),
        }
    }

    pub fn known_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|n| !n.is_empty())
    }

    pub fn known_tags(&self) -> Option<&BTreeSet<String>> {
        self.tags.as_ref().filter(|t| !t.is_empty())
    }

    /// Fold `incoming` into `self`, field by field. A full record is taken
    /// first; projected name or tags then override it and the cached full
    /// record alike.
    ///
    /// Returns `true` if anything changed.
    pub fn absorb(&mut self, incoming: PartialMediaRecord) -> bool {
        let mut changed = false;

        if let Some(full) = incoming.full {
            changed |= self.full.as_ref() != Some(&full);
            if !full.info.name.is_empty() {
                self.name = Some(full.info.name.clone());
            }
            if !full.info.tags.is_empty() {
                self.tags = Some(full.info.tags.clone());
            }
            self.full = Some(full);
        }
        if let Some(name) = incoming.name.filter(|n| !n.is_empty()) {
            changed |= self.name.as_ref() != Some(&name);
            if let Some(full) = &mut self.full {
                changed |= full.info.name != name;
                full.info.name = name.clone();
            }
            self.name = Some(name);
        }
        if let Some(tags) = incoming.tags.filter(|t| !t.is_empty()) {
            changed |= self.tags.as_ref() != Some(&tags);
            if let Some(full) = &mut self.full {
                changed |= full.info.tags != tags;
                full.info.tags = tags.clone();
            }
            self.tags = Some(tags);
        }
        changed
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = Some(name.to_string());
        if let Some(full) = &mut self.full {
            full.info.name = name.to_string();
        }
    }

    /// Replace the tag set after a confirmed remote edit. An empty result
    /// becomes unknown.
    pub(crate) fn set_tags(&mut self, tags: BTreeSet<String>) {
        if let Some(full) = &mut self.full {
            full.info.tags = tags.clone();
        }
        self.tags = (!tags.is_empty()).then_some(tags);
    }
}

impl From<TileSummary> for PartialMediaRecord {
    fn from(tile: TileSummary) -> Self {
        Self {
            id: tile.id,
            name: tile.name,
            tags: tile.tags,
            full: None,
        }
    }
}

impl fmt::Display for PartialMediaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.known_name(), self.known_tags()) {
            (None, None) => write!(f, "{}. Nothing to show", self.id),
            (name, tags) => {
                write!(f, "{}.", self.id)?;
                if let Some(name) = name {
                    write!(f, " name: {name}")?;
                }
                if let Some(tags) = tags {
                    let joined: Vec<&str> = tags.iter().map(String::as_str).collect();
                    if name.is_some() {
                        write!(f, " ->")?;
                    }
                    write!(f, " tags: {}", joined.join(","))?;
                }
                Ok(())
            }
        }
    }
}
