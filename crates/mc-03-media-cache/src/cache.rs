use crate::errors::CacheError;
use crate::record::PartialMediaRecord;
use shared_types::MediaId;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// What a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub updated: usize,
}

/// Per-id cache of partial catalog records plus the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaCache {
    entries: BTreeMap<MediaId, PartialMediaRecord>,
    selected: Option<MediaId>,
}

impl MediaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a batch of fragments into the cache.
    pub fn merge<I>(&mut self, batch: I) -> MergeStats
    where
        I: IntoIterator<Item = PartialMediaRecord>,
    {
        let mut stats = MergeStats::default();
        for incoming in batch {
            match self.entries.get_mut(&incoming.id) {
                Some(cached) => {
                    if cached.absorb(incoming) {
                        stats.updated += 1;
                    }
                }
                None => {
                    self.entries.insert(incoming.id.clone(), incoming);
                    stats.inserted += 1;
                }
            }
        }
        debug!(
            inserted = stats.inserted,
            updated = stats.updated,
            cached = self.entries.len(),
            "Merged catalog records"
        );
        stats
    }

    pub fn get(&self, media_id: &MediaId) -> Option<&PartialMediaRecord> {
        self.entries.get(media_id)
    }

    /// Records in id order.
    pub fn iter(&self) -> impl Iterator<Item = &PartialMediaRecord> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn select(&mut self, media_id: &MediaId) -> Result<&PartialMediaRecord, CacheError> {
        let record = self
            .entries
            .get(media_id)
            .ok_or_else(|| CacheError::UnknownMedia {
                media_id: media_id.clone(),
            })?;
        self.selected = Some(media_id.clone());
        Ok(record)
    }

    pub fn selected(&self) -> Option<&PartialMediaRecord> {
        self.selected.as_ref().and_then(|id| self.entries.get(id))
    }

    pub fn selected_id(&self) -> Option<&MediaId> {
        self.selected.as_ref()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Remove a record that no longer exists remotely. Clears the selection
    /// if it pointed at `media_id`.
    pub fn evict(&mut self, media_id: &MediaId) -> Option<PartialMediaRecord> {
        if self.selected.as_ref() == Some(media_id) {
            self.selected = None;
        }
        let removed = self.entries.remove(media_id);
        if removed.is_some() {
            debug!(media_id = %media_id, "Evicted cached record");
        }
        removed
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.selected = None;
    }

    /// Mirror a confirmed remote tag addition.
    pub fn add_tags(&mut self, media_id: &MediaId, tags: &[String]) -> Result<(), CacheError> {
        let record = self.entry_mut(media_id)?;
        let mut current = record.tags.clone().unwrap_or_default();
        current.extend(tags.iter().cloned());
        record.set_tags(current);
        Ok(())
    }

    /// Mirror a confirmed remote tag removal.
    pub fn remove_tags(&mut self, media_id: &MediaId, tags: &[String]) -> Result<(), CacheError> {
        let record = self.entry_mut(media_id)?;
        let current: BTreeSet<String> = record
            .tags
            .clone()
            .unwrap_or_default()
            .into_iter()
            .filter(|t| !tags.contains(t))
            .collect();
        record.set_tags(current);
        Ok(())
    }

    /// Mirror a confirmed remote rename.
    pub fn rename(&mut self, media_id: &MediaId, name: &str) -> Result<(), CacheError> {
        self.entry_mut(media_id)?.set_name(name);
        Ok(())
    }

    fn entry_mut(&mut self, media_id: &MediaId) -> Result<&mut PartialMediaRecord, CacheError> {
        self.entries
            .get_mut(media_id)
            .ok_or_else(|| CacheError::UnknownMedia {
                media_id: media_id.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Media;

    fn id(s: &str) -> MediaId {
        MediaId::new(s)
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_name_then_tags() {
        let mut cache = MediaCache::new();
        cache.merge([PartialMediaRecord::named(id("id1"), "A")]);
        cache.merge([PartialMediaRecord::tagged(id("id1"), ["t1"])]);

        let record = cache.get(&id("id1")).unwrap();
        assert_eq!(record.name.as_deref(), Some("A"));
        assert_eq!(record.tags, Some(BTreeSet::from(["t1".to_string()])));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut cache = MediaCache::new();
        cache.merge([
            PartialMediaRecord::named(id("id1"), "A"),
            PartialMediaRecord::tagged(id("id2"), ["x"]),
        ]);
        let batch = vec![
            PartialMediaRecord::tagged(id("id1"), ["t1"]),
            PartialMediaRecord::bare(id("id2")),
            PartialMediaRecord::named(id("id3"), "C"),
        ];

        cache.merge(batch.clone());
        let once = cache.clone();
        let stats = cache.merge(batch);

        assert_eq!(cache, once);
        assert_eq!(stats, MergeStats::default());
    }

    #[test]
    fn test_merge_never_regresses_known_fields() {
        let mut cache = MediaCache::new();
        let media = Media::new(id("id1"), "A", BTreeSet::from(["t1".to_string()]));
        cache.merge([PartialMediaRecord::from_media(media.clone())]);

        cache.merge([PartialMediaRecord::bare(id("id1"))]);
        cache.merge([PartialMediaRecord::tagged(id("id1"), Vec::<String>::new())]);

        let record = cache.get(&id("id1")).unwrap();
        assert_eq!(record.known_name(), Some("A"));
        assert!(record.known_tags().is_some());
        assert_eq!(record.full.as_ref(), Some(&media));
    }

    #[test]
    fn test_merge_stats() {
        let mut cache = MediaCache::new();
        let stats = cache.merge([
            PartialMediaRecord::named(id("a"), "A"),
            PartialMediaRecord::named(id("b"), "B"),
        ]);
        assert_eq!(stats.inserted, 2);

        let stats = cache.merge([PartialMediaRecord::named(id("a"), "A2")]);
        assert_eq!(stats, MergeStats { inserted: 0, updated: 1 });
    }

    #[test]
    fn test_select_unknown_is_rejected() {
        let mut cache = MediaCache::new();
        assert_eq!(
            cache.select(&id("nope")).unwrap_err(),
            CacheError::UnknownMedia { media_id: id("nope") }
        );
        assert!(cache.selected().is_none());
    }

    #[test]
    fn test_evict_clears_selection() {
        let mut cache = MediaCache::new();
        cache.merge([
            PartialMediaRecord::named(id("a"), "A"),
            PartialMediaRecord::named(id("b"), "B"),
        ]);
        cache.select(&id("a")).unwrap();

        cache.evict(&id("b"));
        assert_eq!(cache.selected_id(), Some(&id("a")));

        cache.evict(&id("a"));
        assert!(cache.selected().is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_local_tag_edits() {
        let mut cache = MediaCache::new();
        cache.merge([PartialMediaRecord::named(id("a"), "A")]);

        cache.add_tags(&id("a"), &tags(&["x", "y"])).unwrap();
        assert_eq!(
            cache.get(&id("a")).unwrap().to_string(),
            "a. name: A -> tags: x,y"
        );

        cache.remove_tags(&id("a"), &tags(&["x", "y"])).unwrap();
        assert!(cache.get(&id("a")).unwrap().tags.is_none());
    }

    #[test]
    fn test_rename_updates_full_record() {
        let mut cache = MediaCache::new();
        let media = Media::new(id("a"), "Old", BTreeSet::new());
        cache.merge([PartialMediaRecord::from_media(media)]);

        cache.rename(&id("a"), "New").unwrap();

        let record = cache.get(&id("a")).unwrap();
        assert_eq!(record.known_name(), Some("New"));
        assert_eq!(record.full.as_ref().unwrap().info.name, "New");
        assert!(cache.rename(&id("zzz"), "x").is_err());
    }

    #[test]
    fn test_clear() {
        let mut cache = MediaCache::new();
        cache.merge([PartialMediaRecord::named(id("a"), "A")]);
        cache.select(&id("a")).unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.selected_id().is_none());
    }
}
