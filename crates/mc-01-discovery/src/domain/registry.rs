//! # Announcement Registry
//!
//! The set of directory instances that announced themselves recently.
//!
//! ## Expiry
//!
//! An entry whose age is strictly greater than the configured expiry is
//! dead: selection and sweeps drop it. An entry exactly at the threshold is
//! still eligible.
//!
//! ## Selection
//!
//! `candidates` drops expired entries and orders the rest most-recently-seen
//! first (instance id breaks ties). `select_active` pings them in that
//! order. The first candidate that answers is returned; every candidate that
//! fails its liveness check is evicted on the way. A failed check never
//! aborts the walk.
//!
//! A ping can block on the network, so the monitor takes the candidates,
//! releases the registry, pings, and hands failures back to `evict_dead`.
//! An instance that re-announced in the meantime is kept.

use super::config::DiscoveryConfig;
use super::types::Timestamp;
use shared_types::InstanceId;
use std::collections::HashMap;
use std::time::Duration;

/// One announced instance.
#[derive(Debug, Clone)]
pub struct AnnouncementEntry<H> {
    pub instance_id: InstanceId,
    pub handle: H,
    pub last_seen: Timestamp,
}

/// Counters describing registry churn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub live_entries: usize,
    pub announcements_recorded: u64,
    pub evicted_expired: u64,
    pub evicted_dead: u64,
}

/// Registry of announced directory instances keyed by instance id.
pub struct AnnouncementRegistry<H> {
    entries: HashMap<InstanceId, AnnouncementEntry<H>>,
    expiry: Duration,
    stats: RegistryStats,
}

impl<H: Clone> AnnouncementRegistry<H> {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            entries: HashMap::new(),
            expiry: config.expiry,
            stats: RegistryStats::default(),
        }
    }

    /// Insert or refresh an entry.
    ///
    /// Returns `true` if the instance was not known before. A refresh
    /// replaces the stored handle, since a restarted instance may announce a
    /// new reference under the same id.
    pub fn record_announcement(&mut self, instance_id: InstanceId, handle: H, now: Timestamp) -> bool {
        self.stats.announcements_recorded += 1;
        let entry = AnnouncementEntry {
            instance_id: instance_id.clone(),
            handle,
            last_seen: now,
        };
        self.entries.insert(instance_id, entry).is_none()
    }

    /// Return a live handle, evicting expired and unresponsive entries.
    ///
    /// `is_alive` is the synchronous liveness check; `false` means the candidate
    /// did not answer.
    pub fn select_active(&mut self, now: Timestamp, mut is_alive: impl FnMut(&H) -> bool) -> Option<H> {
        for candidate in self.candidates(now) {
            if is_alive(&candidate.handle) {
                return Some(candidate.handle);
            }
            self.evict_dead(&candidate);
        }
        None
    }

    /// Sweep expired entries and return the rest in selection order.
    ///
    /// Callers that ping without holding the registry report failures back
    /// through [`evict_dead`](Self::evict_dead).
    pub fn candidates(&mut self, now: Timestamp) -> Vec<AnnouncementEntry<H>> {
        self.sweep_expired(now);
        let mut candidates: Vec<_> = self.entries.values().cloned().collect();
        candidates.sort_by(|a, b| {
            b.last_seen
                .cmp(&a.last_seen)
                .then_with(|| a.instance_id.cmp(&b.instance_id))
        });
        candidates
    }

    /// Evict a candidate that failed its liveness check, unless the instance announced
    /// itself again since the candidate was taken.
    pub fn evict_dead(&mut self, candidate: &AnnouncementEntry<H>) -> bool {
        let unchanged = self
            .entries
            .get(&candidate.instance_id)
            .is_some_and(|e| e.last_seen == candidate.last_seen);
        if unchanged {
            self.entries.remove(&candidate.instance_id);
            self.stats.evicted_dead += 1;
        }
        unchanged
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep_expired(&mut self, now: Timestamp) -> usize {
        let expiry = self.expiry;
        let before = self.entries.len();
        self.entries
            .retain(|_, e| now.saturating_since(e.last_seen) <= expiry);
        let removed = before - self.entries.len();
        self.stats.evicted_expired += removed as u64;
        removed
    }

    pub fn remove(&mut self, instance_id: &InstanceId) -> bool {
        self.entries.remove(instance_id).is_some()
    }

    pub fn contains(&self, instance_id: &InstanceId) -> bool {
        self.entries.contains_key(instance_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Instance ids with their age at `now`, freshest first.
    pub fn snapshot(&self, now: Timestamp) -> Vec<(InstanceId, Duration)> {
        let mut ages: Vec<_> = self
            .entries
            .values()
            .map(|e| (e.instance_id.clone(), now.saturating_since(e.last_seen)))
            .collect();
        ages.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        ages
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            live_entries: self.entries.len(),
            ..self.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AnnouncementRegistry<&'static str> {
        AnnouncementRegistry::new(&DiscoveryConfig::default())
    }

    fn id(s: &str) -> InstanceId {
        InstanceId::new(s)
    }

    #[test]
    fn test_empty_registry_selects_nothing() {
        let mut reg = registry();
        assert_eq!(reg.select_active(Timestamp::from_secs(0), |_| true), None);
    }

    #[test]
    fn test_expiry_boundary_is_strict() {
        let mut reg = registry();
        reg.record_announcement(id("x"), "X", Timestamp::from_secs(0));

        assert_eq!(reg.select_active(Timestamp::from_secs(11), |_| true), Some("X"));
        assert_eq!(reg.select_active(Timestamp::from_secs(12), |_| true), Some("X"));
        assert_eq!(
            reg.select_active(Timestamp::from_millis(12_001), |_| true),
            None
        );
        assert!(!reg.contains(&id("x")));
    }

    #[test]
    fn test_refresh_extends_lifetime() {
        let mut reg = registry();
        assert!(reg.record_announcement(id("x"), "X", Timestamp::from_secs(0)));
        assert!(!reg.record_announcement(id("x"), "X", Timestamp::from_secs(10)));

        assert_eq!(reg.select_active(Timestamp::from_secs(20), |_| true), Some("X"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_dead_candidate_is_evicted_and_next_tried() {
        let mut reg = registry();
        reg.record_announcement(id("old"), "OLD", Timestamp::from_secs(1));
        reg.record_announcement(id("new"), "NEW", Timestamp::from_secs(2));

        let mut pinged = Vec::new();
        let selected = reg.select_active(Timestamp::from_secs(3), |h| {
            pinged.push(*h);
            *h != "NEW"
        });

        assert_eq!(selected, Some("OLD"));
        assert_eq!(pinged, vec!["NEW", "OLD"]);
        assert!(!reg.contains(&id("new")));
        assert_eq!(reg.stats().evicted_dead, 1);
    }

    #[test]
    fn test_all_dead_exhausts_registry() {
        let mut reg = registry();
        reg.record_announcement(id("a"), "A", Timestamp::from_secs(1));
        reg.record_announcement(id("b"), "B", Timestamp::from_secs(1));

        assert_eq!(reg.select_active(Timestamp::from_secs(2), |_| false), None);
        assert!(reg.is_empty());
    }

    #[test]
    fn test_tie_break_is_deterministic() {
        let mut reg = registry();
        reg.record_announcement(id("b"), "B", Timestamp::from_secs(1));
        reg.record_announcement(id("a"), "A", Timestamp::from_secs(1));

        assert_eq!(reg.select_active(Timestamp::from_secs(2), |_| true), Some("A"));
    }

    #[test]
    fn test_expired_entries_are_not_pinged() {
        let mut reg = registry();
        reg.record_announcement(id("stale"), "STALE", Timestamp::from_secs(0));
        reg.record_announcement(id("fresh"), "FRESH", Timestamp::from_secs(10));

        let mut pinged = Vec::new();
        let selected = reg.select_active(Timestamp::from_secs(15), |h| {
            pinged.push(*h);
            true
        });

        assert_eq!(selected, Some("FRESH"));
        assert_eq!(pinged, vec!["FRESH"]);
        assert_eq!(reg.stats().evicted_expired, 1);
    }

    #[test]
    fn test_reannounced_candidate_survives_failed_ping() {
        let mut reg = registry();
        reg.record_announcement(id("x"), "X", Timestamp::from_secs(1));
        let taken = reg.candidates(Timestamp::from_secs(2));
        assert_eq!(taken.len(), 1);

        // Announced again while the ping was in flight.
        reg.record_announcement(id("x"), "X", Timestamp::from_secs(3));
        assert!(!reg.evict_dead(&taken[0]));
        assert!(reg.contains(&id("x")));
        assert_eq!(reg.stats().evicted_dead, 0);

        let retaken = reg.candidates(Timestamp::from_secs(4));
        assert!(reg.evict_dead(&retaken[0]));
        assert!(reg.is_empty());
        assert!(!reg.evict_dead(&retaken[0]));
        assert_eq!(reg.stats().evicted_dead, 1);
    }

    #[test]
    fn test_candidates_are_freshest_first() {
        let mut reg = registry();
        reg.record_announcement(id("b"), "B", Timestamp::from_secs(1));
        reg.record_announcement(id("a"), "A", Timestamp::from_secs(1));
        reg.record_announcement(id("c"), "C", Timestamp::from_secs(2));

        let order: Vec<_> = reg
            .candidates(Timestamp::from_secs(3))
            .into_iter()
            .map(|e| e.handle)
            .collect();
        assert_eq!(order, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_sweep_and_snapshot() {
        let mut reg = registry();
        reg.record_announcement(id("a"), "A", Timestamp::from_secs(0));
        reg.record_announcement(id("b"), "B", Timestamp::from_secs(5));

        let snap = reg.snapshot(Timestamp::from_secs(6));
        assert_eq!(snap[0], (id("b"), Duration::from_secs(1)));
        assert_eq!(snap[1], (id("a"), Duration::from_secs(6)));

        assert_eq!(reg.sweep_expired(Timestamp::from_secs(13)), 1);
        assert_eq!(reg.stats().live_entries, 1);
        assert_eq!(reg.stats().announcements_recorded, 2);
    }
}
