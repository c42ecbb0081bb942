//! Listener accounting per channel.
//!
//! The broadcast sender only knows how many receivers exist overall. The
//! table records which channels those receivers listen on, so callers can
//! ask whether anybody is still listening on `Announcements` after a
//! reconnect to another channel.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Key for subscriptions without a channel restriction.
const WILDCARD: &str = "*";

#[derive(Debug, Clone, Default)]
pub(crate) struct ChannelTable {
    listeners: Arc<Mutex<HashMap<String, usize>>>,
}

impl ChannelTable {
    /// Register one listener on `channels` (empty means every channel).
    pub(crate) fn join(&self, channels: &[String]) -> ListenerGuard {
        let key = if channels.is_empty() {
            WILDCARD.to_string()
        } else {
            channels.join(",")
        };
        *self.listeners.lock().entry(key.clone()).or_default() += 1;
        ListenerGuard {
            table: self.clone(),
            key,
        }
    }

    pub(crate) fn listeners(&self, key: &str) -> usize {
        self.listeners.lock().get(key).copied().unwrap_or(0)
    }

    fn leave(&self, key: &str) {
        let mut listeners = self.listeners.lock();
        if let Some(count) = listeners.get_mut(key) {
            *count -= 1;
            if *count == 0 {
                listeners.remove(key);
            }
        }
    }
}

/// Held by a subscription; releases its slot in the table when dropped.
#[derive(Debug)]
pub(crate) struct ListenerGuard {
    table: ChannelTable,
    key: String,
}

impl ListenerGuard {
    pub(crate) fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        self.table.leave(&self.key);
    }
}
