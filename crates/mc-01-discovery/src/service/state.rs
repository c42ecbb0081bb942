use crate::domain::Reachability;
use parking_lot::RwLock;
use shared_types::{DirectoryService, InstanceId};
use std::sync::Arc;
use tokio::sync::watch;

/// The directory the last valid announcement pointed at.
#[derive(Clone)]
pub(crate) struct ActiveDirectory {
    pub(crate) instance_id: InstanceId,
    pub(crate) directory: Arc<dyn DirectoryService>,
}

/// Holder of the reachability signal and the active directory reference.
///
/// Transitions are edge-triggered: watchers are only woken when the value
/// actually flips, and a watcher that falls behind sees only the latest
/// value.
pub struct ReachabilityState {
    sender: watch::Sender<Reachability>,
    active: RwLock<Option<ActiveDirectory>>,
}

impl Default for ReachabilityState {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityState {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(Reachability::Unreachable);
        Self {
            sender,
            active: RwLock::new(None),
        }
    }

    /// Install `directory` as the active reference. Returns `true` when this
    /// flipped the signal to reachable.
    pub fn mark_reachable(&self, instance_id: InstanceId, directory: Arc<dyn DirectoryService>) -> bool {
        *self.active.write() = Some(ActiveDirectory {
            instance_id,
            directory,
        });
        self.transition(Reachability::Reachable)
    }

    /// Drop the active reference. Returns `true` when this flipped the
    /// signal to unreachable.
    pub fn mark_unreachable(&self) -> bool {
        *self.active.write() = None;
        self.transition(Reachability::Unreachable)
    }

    pub fn current(&self) -> Reachability {
        *self.sender.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<Reachability> {
        self.sender.subscribe()
    }

    pub fn active_directory(&self) -> Option<Arc<dyn DirectoryService>> {
        self.active.read().as_ref().map(|a| Arc::clone(&a.directory))
    }

    pub fn active_instance(&self) -> Option<InstanceId> {
        self.active.read().as_ref().map(|a| a.instance_id.clone())
    }

    fn transition(&self, next: Reachability) -> bool {
        self.sender.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::in_memory::InMemoryDirectory;

    #[test]
    fn test_transitions_are_edge_triggered() {
        let state = ReachabilityState::new();
        let mut rx = state.watch();
        let directory: Arc<dyn DirectoryService> = Arc::new(InMemoryDirectory::new());

        assert!(state.mark_reachable(InstanceId::new("a"), Arc::clone(&directory)));
        assert!(rx.has_changed().unwrap());
        rx.borrow_and_update();

        assert!(!state.mark_reachable(InstanceId::new("b"), directory));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(state.active_instance(), Some(InstanceId::new("b")));

        assert!(state.mark_unreachable());
        assert!(!state.mark_unreachable());
        assert!(state.active_directory().is_none());
        assert_eq!(*rx.borrow_and_update(), Reachability::Unreachable);
    }
}
