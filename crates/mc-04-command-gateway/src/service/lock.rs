use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;

/// Serializes remote commands against prompt redraws.
///
/// The gateway holds it for the whole of a remote command; the runtime's
/// prompt refresher only redraws when it can take it without waiting.
#[derive(Debug, Clone, Default)]
pub struct InteractiveLock(Arc<Mutex<()>>);

impl InteractiveLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is free.
    pub fn hold(&self) -> MutexGuard<'_, ()> {
        self.0.lock()
    }

    /// Take the lock only if nobody holds it.
    pub fn try_hold(&self) -> Option<MutexGuard<'_, ()>> {
        self.0.try_lock()
    }

    pub fn is_held(&self) -> bool {
        self.0.is_locked()
    }
}
