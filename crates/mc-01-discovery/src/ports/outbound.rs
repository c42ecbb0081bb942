use crate::domain::Timestamp;

/// Where the registry and the silence timer read "now" from.
///
/// Only differences matter. Injected so expiry can be tested without
/// waiting twelve real seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> Timestamp;
}
