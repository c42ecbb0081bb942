//! The two long-lived background loops behind a subscription.

use super::state::ReachabilityState;
use crate::ports::AnnouncementHandler;
use shared_bus::{BusEvent, Subscription, Topic};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info};

/// Feed every matching bus event to `handler` until stopped or the bus closes.
pub(crate) async fn run_dispatch(
    mut subscription: Subscription,
    handler: Arc<dyn AnnouncementHandler>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            event = subscription.recv() => match event {
                Some(BusEvent::ServiceAnnounced(announcement)) => {
                    handler.on_announcement(&announcement);
                }
                Some(other) => {
                    debug!(operation = other.operation(), "Not an announcement, ignored");
                }
                None => {
                    debug!("Bus closed, announcement dispatch ending");
                    break;
                }
            },
        }
    }
    debug!("Announcement dispatch stopped");
}

/// Log every event on `topic` until stopped or the bus closes.
pub(crate) async fn run_event_log(
    mut subscription: Subscription,
    topic: Topic,
    logged: Arc<AtomicU64>,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            event = subscription.recv() => match event {
                Some(event) => {
                    logged.fetch_add(1, Ordering::Relaxed);
                    info!(
                        topic = %topic,
                        sender = %event.origin(),
                        operation = event.operation(),
                        "{}",
                        event.summary()
                    );
                }
                None => {
                    debug!(topic = %topic, "Bus closed, event log ending");
                    break;
                }
            },
        }
    }
    debug!(topic = %topic, "Event log stopped");
}

/// Mark the directory unreachable after `timeout` without a reset.
///
/// Firing is edge-triggered: once expired, the timer stays quiet until the
/// next reset re-arms it.
pub(crate) async fn run_silence_timer(
    state: Arc<ReachabilityState>,
    timeout: Duration,
    mut resets: mpsc::Receiver<()>,
    mut stop: watch::Receiver<bool>,
) {
    let sleep = tokio::time::sleep(timeout);
    tokio::pin!(sleep);
    let mut expired = false;

    loop {
        // A pending reset wins over an expiry that became due at the same time.
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            reset = resets.recv() => match reset {
                Some(()) => {
                    sleep.as_mut().reset(Instant::now() + timeout);
                    expired = false;
                }
                None => break,
            },
            () = &mut sleep, if !expired => {
                expired = true;
                if state.mark_unreachable() {
                    info!(
                        silence_secs = timeout.as_secs(),
                        "No announcement received in time, directory unreachable"
                    );
                }
            }
        }
    }
    debug!("Silence timer stopped");
}
