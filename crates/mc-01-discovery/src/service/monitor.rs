use super::processor::{AnnouncementProcessor, SharedRegistry};
use super::state::ReachabilityState;
use super::tasks::{run_dispatch, run_silence_timer};
use crate::domain::{AnnouncementRegistry, DiscoveryConfig, DiscoveryError, Reachability, RegistryStats};
use crate::ports::{AnnouncementHandler, DirectoryLocator, DiscoveryStatus, TimeSource};
use parking_lot::Mutex;
use shared_bus::{EventFilter, EventSubscriber};
use shared_types::{CapabilityResolver, DirectoryService};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A live subscription and the two tasks serving it.
struct ActiveSubscription {
    channel: String,
    stop: watch::Sender<bool>,
    dispatch: JoinHandle<()>,
    timer: JoinHandle<()>,
}

impl ActiveSubscription {
    fn cancel(self) {
        let _ = self.stop.send(true);
        // A task may be inside its handler and not polling `stop`.
        self.dispatch.abort();
        self.timer.abort();
    }
}

/// Connection monitor: subscription handling, the registry and the
/// reachability signal.
///
/// # Example
///
/// ```rust,ignore
/// let monitor = ConnectionMonitor::new(
///     DiscoveryConfig::default(),
///     bus,
///     resolver,
///     Arc::new(MonotonicClock::new()),
///     tokio::runtime::Handle::current(),
/// );
/// monitor.subscribe()?;
/// let mut signal = monitor.reachability();
/// ```
pub struct ConnectionMonitor {
    config: DiscoveryConfig,
    bus: Arc<dyn EventSubscriber>,
    resolver: Arc<dyn CapabilityResolver>,
    time_source: Arc<dyn TimeSource>,
    registry: SharedRegistry,
    state: Arc<ReachabilityState>,
    subscription: Mutex<Option<ActiveSubscription>>,
    runtime: Handle,
    shut_down: AtomicBool,
}

impl ConnectionMonitor {
    pub fn new(
        config: DiscoveryConfig,
        bus: Arc<dyn EventSubscriber>,
        resolver: Arc<dyn CapabilityResolver>,
        time_source: Arc<dyn TimeSource>,
        runtime: Handle,
    ) -> Self {
        let registry = Arc::new(Mutex::new(AnnouncementRegistry::new(&config)));
        Self {
            config,
            bus,
            resolver,
            time_source,
            registry,
            state: Arc::new(ReachabilityState::new()),
            subscription: Mutex::new(None),
            runtime,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Subscribe to the configured channel.
    ///
    /// Returns `Ok(false)` if already subscribed there.
    pub fn subscribe(&self) -> Result<bool, DiscoveryError> {
        let channel = self.config.channel.clone();
        self.subscribe_to(&channel)
    }

    /// Subscribe to `channel`, replacing a subscription to another channel.
    ///
    /// Returns `Ok(false)` if already subscribed to `channel`.
    pub fn subscribe_to(&self, channel: &str) -> Result<bool, DiscoveryError> {
        if channel.is_empty() {
            return Err(DiscoveryError::InvalidChannel);
        }
        let mut slot = self.subscription.lock();
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(DiscoveryError::ShutDown);
        }
        if slot.as_ref().is_some_and(|s| s.channel == channel) {
            debug!(channel = %channel, "Already subscribed");
            return Ok(false);
        }
        if let Some(previous) = slot.take() {
            info!(channel = %previous.channel, "Leaving announcement channel");
            previous.cancel();
        }

        let (stop, stop_rx) = watch::channel(false);
        let (reset_tx, reset_rx) = mpsc::channel(1);
        let handler: Arc<dyn AnnouncementHandler> = Arc::new(AnnouncementProcessor::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.resolver),
            Arc::clone(&self.time_source),
            Arc::clone(&self.state),
            reset_tx,
        ));
        let subscription = self.bus.subscribe(EventFilter::channel(channel));

        let dispatch = self
            .runtime
            .spawn(run_dispatch(subscription, handler, stop_rx.clone()));
        let timer = self.runtime.spawn(run_silence_timer(
            Arc::clone(&self.state),
            self.config.silence_timeout,
            reset_rx,
            stop_rx,
        ));

        info!(channel = %channel, "Listening for directory announcements");
        *slot = Some(ActiveSubscription {
            channel: channel.to_string(),
            stop,
            dispatch,
            timer,
        });
        Ok(true)
    }

    /// Stop listening. Returns `false` if there was nothing to stop.
    ///
    /// Without a silence timer nothing could ever report the directory gone,
    /// so leaving the channel also marks it unreachable.
    pub fn unsubscribe(&self) -> bool {
        let Some(active) = self.subscription.lock().take() else {
            return false;
        };
        info!(channel = %active.channel, "Unsubscribed from announcements");
        active.cancel();
        if self.state.mark_unreachable() {
            info!("Directory unreachable");
        }
        true
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    pub fn channel(&self) -> Option<String> {
        self.subscription.lock().as_ref().map(|s| s.channel.clone())
    }

    /// Directory carried by the latest valid announcement. Cleared when the
    /// silence timer fires or on disconnect.
    pub fn active_directory(&self) -> Option<Arc<dyn DirectoryService>> {
        self.state.active_directory()
    }

    pub fn registry_stats(&self) -> RegistryStats {
        self.registry.lock().stats()
    }

    /// Unsubscribe for good. Later calls are no-ops; later subscribes fail.
    ///
    /// Returns `true` only for the call that performed the shutdown.
    pub fn shutdown(&self) -> bool {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.unsubscribe();
        self.state.mark_unreachable();
        info!("Connection monitor shut down");
        true
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl DirectoryLocator for ConnectionMonitor {
    fn is_reachable(&self) -> bool {
        self.state.current().is_reachable()
    }

    fn reachability(&self) -> watch::Receiver<Reachability> {
        self.state.watch()
    }

    fn select_active(&self) -> Option<Arc<dyn DirectoryService>> {
        let now = self.time_source.now();
        // Liveness checks run with the registry released so announcements keep landing.
        let candidates = self.registry.lock().candidates(now);
        for candidate in candidates {
            match candidate.handle.ping() {
                Ok(()) => return Some(candidate.handle),
                Err(e) => {
                    warn!(
                        instance_id = %candidate.instance_id,
                        error = %e,
                        "Directory failed liveness check, evicting"
                    );
                    self.registry.lock().evict_dead(&candidate);
                }
            }
        }
        None
    }

    fn disconnect(&self) {
        self.unsubscribe();
        self.state.mark_unreachable();
        info!("Disconnected from directory");
    }

    fn reconnect(&self, channel: Option<&str>) -> Result<(), DiscoveryError> {
        let channel = channel.unwrap_or(&self.config.channel);
        self.subscribe_to(channel).map(|_| ())
    }

    fn status(&self) -> DiscoveryStatus {
        let now = self.time_source.now();
        let instances = self
            .registry
            .lock()
            .snapshot(now)
            .into_iter()
            .map(|(id, age)| (id, u64::try_from(age.as_millis()).unwrap_or(u64::MAX)))
            .collect();
        DiscoveryStatus {
            reachability: self.state.current(),
            channel: self.channel(),
            instances,
        }
    }
}

impl Drop for ConnectionMonitor {
    fn drop(&mut self) {
        if let Some(active) = self.subscription.get_mut().take() {
            active.cancel();
        }
    }
}
