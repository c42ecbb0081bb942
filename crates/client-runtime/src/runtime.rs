//! # Client Runtime
//!
//! Owns the tokio runtime and everything that runs on it.
//!
//! ## Background Tasks
//!
//! | Task | Owner | Stops on |
//! |------|-------|----------|
//! | announcement dispatch | `ConnectionMonitor` | unsubscribe / shutdown |
//! | silence timer | `ConnectionMonitor` | unsubscribe / shutdown |
//! | topic event logs | `EventListener` | `events off` / shutdown |
//! | sandbox announcer | runtime | shutdown |
//! | ctrl-c forwarder | runtime | shutdown |
//! | prompt refresher | runtime | shutdown |
//!
//! The command loop itself runs on the calling thread; remote calls block
//! it, never a worker.

use crate::config::ClientConfig;
use crate::console::{Input, InputSender, Terminal};
use crate::sandbox::{run_announcer, Sandbox};
use anyhow::{Context, Result};
use mc_01_discovery::{
    ConnectionMonitor, DirectoryLocator, EventListener, MonotonicClock, TopicListener,
};
use mc_02_session::{SessionState, ThreadSleeper};
use mc_04_command_gateway::{CommandGateway, InteractiveLock, PromptLabel, Prompter};
use parking_lot::Mutex;
use shared_bus::{EventPublisher, EventSubscriber, InMemoryEventBus};
use shared_types::in_memory::InMemoryResolver;
use shared_types::CapabilityResolver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long shutdown waits for background tasks.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

pub struct ClientRuntime {
    config: ClientConfig,
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    bus: Arc<InMemoryEventBus>,
    monitor: Arc<ConnectionMonitor>,
    events: Arc<EventListener>,
    sandbox: Option<Sandbox>,
    shutdown_tx: watch::Sender<bool>,
    shut_down: AtomicBool,
}

impl ClientRuntime {
    /// Build the async runtime, the bus, the sandbox backend (if enabled)
    /// and the connection monitor. Nothing runs until [`start`](Self::start).
    pub fn new(config: ClientConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("mc-worker")
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        let handle = runtime.handle().clone();

        let bus = Arc::new(InMemoryEventBus::new());
        let sandbox = config
            .sandbox
            .enabled
            .then(|| Sandbox::new(&config.sandbox));
        let resolver = match &sandbox {
            Some(sandbox) => sandbox.resolver(),
            None => {
                warn!("Sandbox disabled: announced directories cannot be resolved");
                Arc::new(InMemoryResolver::new()) as Arc<dyn CapabilityResolver>
            }
        };

        let monitor = Arc::new(ConnectionMonitor::new(
            config.discovery_config(),
            Arc::clone(&bus) as Arc<dyn EventSubscriber>,
            resolver,
            Arc::new(MonotonicClock::new()),
            handle.clone(),
        ));
        let events = Arc::new(EventListener::new(
            Arc::clone(&bus) as Arc<dyn EventSubscriber>,
            handle.clone(),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            runtime: Mutex::new(Some(runtime)),
            handle,
            bus,
            monitor,
            events,
            sandbox,
            shutdown_tx,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn monitor(&self) -> Arc<ConnectionMonitor> {
        Arc::clone(&self.monitor)
    }

    pub fn events(&self) -> Arc<EventListener> {
        Arc::clone(&self.events)
    }

    pub fn sandbox(&self) -> Option<&Sandbox> {
        self.sandbox.as_ref()
    }

    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.bus)
    }

    /// Subscribe to announcements and start the sandbox announcer.
    pub fn start(&self) -> Result<()> {
        self.monitor
            .subscribe()
            .context("Failed to subscribe to directory announcements")?;

        if let Some(sandbox) = &self.sandbox {
            self.handle.spawn(run_announcer(
                Arc::clone(&self.bus) as Arc<dyn EventPublisher>,
                sandbox.announcement(&self.config.discovery.channel),
                self.config.announce_interval(),
                self.shutdown_tx.subscribe(),
            ));
        }
        info!(
            channel = %self.config.discovery.channel,
            sandbox = self.sandbox.is_some(),
            "Client runtime started"
        );
        Ok(())
    }

    /// A gateway reading discovery through this runtime's monitor and
    /// serving `events` from its listener.
    pub fn gateway(&self, prompter: Arc<dyn Prompter>) -> CommandGateway {
        let session = SessionState::new(self.config.retry_policy(), Arc::new(ThreadSleeper));
        CommandGateway::new(
            Arc::clone(&self.monitor) as Arc<dyn DirectoryLocator>,
            session,
            prompter,
            self.config.gateway_config(),
        )
        .with_event_listener(Arc::clone(&self.events) as Arc<dyn TopicListener>)
    }

    /// Turn ctrl-c into [`Input::Interrupt`] instead of killing the process.
    pub fn spawn_interrupt_forwarder(&self, sender: InputSender) {
        let mut shutdown = self.shutdown_tx.subscribe();
        self.handle.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    signal = tokio::signal::ctrl_c() => {
                        if let Err(e) = signal {
                            warn!(error = %e, "Cannot listen for ctrl-c");
                            break;
                        }
                        if !sender.send(Input::Interrupt) {
                            break;
                        }
                    }
                }
            }
            debug!("Interrupt forwarder stopped");
        });
    }

    /// Redraw the prompt whenever reachability flips, unless a command holds
    /// the interactive lock.
    pub fn spawn_prompt_refresher(
        &self,
        lock: InteractiveLock,
        label: Arc<Mutex<PromptLabel>>,
        terminal: Arc<Terminal>,
    ) {
        let mut signal = self.monitor.reachability();
        let mut shutdown = self.shutdown_tx.subscribe();
        self.handle.spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    changed = signal.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let reachable = signal.borrow_and_update().is_reachable();
                        redraw_prompt(&lock, &label, &terminal, reachable);
                    }
                }
            }
            debug!("Prompt refresher stopped");
        });
    }

    /// Stop every background task and the async runtime.
    ///
    /// Returns `true` only for the call that performed the shutdown.
    pub fn shutdown(&self) -> bool {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.shutdown_tx.send(true);
        self.events.stop_all();
        self.monitor.shutdown();
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        }
        info!("Client runtime shut down");
        true
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Drop for ClientRuntime {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Returns whether the prompt was redrawn.
fn redraw_prompt(
    lock: &InteractiveLock,
    label: &Mutex<PromptLabel>,
    terminal: &Terminal,
    reachable: bool,
) -> bool {
    match lock.try_hold() {
        Some(_held) => {
            terminal.redraw_prompt(&label.lock().render(reachable));
            true
        }
        None => {
            debug!("Command in progress, prompt redraw skipped");
            false
        }
    }
}
