//! Shared fixture: a real bus and connection monitor in front of an
//! in-memory backend, with a gateway reading discovery through the monitor.

use mc_01_discovery::test_utils::ManualTimeSource;
use mc_01_discovery::{ConnectionMonitor, DirectoryLocator, DiscoveryConfig};
use mc_02_session::test_utils::RecordingSleeper;
use mc_02_session::{RetryPolicy, SessionState};
use mc_04_command_gateway::test_utils::ScriptedPrompter;
use mc_04_command_gateway::{CommandGateway, GatewayConfig, Reply};
use shared_bus::{BusEvent, EventPublisher, InMemoryEventBus, ServiceAnnouncement};
use shared_types::in_memory::{InMemoryAuthenticator, InMemoryBackend, InMemoryResolver};
use shared_types::{DirectoryService, InstanceId, MediaId, ProxyRef};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Instance id the backend's directory announces under.
pub const MAIN: &str = "main-1";
pub const CHANNEL: &str = "Announcements";

pub struct World {
    pub bus: Arc<InMemoryEventBus>,
    pub resolver: Arc<InMemoryResolver>,
    pub clock: Arc<ManualTimeSource>,
    pub monitor: Arc<ConnectionMonitor>,
    pub backend: InMemoryBackend,
    pub prompter: Arc<ScriptedPrompter>,
    pub sleeper: Arc<RecordingSleeper>,
    pub gateway: CommandGateway,
}

impl World {
    /// Must run inside a tokio runtime: the monitor spawns onto it.
    pub fn new() -> Self {
        Self::with_download_dir(PathBuf::from("."))
    }

    pub fn with_download_dir(download_dir: PathBuf) -> Self {
        let backend =
            InMemoryBackend::new(InMemoryAuthenticator::new("secret").with_user("alice", "pw"));
        backend
            .files
            .add_file(MediaId::new("m1"), "Arrival", b"0123456789".to_vec());
        backend.catalog.add_media(MediaId::new("m2"), "Alien");

        let bus = Arc::new(InMemoryEventBus::new());
        let resolver = Arc::new(InMemoryResolver::new());
        resolver.register_directory(&ProxyRef::new(MAIN), backend.directory_capability());
        let clock = Arc::new(ManualTimeSource::new());
        let monitor = Arc::new(ConnectionMonitor::new(
            DiscoveryConfig::default(),
            bus.clone(),
            resolver.clone(),
            clock.clone(),
            tokio::runtime::Handle::current(),
        ));

        let prompter = Arc::new(ScriptedPrompter::new());
        let sleeper = Arc::new(RecordingSleeper::new());
        let session = SessionState::new(RetryPolicy::default(), sleeper.clone());
        let gateway = CommandGateway::new(
            monitor.clone() as Arc<dyn DirectoryLocator>,
            session,
            prompter.clone(),
            GatewayConfig {
                chunk_size: 4,
                download_dir,
            },
        );

        Self {
            bus,
            resolver,
            clock,
            monitor,
            backend,
            prompter,
            sleeper,
            gateway,
        }
    }

    /// Make another directory announceable under `instance`.
    pub fn register(&self, instance: &str, directory: Arc<dyn DirectoryService>) {
        self.resolver
            .register_directory(&ProxyRef::new(instance), directory);
    }

    /// Publish one announcement for `instance` and let the monitor see it.
    pub async fn announce(&self, instance: &str) {
        self.bus
            .publish(BusEvent::ServiceAnnounced(ServiceAnnouncement::new(
                CHANNEL,
                InstanceId::new(instance),
                ProxyRef::new(instance),
            )))
            .await;
        settle().await;
    }

    pub fn run(&mut self, line: &str) -> Reply {
        self.gateway
            .execute_line(line)
            .unwrap_or_else(|| panic!("`{line}` produced no reply"))
    }

    pub fn login(&mut self) {
        self.prompter.answer("pw");
        assert_eq!(self.run("login alice"), Reply::ok("Logged in as alice"));
    }
}

/// Let spawned tasks drain their queues.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
