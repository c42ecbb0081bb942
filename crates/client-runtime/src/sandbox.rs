//! # Sandbox Backend
//!
//! In-process directory, authenticator, catalog and file service, plus the
//! task that keeps announcing the directory on the bus. The client talks to
//! it through the same capability traits and bus channel a real deployment
//! would use.

use crate::config::SandboxSection;
use shared_bus::{BusEvent, EventPublisher, ServiceAnnouncement};
use shared_types::in_memory::{InMemoryAuthenticator, InMemoryBackend, InMemoryResolver};
use shared_types::{CapabilityResolver, InstanceId, MediaId, ProxyRef};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Titles served by the sandbox file service: (id, name, contents).
const SEED_MEDIA: &[(&str, &str, &[u8])] = &[
    ("m-0001", "Big Buck Bunny", b"big buck bunny sample stream"),
    ("m-0002", "Sintel", b"sintel sample stream"),
    ("m-0003", "Tears of Steel", b"tears of steel sample stream"),
];

pub struct Sandbox {
    backend: InMemoryBackend,
    resolver: Arc<InMemoryResolver>,
    instance: InstanceId,
    proxy: ProxyRef,
}

impl Sandbox {
    pub fn new(config: &SandboxSection) -> Self {
        let authenticator = config
            .users
            .iter()
            .fold(InMemoryAuthenticator::new(&config.admin_secret), |auth, user| {
                auth.with_user(&user.name, &user.password)
            });
        let backend = InMemoryBackend::new(authenticator);
        for (id, name, contents) in SEED_MEDIA {
            backend.files.add_file(MediaId::new(*id), name, contents.to_vec());
        }

        let instance = InstanceId::new("sandbox-main-1");
        let proxy = ProxyRef::new(format!("Main -t:sandbox:{instance}"));
        let resolver = Arc::new(InMemoryResolver::new());
        resolver.register_directory(&proxy, backend.directory_capability());

        info!(
            instance_id = %instance,
            users = config.users.len(),
            media = SEED_MEDIA.len(),
            "Sandbox backend ready"
        );
        Self {
            backend,
            resolver,
            instance,
            proxy,
        }
    }

    pub fn backend(&self) -> &InMemoryBackend {
        &self.backend
    }

    pub fn resolver(&self) -> Arc<dyn CapabilityResolver> {
        Arc::clone(&self.resolver) as Arc<dyn CapabilityResolver>
    }

    pub fn announcement(&self, channel: &str) -> ServiceAnnouncement {
        ServiceAnnouncement::new(channel, self.instance.clone(), self.proxy.clone())
    }
}

/// Publish `announcement` every `interval`, starting immediately, until
/// `stop` flips.
pub async fn run_announcer(
    bus: Arc<dyn EventPublisher>,
    announcement: ServiceAnnouncement,
    interval: Duration,
    mut stop: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                let receivers = bus
                    .publish(BusEvent::ServiceAnnounced(announcement.clone()))
                    .await;
                debug!(
                    channel = %announcement.channel,
                    instance_id = %announcement.origin_id,
                    receivers,
                    "Announced sandbox directory"
                );
            }
        }
    }
    debug!("Sandbox announcer stopped");
}
