//! # Monitor → Gateway Flows
//!
//! Reachability and directory selection as the command layer sees them,
//! driven by real announcements on the bus.

use super::support::{World, MAIN};
use client_runtime::{ClientConfig, ClientRuntime};
use mc_01_discovery::{DirectoryLocator, Reachability};
use mc_04_command_gateway::test_utils::ScriptedPrompter;
use mc_04_command_gateway::Reply;
use shared_types::in_memory::InMemoryDirectory;
use shared_types::{DirectoryService, MediaId};
use std::sync::Arc;
use std::time::{Duration, Instant};

const NO_DIRECTORY: &str = "No directory service available, try again later";

#[tokio::test(start_paused = true)]
async fn test_announced_directory_serves_a_download() {
    let dir = tempfile::tempdir().unwrap();
    let mut world = World::with_download_dir(dir.path().to_path_buf());
    world.monitor.subscribe().unwrap();
    world.announce(MAIN).await;
    assert!(world.monitor.is_reachable());
    assert_eq!(world.gateway.prompt(), "[online] Anonymous> ");

    world.login();
    world.run("catalog name arr");
    assert_eq!(
        world.run("catalog use m1"),
        Reply::ok("Selected m1. name: Arrival")
    );

    let target = dir.path().join("Arrival");
    assert_eq!(
        world.run("selected download"),
        Reply::Ok(format!("Downloaded 10 bytes to {}", target.display()))
    );
    assert_eq!(std::fs::read(target).unwrap(), b"0123456789");
}

#[tokio::test(start_paused = true)]
async fn test_silence_makes_commands_refuse_until_next_announcement() {
    let mut world = World::new();
    world.monitor.subscribe().unwrap();
    world.announce(MAIN).await;
    world.login();

    let mut signal = world.monitor.reachability();
    tokio::time::sleep(Duration::from_secs(13)).await;
    assert_eq!(*signal.borrow_and_update(), Reachability::Unreachable);
    assert_eq!(world.gateway.prompt(), "[offline] alice> ");

    let pings = world.backend.directory.ping_calls();
    assert_eq!(world.run("catalog name Alien"), Reply::Error(NO_DIRECTORY.into()));
    assert_eq!(world.backend.directory.ping_calls(), pings);

    // The session survives the outage.
    world.clock.advance(Duration::from_secs(13));
    world.announce(MAIN).await;
    assert!(signal.has_changed().unwrap());
    assert_eq!(world.run("catalog name Alien"), Reply::ok("m2. name: Alien"));
    assert_eq!(world.gateway.prompt(), "[online] alice> ");
}

#[tokio::test(start_paused = true)]
async fn test_dead_directory_is_evicted_in_favour_of_a_live_one() {
    let mut world = World::new();
    let standby = Arc::new(InMemoryDirectory::new());
    world.register("standby-1", standby.clone() as Arc<dyn DirectoryService>);
    world.monitor.subscribe().unwrap();

    world.announce("standby-1").await;
    world.clock.advance(Duration::from_secs(1));
    world.announce(MAIN).await;

    // Most recently seen first: main, which now stops answering.
    world.backend.directory.set_alive(false);
    let selected = world.monitor.select_active().unwrap();
    assert!(selected.ping().is_ok());
    assert_eq!(standby.ping_calls(), 2);

    let stats = world.monitor.registry_stats();
    assert_eq!(stats.evicted_dead, 1);
    assert_eq!(stats.live_entries, 1);

    // Standby has no services registered: lookups report unavailability.
    let reply = world.run("catalog name Alien");
    assert!(reply.is_error(), "{reply:?}");
}

#[tokio::test(start_paused = true)]
async fn test_every_instance_dead_surfaces_no_active_directory() {
    let mut world = World::new();
    world.monitor.subscribe().unwrap();
    world.announce(MAIN).await;
    world.backend.directory.set_alive(false);

    // Still announcing, so the guard passes; selection finds nothing alive.
    assert!(world.monitor.is_reachable());
    assert_eq!(world.run("catalog name Alien"), Reply::Error(NO_DIRECTORY.into()));
    assert_eq!(world.monitor.registry_stats().live_entries, 0);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_and_reconnect_commands_drive_the_monitor() {
    let mut world = World::new();
    world.monitor.subscribe().unwrap();
    world.announce(MAIN).await;

    assert_eq!(
        world.run("disconnect"),
        Reply::ok("Disconnected from directory announcements")
    );
    assert!(!world.monitor.is_subscribed());
    assert!(!world.monitor.is_reachable());

    // Nobody is listening: the announcement is lost.
    world.announce(MAIN).await;
    assert!(!world.monitor.is_reachable());

    assert_eq!(
        world.run("reconnect"),
        Reply::ok("Listening for announcements on Announcements")
    );
    world.announce(MAIN).await;
    assert!(world.monitor.is_reachable());

    // A different channel hears nothing from the directory.
    world.run("reconnect Staging");
    assert_eq!(world.monitor.channel().as_deref(), Some("Staging"));
    tokio::time::sleep(Duration::from_secs(13)).await;
    assert!(!world.monitor.is_reachable());
}

#[tokio::test(start_paused = true)]
async fn test_removed_media_is_evicted_from_cache() {
    let mut world = World::new();
    world.monitor.subscribe().unwrap();
    world.announce(MAIN).await;
    world.login();
    world.run("catalog name Alien");
    world.run("catalog use m2");

    world.backend.catalog.remove_media(&MediaId::new("m2"));
    let reply = world.run("selected fetch");
    assert!(reply.is_error(), "{reply:?}");

    assert!(world.gateway.cache().get(&MediaId::new("m2")).is_none());
    assert_eq!(
        world.run("selected fetch"),
        Reply::Error("No media selected, use `catalog use <id>` first".into())
    );
}

fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn test_sandbox_runtime_end_to_end() {
    let runtime = ClientRuntime::new(ClientConfig::default()).unwrap();
    runtime.start().unwrap();
    let monitor = runtime.monitor();
    wait_until("sandbox announcement", || monitor.is_reachable());

    let prompter = Arc::new(ScriptedPrompter::with_answers(["user", "admin"]));
    let mut gateway = runtime.gateway(prompter.clone());

    assert_eq!(
        gateway.execute_line("login user"),
        Some(Reply::ok("Logged in as user"))
    );
    assert!(!gateway.execute_line("catalog name sintel").unwrap().is_error());
    gateway.execute_line("catalog use m-0002");
    assert_eq!(
        gateway.execute_line("selected rename Sintel (2010)"),
        Some(Reply::ok("m-0002. name: Sintel (2010)"))
    );
    assert_eq!(prompter.asked(), ["Password", "Administrator password"]);
    assert!(!gateway.session().session().is_elevated());

    let sandbox = runtime.sandbox().unwrap();
    assert_eq!(
        sandbox.backend().catalog.name_of(&MediaId::new("m-0002")).as_deref(),
        Some("Sintel (2010)")
    );

    assert!(runtime.shutdown());
    assert!(!monitor.is_reachable());
    assert_eq!(
        gateway.execute_line("catalog name sintel"),
        Some(Reply::Error(NO_DIRECTORY.into()))
    );
}
