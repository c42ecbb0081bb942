//! # Acceptance Scenarios
//!
//! | Scenario | Subsystems | Property |
//! |----------|------------|----------|
//! | A | 1 → 4 | no live directory surfaces `NoActiveDirectory` |
//! | B | 1 | entries expire strictly after 12 s |
//! | C | 4 → 3 | name and tag fragments merge into one record |
//! | D | 2 | elevation round trip restores the user token |
//! | E | 2 | rejected login: no retry, no sleep, still anonymous |

use super::support::{World, MAIN};
use mc_01_discovery::DirectoryLocator;
use mc_02_session::test_utils::RecordingSleeper;
use mc_02_session::{RetryPolicy, SessionError, SessionState, SessionStatus};
use mc_04_command_gateway::Reply;
use shared_types::in_memory::{InMemoryAuthenticator, InMemoryBackend};
use shared_types::{Authenticator, AuthToken, CredentialHash, MediaCatalog, MediaId};
use std::sync::Arc;
use std::time::Duration;

const NO_DIRECTORY: &str = "No directory service available, try again later";

#[tokio::test(start_paused = true)]
async fn scenario_a_no_directory_refuses_dependent_commands() {
    let mut world = World::new();
    world.monitor.subscribe().unwrap();

    assert!(world.monitor.select_active().is_none());
    assert_eq!(world.run("catalog name Arrival"), Reply::Error(NO_DIRECTORY.into()));
    assert_eq!(world.run("login alice"), Reply::Error(NO_DIRECTORY.into()));

    // Refused before asking for anything or touching the backend.
    assert!(world.prompter.asked().is_empty());
    assert_eq!(world.backend.authenticator.refresh_calls(), 0);
    assert_eq!(world.backend.directory.ping_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn scenario_b_announcement_expires_after_twelve_seconds() {
    let world = World::new();
    world.monitor.subscribe().unwrap();
    world.announce(MAIN).await;

    world.clock.advance(Duration::from_secs(11));
    assert!(world.monitor.select_active().is_some());

    world.clock.advance(Duration::from_secs(2));
    assert!(world.monitor.select_active().is_none());

    let stats = world.monitor.registry_stats();
    assert_eq!(stats.live_entries, 0);
    assert_eq!(stats.evicted_expired, 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_c_search_fragments_merge_in_cache() {
    let mut world = World::new();
    world.monitor.subscribe().unwrap();
    world.announce(MAIN).await;
    world.login();

    // alice tags m1 from another client.
    let token = world
        .backend
        .authenticator
        .refresh_authorization("alice", &CredentialHash::derive("pw"))
        .unwrap();
    world
        .backend
        .catalog
        .add_tags(&MediaId::new("m1"), &["t1".to_string()], &token)
        .unwrap();

    assert!(!world.run("catalog name Arrival --exact").is_error());
    assert_eq!(
        world.run("catalog show"),
        Reply::ok("  m1. name: Arrival")
    );

    assert!(!world.run("catalog tags t1").is_error());
    assert_eq!(
        world.run("catalog show"),
        Reply::ok("  m1. name: Arrival -> tags: t1")
    );

    // Same searches again change nothing.
    world.run("catalog name Arrival --exact");
    world.run("catalog tags t1");
    assert_eq!(world.gateway.cache().len(), 1);
    assert_eq!(
        world.gateway.cache().get(&MediaId::new("m1")).unwrap().to_string(),
        "m1. name: Arrival -> tags: t1"
    );
}

fn session_backend() -> InMemoryBackend {
    InMemoryBackend::new(InMemoryAuthenticator::new("secret").with_user("alice", "pw"))
}

#[test]
fn scenario_d_elevation_round_trip_restores_user_token() {
    let backend = session_backend();
    let mut session = SessionState::new(RetryPolicy::default(), Arc::new(RecordingSleeper::new()));
    session
        .login(backend.directory.as_ref(), "alice", "pw")
        .unwrap();
    let user_token = session.session().current_token().cloned().unwrap();

    session.elevate(backend.directory.as_ref(), "secret").unwrap();
    assert_eq!(session.status(), SessionStatus::Elevated);
    assert_eq!(
        session.admin_token(),
        Some(&AuthToken::new(CredentialHash::derive("secret").as_str()))
    );

    assert!(session.de_elevate());
    assert_eq!(session.status(), SessionStatus::Authenticated);
    assert_eq!(session.session().current_token(), Some(&user_token));
    assert!(!session.de_elevate());
}

#[test]
fn scenario_e_rejected_login_is_final() {
    let backend = session_backend();
    let sleeper = Arc::new(RecordingSleeper::new());
    let mut session = SessionState::new(RetryPolicy::default(), sleeper.clone());

    let err = session
        .login(backend.directory.as_ref(), "alice", "wrong")
        .unwrap_err();

    assert_eq!(err, SessionError::CredentialsRejected);
    assert_eq!(session.status(), SessionStatus::Anonymous);
    assert_eq!(backend.authenticator.refresh_calls(), 1);
    assert_eq!(sleeper.count(), 0);
}

#[test]
fn scenario_e_unavailable_login_retries_then_surfaces() {
    let backend = session_backend();
    backend.authenticator.fail_next_refreshes(10);
    let sleeper = Arc::new(RecordingSleeper::new());
    let mut session = SessionState::new(RetryPolicy::default(), sleeper.clone());

    let err = session
        .login(backend.directory.as_ref(), "alice", "pw")
        .unwrap_err();

    assert_eq!(err, SessionError::Unavailable { attempts: 4 });
    assert_eq!(backend.authenticator.refresh_calls(), 4);
    assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5); 3]);
    assert_eq!(session.status(), SessionStatus::Anonymous);
}
