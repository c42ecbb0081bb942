//! Tests for SessionState

use super::*;
use crate::domain::{ElevationOutcome, RetryPolicy, SessionError, SessionStatus};
use crate::test_utils::RecordingSleeper;
use shared_types::in_memory::{InMemoryAuthenticator, InMemoryBackend};
use shared_types::{AuthToken, CredentialHash, DirectoryService};
use std::sync::Arc;
use std::time::Duration;

fn backend() -> InMemoryBackend {
    InMemoryBackend::new(InMemoryAuthenticator::new("secret").with_user("alice", "pw"))
}

fn state() -> (SessionState, Arc<RecordingSleeper>) {
    let sleeper = Arc::new(RecordingSleeper::new());
    (SessionState::new(RetryPolicy::default(), sleeper.clone()), sleeper)
}

fn admin_token() -> AuthToken {
    AuthToken::new(CredentialHash::derive("secret").as_str())
}

#[test]
fn test_login_success() {
    let backend = backend();
    let (mut state, sleeper) = state();

    state.login(backend.directory.as_ref(), "alice", "pw").unwrap();

    assert_eq!(state.status(), SessionStatus::Authenticated);
    assert_eq!(state.session().display_name(), "alice");
    assert_eq!(
        state.session().credential_hash(),
        Some(&CredentialHash::derive("pw"))
    );
    assert!(state.session().current_token().is_some());
    assert_eq!(sleeper.count(), 0);
}

#[test]
fn test_login_unauthorized_aborts_without_retry() {
    let backend = backend();
    let (mut state, sleeper) = state();

    let result = state.login(backend.directory.as_ref(), "alice", "wrong");

    assert_eq!(result, Err(SessionError::CredentialsRejected));
    assert_eq!(state.status(), SessionStatus::Anonymous);
    assert_eq!(backend.authenticator.refresh_calls(), 1);
    assert_eq!(sleeper.count(), 0);
}

#[test]
fn test_login_retries_exactly_max_retries() {
    let backend = backend();
    backend.authenticator.fail_next_refreshes(10);
    let (mut state, sleeper) = state();

    let result = state.login(backend.directory.as_ref(), "alice", "pw");

    assert_eq!(result, Err(SessionError::Unavailable { attempts: 4 }));
    assert_eq!(backend.authenticator.refresh_calls(), 4);
    assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5); 3]);
    assert_eq!(state.status(), SessionStatus::Anonymous);
}

#[test]
fn test_login_recovers_after_transient_failures() {
    let backend = backend();
    backend.authenticator.fail_next_refreshes(2);
    let (mut state, sleeper) = state();

    state.login(backend.directory.as_ref(), "alice", "pw").unwrap();

    assert_eq!(state.status(), SessionStatus::Authenticated);
    assert_eq!(sleeper.count(), 2);
}

#[test]
fn test_unregistered_authenticator_counts_as_transient() {
    let backend = backend();
    backend.directory.fail_next_lookups(1);
    let (mut state, sleeper) = state();

    state.login(backend.directory.as_ref(), "alice", "pw").unwrap();
    assert_eq!(sleeper.count(), 1);
}

#[test]
fn test_empty_credentials_rejected_locally() {
    let backend = backend();
    let (mut state, _) = state();

    let result = state.login(backend.directory.as_ref(), "", "pw");

    assert_eq!(result, Err(SessionError::CredentialsRejected));
    assert_eq!(backend.authenticator.refresh_calls(), 0);
}

#[test]
fn test_refresh_replaces_token() {
    let backend = backend();
    let (mut state, _) = state();
    state.login(backend.directory.as_ref(), "alice", "pw").unwrap();
    let before = state.session().current_token().cloned();

    state.refresh(backend.directory.as_ref()).unwrap();

    assert_ne!(state.session().current_token().cloned(), before);
    assert_eq!(backend.authenticator.refresh_calls(), 2);
}

#[test]
fn test_refresh_without_credentials_is_rejected() {
    let backend = backend();
    let (mut state, _) = state();

    assert_eq!(
        state.refresh(backend.directory.as_ref()),
        Err(SessionError::CredentialsRejected)
    );
    assert_eq!(backend.authenticator.refresh_calls(), 0);
}

#[test]
fn test_refresh_failure_leaves_session_unchanged() {
    let backend = backend();
    let (mut state, _) = state();
    state.login(backend.directory.as_ref(), "alice", "pw").unwrap();
    let snapshot = state.session().clone();

    backend.authenticator.forget_user("alice");
    assert_eq!(
        state.refresh(backend.directory.as_ref()),
        Err(SessionError::CredentialsRejected)
    );
    assert_eq!(state.session(), &snapshot);
}

#[test]
fn test_elevate_then_de_elevate_restores_token() {
    let backend = backend();
    let (mut state, _) = state();
    state.login(backend.directory.as_ref(), "alice", "pw").unwrap();
    let t1 = state.session().current_token().cloned().unwrap();

    let outcome = state.elevate(backend.directory.as_ref(), "secret").unwrap();

    assert_eq!(outcome, ElevationOutcome::Elevated);
    assert_eq!(state.status(), SessionStatus::Elevated);
    assert_eq!(state.session().current_token(), Some(&admin_token()));
    assert_eq!(state.admin_token(), Some(&admin_token()));

    assert!(state.de_elevate());
    assert_eq!(state.session().current_token(), Some(&t1));
    assert_eq!(state.admin_token(), None);
    assert_eq!(state.session().saved_prior_token(), None);
}

#[test]
fn test_de_elevate_without_elevate_is_noop() {
    let backend = backend();
    let (mut state, _) = state();
    state.login(backend.directory.as_ref(), "alice", "pw").unwrap();
    let snapshot = state.session().clone();

    assert!(!state.de_elevate());
    assert_eq!(state.session(), &snapshot);
}

#[test]
fn test_wrong_admin_secret_leaves_session_unchanged() {
    let backend = backend();
    let (mut state, _) = state();
    state.login(backend.directory.as_ref(), "alice", "pw").unwrap();
    let snapshot = state.session().clone();

    assert_eq!(
        state.elevate(backend.directory.as_ref(), "guess"),
        Err(SessionError::ElevationRejected)
    );
    assert_eq!(state.session(), &snapshot);
}

#[test]
fn test_nested_elevation_is_reported() {
    let backend = backend();
    let (mut state, _) = state();
    state.elevate(backend.directory.as_ref(), "secret").unwrap();

    assert_eq!(
        state.elevate(backend.directory.as_ref(), "secret").unwrap(),
        ElevationOutcome::AlreadyElevated
    );
    assert_eq!(state.status(), SessionStatus::Elevated);
}

#[test]
fn test_anonymous_elevation_returns_to_anonymous() {
    let backend = backend();
    let (mut state, _) = state();
    state.elevate(backend.directory.as_ref(), "secret").unwrap();

    state.de_elevate();

    assert_eq!(state.status(), SessionStatus::Anonymous);
    assert!(state.session().current_token().is_none());
}

#[test]
fn test_logout_discards_elevation() {
    let backend = backend();
    let (mut state, _) = state();
    state.login(backend.directory.as_ref(), "alice", "pw").unwrap();
    state.elevate(backend.directory.as_ref(), "secret").unwrap();

    state.logout();

    assert_eq!(state.status(), SessionStatus::Anonymous);
    assert!(state.session().current_token().is_none());
    assert!(!state.de_elevate());
}

#[test]
fn test_directory_trait_object_is_accepted() {
    let backend = backend();
    let directory: Arc<dyn DirectoryService> = backend.directory_capability();
    let (mut state, _) = state();

    state.login(directory.as_ref(), "alice", "pw").unwrap();
    assert_eq!(state.status(), SessionStatus::Authenticated);
}
