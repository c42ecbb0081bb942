use crate::domain::{ElevationOutcome, RetryPolicy, Session, SessionError, SessionStatus};
use crate::ports::Sleeper;
use shared_types::{AuthToken, CredentialHash, DirectoryService, RemoteError, RemoteResult};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Owner of the client's session.
///
/// Every remote call takes the directory to talk to as an argument, so the
/// session never holds on to a directory that may have gone away.
pub struct SessionState {
    session: Session,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl SessionState {
    pub fn new(policy: RetryPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            session: Session::anonymous(),
            policy,
            sleeper,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Authenticate as `username`.
    ///
    /// The previous session is dropped first; on any failure the client is
    /// left anonymous.
    pub fn login(
        &mut self,
        directory: &dyn DirectoryService,
        username: &str,
        password: &str,
    ) -> Result<(), SessionError> {
        self.session = Session::anonymous();
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::CredentialsRejected);
        }

        let credential_hash = CredentialHash::derive(password);
        let token = self.with_retry("login", || {
            directory
                .authenticator()?
                .refresh_authorization(username, &credential_hash)
        })?;

        self.session = Session::authenticated(username, credential_hash, token);
        info!(user = %username, "Logged in");
        Ok(())
    }

    /// Obtain a new user token with the stored credential hash.
    ///
    /// On failure the session is left as it was; the caller decides whether
    /// to log out.
    pub fn refresh(&mut self, directory: &dyn DirectoryService) -> Result<(), SessionError> {
        let (Some(username), Some(hash)) = (self.session.username(), self.session.credential_hash())
        else {
            return Err(SessionError::CredentialsRejected);
        };
        let (username, hash) = (username.to_string(), hash.clone());

        let token = self.with_retry("refresh", || {
            directory
                .authenticator()?
                .refresh_authorization(&username, &hash)
        })?;

        self.session.replace_user_token(token);
        debug!(user = %username, "Token refreshed");
        Ok(())
    }

    /// Verify `admin_secret` remotely and switch to the administrative
    /// credential.
    ///
    /// Already elevated sessions are left untouched so the outermost
    /// elevation keeps its snapshot.
    pub fn elevate(
        &mut self,
        directory: &dyn DirectoryService,
        admin_secret: &str,
    ) -> Result<ElevationOutcome, SessionError> {
        if self.session.is_elevated() {
            return Ok(ElevationOutcome::AlreadyElevated);
        }

        let admin_token = AuthToken::new(CredentialHash::derive(admin_secret).as_str());
        let accepted = self.with_retry("elevate", || {
            directory.authenticator()?.is_admin(&admin_token)
        })?;
        if !accepted {
            warn!("Elevation rejected");
            return Err(SessionError::ElevationRejected);
        }

        let outcome = self.session.elevate(admin_token);
        info!(user = %self.session.display_name(), "Session elevated");
        Ok(outcome)
    }

    /// Leave elevation, restoring the pre-elevation token. No-op when not
    /// elevated.
    pub fn de_elevate(&mut self) -> bool {
        let changed = self.session.de_elevate();
        if changed {
            info!(user = %self.session.display_name(), "Administrator privileges dropped");
        }
        changed
    }

    /// Replace the session with an anonymous one. Elevation state is
    /// discarded, not restored.
    pub fn logout(&mut self) {
        if !self.session.is_anonymous() || self.session.is_elevated() {
            info!(user = %self.session.display_name(), "Logged out");
        }
        self.session = Session::anonymous();
    }

    /// Admin credential for privileged calls, `None` unless elevated.
    pub fn admin_token(&self) -> Option<&AuthToken> {
        if self.session.is_elevated() {
            self.session.current_token()
        } else {
            None
        }
    }

    fn with_retry<T>(
        &self,
        operation: &'static str,
        mut attempt: impl FnMut() -> RemoteResult<T>,
    ) -> Result<T, SessionError> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match attempt() {
                Ok(value) => return Ok(value),
                Err(RemoteError::TemporaryUnavailable) if attempts <= self.policy.max_retries => {
                    warn!(
                        operation,
                        attempt = attempts,
                        delay_secs = self.policy.delay.as_secs(),
                        "Authentication service unavailable, retrying"
                    );
                    self.sleeper.sleep(self.policy.delay);
                }
                Err(err) => {
                    debug!(operation, attempts, error = %err, "Giving up");
                    return Err(SessionError::from_remote(err, attempts));
                }
            }
        }
    }
}
