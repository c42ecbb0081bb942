use shared_types::{AuthToken, CredentialHash};

pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Coarse state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
    Elevated,
}

/// Result of an elevation request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElevationOutcome {
    /// The session was not elevated before this call.
    Elevated,
    /// Nothing changed; the caller must not de-elevate afterwards.
    AlreadyElevated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Identity {
    username: String,
    credential_hash: CredentialHash,
}

/// Snapshot taken when elevating.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Elevation {
    saved_prior_token: Option<AuthToken>,
}

/// The single live session of the client.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    identity: Option<Identity>,
    current_token: Option<AuthToken>,
    elevation: Option<Elevation>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub(crate) fn authenticated(
        username: &str,
        credential_hash: CredentialHash,
        token: AuthToken,
    ) -> Self {
        Self {
            identity: Some(Identity {
                username: username.to_string(),
                credential_hash,
            }),
            current_token: Some(token),
            elevation: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.elevation.is_some() {
            SessionStatus::Elevated
        } else if self.identity.is_some() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }

    pub fn display_name(&self) -> &str {
        self.identity
            .as_ref()
            .map_or(ANONYMOUS_NAME, |i| i.username.as_str())
    }

    pub fn is_anonymous(&self) -> bool {
        self.identity.is_none()
    }

    pub fn is_elevated(&self) -> bool {
        self.elevation.is_some()
    }

    /// Token attached to remote calls. The administrative credential while
    /// elevated.
    pub fn current_token(&self) -> Option<&AuthToken> {
        self.current_token.as_ref()
    }

    /// The user's own token, whether or not the session is elevated.
    pub fn user_token(&self) -> Option<&AuthToken> {
        match &self.elevation {
            Some(e) => e.saved_prior_token.as_ref(),
            None => self.current_token.as_ref(),
        }
    }

    pub fn saved_prior_token(&self) -> Option<&AuthToken> {
        self.elevation.as_ref().and_then(|e| e.saved_prior_token.as_ref())
    }

    pub fn credential_hash(&self) -> Option<&CredentialHash> {
        self.identity.as_ref().map(|i| &i.credential_hash)
    }

    pub(crate) fn username(&self) -> Option<&str> {
        self.identity.as_ref().map(|i| i.username.as_str())
    }

    /// Install a freshly issued user token.
    pub(crate) fn replace_user_token(&mut self, token: AuthToken) {
        match &mut self.elevation {
            Some(e) => e.saved_prior_token = Some(token),
            None => self.current_token = Some(token),
        }
    }

    pub(crate) fn elevate(&mut self, admin_token: AuthToken) -> ElevationOutcome {
        if self.elevation.is_some() {
            return ElevationOutcome::AlreadyElevated;
        }
        self.elevation = Some(Elevation {
            saved_prior_token: self.current_token.replace(admin_token),
        });
        ElevationOutcome::Elevated
    }

    /// Restore the parked token. Returns `false` when not elevated.
    pub(crate) fn de_elevate(&mut self) -> bool {
        let Some(elevation) = self.elevation.take() else {
            return false;
        };
        self.current_token = elevation.saved_prior_token;
        if self.current_token.is_none() {
            self.identity = None;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Session {
        Session::authenticated("alice", CredentialHash::derive("pw"), AuthToken::new("T1"))
    }

    #[test]
    fn test_anonymous_session() {
        let session = Session::anonymous();
        assert_eq!(session.status(), SessionStatus::Anonymous);
        assert_eq!(session.display_name(), "Anonymous");
        assert!(session.current_token().is_none());
    }

    #[test]
    fn test_elevation_parks_user_token() {
        let mut session = alice();
        assert_eq!(
            session.elevate(AuthToken::new("ADMIN")),
            ElevationOutcome::Elevated
        );
        assert_eq!(session.status(), SessionStatus::Elevated);
        assert_eq!(session.current_token(), Some(&AuthToken::new("ADMIN")));
        assert_eq!(session.user_token(), Some(&AuthToken::new("T1")));
        assert_eq!(session.display_name(), "alice");
    }

    #[test]
    fn test_nested_elevation_keeps_snapshot() {
        let mut session = alice();
        session.elevate(AuthToken::new("ADMIN"));
        assert_eq!(
            session.elevate(AuthToken::new("OTHER")),
            ElevationOutcome::AlreadyElevated
        );
        assert!(session.de_elevate());
        assert_eq!(session.current_token(), Some(&AuthToken::new("T1")));
    }

    #[test]
    fn test_anonymous_elevation_restores_anonymous() {
        let mut session = Session::anonymous();
        session.elevate(AuthToken::new("ADMIN"));
        assert!(session.is_anonymous());
        assert!(session.de_elevate());
        assert_eq!(session, Session::anonymous());
    }

    #[test]
    fn test_refreshed_token_goes_to_snapshot_while_elevated() {
        let mut session = alice();
        session.elevate(AuthToken::new("ADMIN"));
        session.replace_user_token(AuthToken::new("T2"));
        assert_eq!(session.current_token(), Some(&AuthToken::new("ADMIN")));
        session.de_elevate();
        assert_eq!(session.current_token(), Some(&AuthToken::new("T2")));
    }
}
