use shared_types::RemoteError;
use thiserror::Error;

/// Errors surfaced by session operations.
///
/// `CredentialsRejected` covers both a backend rejection and missing local
/// credentials, with one message, so callers cannot tell which it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Invalid credentials or expired session")]
    CredentialsRejected,

    #[error("Authentication service unavailable after {attempts} attempts")]
    Unavailable { attempts: u32 },

    #[error("Administrator credentials rejected")]
    ElevationRejected,

    #[error("Authentication service unreachable: {0}")]
    Unreachable(RemoteError),
}

impl SessionError {
    /// Classify a remote failure that is not retried any further.
    pub(crate) fn from_remote(err: RemoteError, attempts: u32) -> Self {
        match err {
            RemoteError::Unauthorized => Self::CredentialsRejected,
            RemoteError::TemporaryUnavailable => Self::Unavailable { attempts },
            other => Self::Unreachable(other),
        }
    }
}
