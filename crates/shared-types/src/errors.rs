//! # Error Types
//!
//! Failures reported by remote capabilities. Every subsystem classifies
//! backend trouble with [`RemoteError`]; local conditions get their own
//! per-crate error enums.

use crate::entities::MediaId;
use thiserror::Error;

/// How a connection attempt to a remote object failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionFailure {
    /// Nothing is listening at the endpoint.
    Refused,
    /// The connection dropped mid-call.
    Lost,
    /// No answer within the transport deadline.
    Timeout,
}

impl std::fmt::Display for ConnectionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Refused => write!(f, "connection refused"),
            Self::Lost => write!(f, "connection lost"),
            Self::Timeout => write!(f, "connection timed out"),
        }
    }
}

/// Errors a remote capability call can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The credential or token was rejected.
    #[error("Unauthorized")]
    Unauthorized,

    /// The backend has not registered the requested service yet.
    #[error("Service temporarily unavailable")]
    TemporaryUnavailable,

    /// The referenced catalog entry no longer exists.
    #[error("Unknown media id: {media_id}")]
    WrongMediaId { media_id: MediaId },

    /// Transport level failure.
    #[error("Service unreachable: {0}")]
    Connection(ConnectionFailure),
}

impl RemoteError {
    /// Whether the failure may clear up if the call is repeated later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TemporaryUnavailable)
    }
}

impl From<ConnectionFailure> for RemoteError {
    fn from(failure: ConnectionFailure) -> Self {
        Self::Connection(failure)
    }
}

/// A proxy reference could not be converted into the requested capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// The object exists but implements a different interface.
    #[error("{proxy} does not implement {expected}")]
    WrongInterface {
        proxy: String,
        expected: &'static str,
    },

    /// The reference is malformed or points nowhere.
    #[error("{proxy} could not be resolved")]
    Unresolvable { proxy: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_temporary_unavailable_is_transient() {
        assert!(RemoteError::TemporaryUnavailable.is_transient());
        assert!(!RemoteError::Unauthorized.is_transient());
        assert!(!RemoteError::Connection(ConnectionFailure::Lost).is_transient());
    }

    #[test]
    fn test_connection_error_display() {
        let err: RemoteError = ConnectionFailure::Refused.into();
        assert_eq!(err.to_string(), "Service unreachable: connection refused");
    }

    #[test]
    fn test_wrong_media_id_display() {
        let err = RemoteError::WrongMediaId {
            media_id: MediaId::new("m-9"),
        };
        assert_eq!(err.to_string(), "Unknown media id: m-9");
    }
}
