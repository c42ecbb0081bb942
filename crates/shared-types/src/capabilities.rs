//! # Capability Traits
//!
//! The transport boundary. Each trait mirrors one remote interface of the
//! media platform; a transport adapter implements them on top of its proxy
//! objects, and [`crate::in_memory`] implements them for tests and the
//! sandbox runtime.
//!
//! All calls are synchronous from the caller's point of view and may block.
//!
//! ## Interfaces
//!
//! | Trait | Remote role |
//! |-------|-------------|
//! | [`DirectoryService`] | entry point, hands out the other services |
//! | [`Authenticator`] | token issue/refresh, user administration |
//! | [`MediaCatalog`] | searches, tags, renames |
//! | [`FileService`] | downloads, uploads, removals |
//! | [`FileHandler`] | one open download |
//! | [`FileUploader`] | served by the client while an upload runs |

use crate::entities::{AuthToken, CredentialHash, Media, MediaId, ProxyRef};
use crate::errors::{CastError, RemoteError};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Result alias for remote calls.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Directory service: the registry backend services register with.
pub trait DirectoryService: Send + Sync {
    /// No-op call confirming the object still answers.
    fn ping(&self) -> RemoteResult<()>;

    /// Fails with `TemporaryUnavailable` until an authenticator registered.
    fn authenticator(&self) -> RemoteResult<Arc<dyn Authenticator>>;

    /// Fails with `TemporaryUnavailable` until a catalog registered.
    fn catalog(&self) -> RemoteResult<Arc<dyn MediaCatalog>>;

    /// Fails with `TemporaryUnavailable` until a file service registered.
    fn file_service(&self) -> RemoteResult<Arc<dyn FileService>>;
}

/// Authentication service.
pub trait Authenticator: Send + Sync {
    /// Issue a fresh token for `user`. Fails with `Unauthorized` on a bad
    /// credential pair.
    fn refresh_authorization(&self, user: &str, credential: &CredentialHash)
        -> RemoteResult<AuthToken>;

    /// Whether `admin_token` is the administrative credential.
    fn is_admin(&self, admin_token: &AuthToken) -> RemoteResult<bool>;

    fn add_user(
        &self,
        user: &str,
        credential: &CredentialHash,
        admin_token: &AuthToken,
    ) -> RemoteResult<()>;

    fn remove_user(&self, user: &str, admin_token: &AuthToken) -> RemoteResult<()>;
}

/// Projection of a catalog entry returned by a search.
///
/// Name searches fill `name`, tag searches fill `tags`; neither returns
/// the full record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSummary {
    pub id: MediaId,
    pub name: Option<String>,
    pub tags: Option<BTreeSet<String>>,
}

/// Catalog service.
pub trait MediaCatalog: Send + Sync {
    /// Search by title. With `exact` the whole (case-insensitive) title
    /// must match, otherwise a substring is enough.
    fn tiles_by_name(&self, name: &str, exact: bool) -> RemoteResult<Vec<TileSummary>>;

    /// Search by the caller's tags. With `include_all` every tag must be
    /// present, otherwise any one is enough.
    fn tiles_by_tags(
        &self,
        tags: &[String],
        include_all: bool,
        token: &AuthToken,
    ) -> RemoteResult<Vec<TileSummary>>;

    /// Full record for one id.
    fn tile(&self, media_id: &MediaId, token: &AuthToken) -> RemoteResult<Media>;

    fn add_tags(&self, media_id: &MediaId, tags: &[String], token: &AuthToken) -> RemoteResult<()>;

    fn remove_tags(
        &self,
        media_id: &MediaId,
        tags: &[String],
        token: &AuthToken,
    ) -> RemoteResult<()>;

    fn rename_tile(&self, media_id: &MediaId, name: &str, admin_token: &AuthToken)
        -> RemoteResult<()>;
}

/// File transfer service.
pub trait FileService: Send + Sync {
    /// Open a download for `media_id`.
    fn open_file(&self, media_id: &MediaId, token: &AuthToken)
        -> RemoteResult<Box<dyn FileHandler>>;

    /// Pull the whole file out of `uploader` and register it. Returns the
    /// id of the new catalog entry.
    fn upload_file(
        &self,
        uploader: &mut dyn FileUploader,
        admin_token: &AuthToken,
    ) -> RemoteResult<MediaId>;

    fn remove_file(&self, media_id: &MediaId, admin_token: &AuthToken) -> RemoteResult<()>;
}

/// An open download. Tokens are passed per call so an expired token can be
/// replaced without restarting the transfer.
pub trait FileHandler: Send {
    /// Read up to `size` bytes. An empty chunk marks the end of the file.
    fn receive(&mut self, size: usize, token: &AuthToken) -> RemoteResult<Vec<u8>>;

    fn close(&mut self, token: &AuthToken) -> RemoteResult<()>;
}

/// Chunk source the client serves while the file service pulls an upload.
pub trait FileUploader: Send {
    /// Read up to `size` bytes. An empty chunk marks the end of the file.
    fn receive(&mut self, size: usize) -> std::io::Result<Vec<u8>>;

    fn close(&mut self) -> std::io::Result<()>;
}

/// Fallible conversion from an opaque reference to a typed capability.
pub trait CapabilityResolver: Send + Sync {
    fn resolve_directory(&self, proxy: &ProxyRef) -> Result<Arc<dyn DirectoryService>, CastError>;
}
