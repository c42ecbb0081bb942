//! # In-Memory Backend
//!
//! Process-local implementations of every capability trait. The sandbox
//! runtime serves these instead of a real transport, and the test suites
//! use them as scriptable doubles.
//!
//! Behaviour follows the platform's contracts closely enough to exercise
//! client error paths:
//!
//! - tokens are validated on every call, so revoking them produces
//!   `Unauthorized` mid-session;
//! - services can be left unregistered or scripted to answer
//!   `TemporaryUnavailable` a number of times;
//! - a directory can be marked dead so its ping is refused.
//!
//! Requires feature: `in-memory`

use crate::capabilities::{
    Authenticator, CapabilityResolver, DirectoryService, FileHandler, FileService, FileUploader,
    MediaCatalog, RemoteResult, TileSummary,
};
use crate::entities::{AuthToken, CredentialHash, Media, MediaId, ProxyRef};
use crate::errors::{CastError, ConnectionFailure, RemoteError};
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Chunk size the file service pulls uploads with.
pub const UPLOAD_CHUNK_SIZE: usize = 1024;

/// Decrement a fault counter, reporting whether a fault was consumed.
fn take_fault(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

// =============================================================================
// AUTHENTICATOR
// =============================================================================

/// Authenticator keeping users and live tokens in memory.
pub struct InMemoryAuthenticator {
    users: Mutex<HashMap<String, CredentialHash>>,
    /// token -> owning user
    tokens: Mutex<HashMap<String, String>>,
    admin_token: AuthToken,
    unavailable_refreshes: AtomicU32,
    refresh_calls: AtomicUsize,
}

impl InMemoryAuthenticator {
    /// The administrative token is the hashed `admin_secret`.
    pub fn new(admin_secret: &str) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            tokens: Mutex::new(HashMap::new()),
            admin_token: AuthToken::new(CredentialHash::derive(admin_secret).as_str()),
            unavailable_refreshes: AtomicU32::new(0),
            refresh_calls: AtomicUsize::new(0),
        }
    }

    /// Register a user with a plaintext password.
    #[must_use]
    pub fn with_user(self, user: &str, password: &str) -> Self {
        self.users
            .lock()
            .insert(user.to_string(), CredentialHash::derive(password));
        self
    }

    /// Answer the next `count` refreshes with `TemporaryUnavailable`.
    pub fn fail_next_refreshes(&self, count: u32) {
        self.unavailable_refreshes.store(count, Ordering::SeqCst);
    }

    /// Invalidate every issued token, as after an authenticator restart.
    pub fn revoke_all_tokens(&self) {
        self.tokens.lock().clear();
    }

    /// Remove a user's credentials so further refreshes are rejected.
    pub fn forget_user(&self, user: &str) {
        self.users.lock().remove(user);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn has_user(&self, user: &str) -> bool {
        self.users.lock().contains_key(user)
    }

    /// Owner of a live token. The administrative token has no owner.
    pub fn user_for(&self, token: &AuthToken) -> Option<String> {
        self.tokens.lock().get(token.as_str()).cloned()
    }

    pub fn is_admin_token(&self, token: &AuthToken) -> bool {
        *token == self.admin_token
    }

    fn require_user(&self, token: &AuthToken) -> RemoteResult<String> {
        self.user_for(token).ok_or(RemoteError::Unauthorized)
    }

    fn require_admin(&self, token: &AuthToken) -> RemoteResult<()> {
        if self.is_admin_token(token) {
            Ok(())
        } else {
            Err(RemoteError::Unauthorized)
        }
    }
}

impl Authenticator for InMemoryAuthenticator {
    fn refresh_authorization(
        &self,
        user: &str,
        credential: &CredentialHash,
    ) -> RemoteResult<AuthToken> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if take_fault(&self.unavailable_refreshes) {
            return Err(RemoteError::TemporaryUnavailable);
        }
        let known = self.users.lock().get(user) == Some(credential);
        if !known {
            debug!(user = %user, "Refresh rejected");
            return Err(RemoteError::Unauthorized);
        }
        let token = AuthToken::new(uuid::Uuid::new_v4().to_string());
        self.tokens
            .lock()
            .insert(token.as_str().to_string(), user.to_string());
        Ok(token)
    }

    fn is_admin(&self, admin_token: &AuthToken) -> RemoteResult<bool> {
        Ok(self.is_admin_token(admin_token))
    }

    fn add_user(
        &self,
        user: &str,
        credential: &CredentialHash,
        admin_token: &AuthToken,
    ) -> RemoteResult<()> {
        self.require_admin(admin_token)?;
        self.users.lock().insert(user.to_string(), credential.clone());
        Ok(())
    }

    fn remove_user(&self, user: &str, admin_token: &AuthToken) -> RemoteResult<()> {
        self.require_admin(admin_token)?;
        self.users.lock().remove(user);
        self.tokens.lock().retain(|_, owner| owner != user);
        Ok(())
    }
}

// =============================================================================
// CATALOG
// =============================================================================

struct CatalogEntry {
    name: String,
    /// user -> tags
    tags: HashMap<String, BTreeSet<String>>,
}

/// Catalog with per-user tags.
pub struct InMemoryCatalog {
    auth: Arc<InMemoryAuthenticator>,
    entries: Mutex<BTreeMap<MediaId, CatalogEntry>>,
}

impl InMemoryCatalog {
    pub fn new(auth: Arc<InMemoryAuthenticator>) -> Self {
        Self {
            auth,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn add_media(&self, media_id: MediaId, name: impl Into<String>) {
        self.entries.lock().insert(
            media_id,
            CatalogEntry {
                name: name.into(),
                tags: HashMap::new(),
            },
        );
    }

    /// Drop an entry, as if another client removed it.
    pub fn remove_media(&self, media_id: &MediaId) -> bool {
        self.entries.lock().remove(media_id).is_some()
    }

    pub fn name_of(&self, media_id: &MediaId) -> Option<String> {
        self.entries.lock().get(media_id).map(|e| e.name.clone())
    }

    fn with_entry<T>(
        &self,
        media_id: &MediaId,
        f: impl FnOnce(&mut CatalogEntry) -> T,
    ) -> RemoteResult<T> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(media_id)
            .ok_or_else(|| RemoteError::WrongMediaId {
                media_id: media_id.clone(),
            })?;
        Ok(f(entry))
    }
}

impl MediaCatalog for InMemoryCatalog {
    fn tiles_by_name(&self, name: &str, exact: bool) -> RemoteResult<Vec<TileSummary>> {
        let needle = name.to_lowercase();
        let entries = self.entries.lock();
        Ok(entries
            .iter()
            .filter(|(_, e)| {
                let title = e.name.to_lowercase();
                if exact {
                    title == needle
                } else {
                    title.contains(&needle)
                }
            })
            .map(|(id, e)| TileSummary {
                id: id.clone(),
                name: Some(e.name.clone()),
                tags: None,
            })
            .collect())
    }

    fn tiles_by_tags(
        &self,
        tags: &[String],
        include_all: bool,
        token: &AuthToken,
    ) -> RemoteResult<Vec<TileSummary>> {
        let user = self.auth.require_user(token)?;
        let entries = self.entries.lock();
        Ok(entries
            .iter()
            .filter_map(|(id, e)| {
                let own = e.tags.get(&user)?;
                let matched = if include_all {
                    tags.iter().all(|t| own.contains(t))
                } else {
                    tags.iter().any(|t| own.contains(t))
                };
                matched.then(|| TileSummary {
                    id: id.clone(),
                    name: None,
                    tags: Some(own.clone()),
                })
            })
            .collect())
    }

    fn tile(&self, media_id: &MediaId, token: &AuthToken) -> RemoteResult<Media> {
        let user = self.auth.require_user(token)?;
        self.with_entry(media_id, |e| {
            Media::new(
                media_id.clone(),
                e.name.clone(),
                e.tags.get(&user).cloned().unwrap_or_default(),
            )
        })
    }

    fn add_tags(&self, media_id: &MediaId, tags: &[String], token: &AuthToken) -> RemoteResult<()> {
        let user = self.auth.require_user(token)?;
        self.with_entry(media_id, |e| {
            e.tags.entry(user).or_default().extend(tags.iter().cloned());
        })
    }

    fn remove_tags(
        &self,
        media_id: &MediaId,
        tags: &[String],
        token: &AuthToken,
    ) -> RemoteResult<()> {
        let user = self.auth.require_user(token)?;
        self.with_entry(media_id, |e| {
            if let Some(own) = e.tags.get_mut(&user) {
                own.retain(|t| !tags.contains(t));
            }
        })
    }

    fn rename_tile(
        &self,
        media_id: &MediaId,
        name: &str,
        admin_token: &AuthToken,
    ) -> RemoteResult<()> {
        self.auth.require_admin(admin_token)?;
        self.with_entry(media_id, |e| e.name = name.to_string())
    }
}

// =============================================================================
// FILE SERVICE
// =============================================================================

/// File service storing contents in memory, keyed by media id.
pub struct InMemoryFileService {
    auth: Arc<InMemoryAuthenticator>,
    catalog: Arc<InMemoryCatalog>,
    files: Mutex<HashMap<MediaId, Arc<Vec<u8>>>>,
}

impl InMemoryFileService {
    pub fn new(auth: Arc<InMemoryAuthenticator>, catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            auth,
            catalog,
            files: Mutex::new(HashMap::new()),
        }
    }

    /// Store `contents` and list them in the catalog under `name`.
    pub fn add_file(&self, media_id: MediaId, name: &str, contents: Vec<u8>) {
        self.catalog.add_media(media_id.clone(), name);
        self.files.lock().insert(media_id, Arc::new(contents));
    }

    pub fn contents(&self, media_id: &MediaId) -> Option<Vec<u8>> {
        self.files.lock().get(media_id).map(|c| c.as_ref().clone())
    }
}

impl FileService for InMemoryFileService {
    fn open_file(
        &self,
        media_id: &MediaId,
        token: &AuthToken,
    ) -> RemoteResult<Box<dyn FileHandler>> {
        self.auth.require_user(token)?;
        let data = self
            .files
            .lock()
            .get(media_id)
            .cloned()
            .ok_or_else(|| RemoteError::WrongMediaId {
                media_id: media_id.clone(),
            })?;
        Ok(Box::new(InMemoryFileHandler {
            auth: Arc::clone(&self.auth),
            data,
            position: 0,
        }))
    }

    fn upload_file(
        &self,
        uploader: &mut dyn FileUploader,
        admin_token: &AuthToken,
    ) -> RemoteResult<MediaId> {
        self.auth.require_admin(admin_token)?;
        let mut contents = Vec::new();
        loop {
            let chunk = uploader
                .receive(UPLOAD_CHUNK_SIZE)
                .map_err(|_| RemoteError::Connection(ConnectionFailure::Lost))?;
            if chunk.is_empty() {
                break;
            }
            contents.extend_from_slice(&chunk);
        }
        uploader
            .close()
            .map_err(|_| RemoteError::Connection(ConnectionFailure::Lost))?;

        let media_id = MediaId::new(hex::encode(Sha256::digest(&contents)));
        debug!(media_id = %media_id, bytes = contents.len(), "Upload stored");
        self.add_file(media_id.clone(), media_id.as_str(), contents);
        Ok(media_id)
    }

    fn remove_file(&self, media_id: &MediaId, admin_token: &AuthToken) -> RemoteResult<()> {
        self.auth.require_admin(admin_token)?;
        if self.files.lock().remove(media_id).is_none() {
            return Err(RemoteError::WrongMediaId {
                media_id: media_id.clone(),
            });
        }
        self.catalog.remove_media(media_id);
        Ok(())
    }
}

/// Download cursor over an in-memory file. Checks the token on each chunk.
pub struct InMemoryFileHandler {
    auth: Arc<InMemoryAuthenticator>,
    data: Arc<Vec<u8>>,
    position: usize,
}

impl FileHandler for InMemoryFileHandler {
    fn receive(&mut self, size: usize, token: &AuthToken) -> RemoteResult<Vec<u8>> {
        self.auth.require_user(token)?;
        let end = (self.position + size).min(self.data.len());
        let chunk = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }

    fn close(&mut self, token: &AuthToken) -> RemoteResult<()> {
        self.auth.require_user(token)?;
        Ok(())
    }
}

// =============================================================================
// DIRECTORY
// =============================================================================

/// Directory service whose registrations and liveness are scriptable.
pub struct InMemoryDirectory {
    authenticator: Mutex<Option<Arc<InMemoryAuthenticator>>>,
    catalog: Mutex<Option<Arc<InMemoryCatalog>>>,
    file_service: Mutex<Option<Arc<InMemoryFileService>>>,
    alive: AtomicBool,
    unavailable_lookups: AtomicU32,
    ping_calls: AtomicUsize,
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDirectory {
    /// A live directory with nothing registered yet.
    pub fn new() -> Self {
        Self {
            authenticator: Mutex::new(None),
            catalog: Mutex::new(None),
            file_service: Mutex::new(None),
            alive: AtomicBool::new(true),
            unavailable_lookups: AtomicU32::new(0),
            ping_calls: AtomicUsize::new(0),
        }
    }

    pub fn register_authenticator(&self, auth: Arc<InMemoryAuthenticator>) {
        *self.authenticator.lock() = Some(auth);
    }

    pub fn register_catalog(&self, catalog: Arc<InMemoryCatalog>) {
        *self.catalog.lock() = Some(catalog);
    }

    pub fn register_file_service(&self, files: Arc<InMemoryFileService>) {
        *self.file_service.lock() = Some(files);
    }

    /// A dead directory refuses pings and every lookup.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::SeqCst);
    }

    /// Answer the next `count` service lookups with `TemporaryUnavailable`.
    pub fn fail_next_lookups(&self, count: u32) {
        self.unavailable_lookups.store(count, Ordering::SeqCst);
    }

    pub fn ping_calls(&self) -> usize {
        self.ping_calls.load(Ordering::SeqCst)
    }

    fn lookup<T: ?Sized>(&self, slot: Option<Arc<T>>) -> RemoteResult<Arc<T>> {
        if !self.alive.load(Ordering::SeqCst) {
            return Err(RemoteError::Connection(ConnectionFailure::Refused));
        }
        if take_fault(&self.unavailable_lookups) {
            return Err(RemoteError::TemporaryUnavailable);
        }
        slot.ok_or(RemoteError::TemporaryUnavailable)
    }
}

impl DirectoryService for InMemoryDirectory {
    fn ping(&self) -> RemoteResult<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        if self.alive.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RemoteError::Connection(ConnectionFailure::Refused))
        }
    }

    fn authenticator(&self) -> RemoteResult<Arc<dyn Authenticator>> {
        let slot = self.authenticator.lock().clone();
        self.lookup(slot).map(|a| a as Arc<dyn Authenticator>)
    }

    fn catalog(&self) -> RemoteResult<Arc<dyn MediaCatalog>> {
        let slot = self.catalog.lock().clone();
        self.lookup(slot).map(|c| c as Arc<dyn MediaCatalog>)
    }

    fn file_service(&self) -> RemoteResult<Arc<dyn FileService>> {
        let slot = self.file_service.lock().clone();
        self.lookup(slot).map(|f| f as Arc<dyn FileService>)
    }
}

// =============================================================================
// RESOLVER
// =============================================================================

/// Resolver over a table of known proxy strings.
#[derive(Default)]
pub struct InMemoryResolver {
    directories: Mutex<HashMap<String, Arc<dyn DirectoryService>>>,
    foreign: Mutex<HashSet<String>>,
}

impl InMemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_directory(&self, proxy: &ProxyRef, directory: Arc<dyn DirectoryService>) {
        self.directories
            .lock()
            .insert(proxy.as_str().to_string(), directory);
    }

    /// Register an object that exists but is not a directory service.
    pub fn register_foreign(&self, proxy: &ProxyRef) {
        self.foreign.lock().insert(proxy.as_str().to_string());
    }
}

impl CapabilityResolver for InMemoryResolver {
    fn resolve_directory(&self, proxy: &ProxyRef) -> Result<Arc<dyn DirectoryService>, CastError> {
        if let Some(directory) = self.directories.lock().get(proxy.as_str()) {
            return Ok(Arc::clone(directory));
        }
        if self.foreign.lock().contains(proxy.as_str()) {
            return Err(CastError::WrongInterface {
                proxy: proxy.to_string(),
                expected: "DirectoryService",
            });
        }
        Err(CastError::Unresolvable {
            proxy: proxy.to_string(),
        })
    }
}

// =============================================================================
// WIRED BACKEND
// =============================================================================

/// A directory with all three services registered against it.
pub struct InMemoryBackend {
    pub directory: Arc<InMemoryDirectory>,
    pub authenticator: Arc<InMemoryAuthenticator>,
    pub catalog: Arc<InMemoryCatalog>,
    pub files: Arc<InMemoryFileService>,
}

impl InMemoryBackend {
    pub fn new(authenticator: InMemoryAuthenticator) -> Self {
        let authenticator = Arc::new(authenticator);
        let catalog = Arc::new(InMemoryCatalog::new(Arc::clone(&authenticator)));
        let files = Arc::new(InMemoryFileService::new(
            Arc::clone(&authenticator),
            Arc::clone(&catalog),
        ));
        let directory = Arc::new(InMemoryDirectory::new());
        directory.register_authenticator(Arc::clone(&authenticator));
        directory.register_catalog(Arc::clone(&catalog));
        directory.register_file_service(Arc::clone(&files));
        Self {
            directory,
            authenticator,
            catalog,
            files,
        }
    }

    pub fn directory_capability(&self) -> Arc<dyn DirectoryService> {
        Arc::clone(&self.directory) as Arc<dyn DirectoryService>
    }
}
