//! # Core Domain Entities
//!
//! Identifiers and catalog records shared by every subsystem.
//!
//! ## Clusters
//!
//! - **Discovery**: `InstanceId`, `ProxyRef`
//! - **Identity**: `AuthToken`, `CredentialHash`
//! - **Catalog**: `MediaId`, `MediaInfo`, `Media`

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// CLUSTER A: DISCOVERY
// =============================================================================

/// Opaque identifier a service instance announces itself with.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stringified reference to a remote object, as carried on the bus.
///
/// A `ProxyRef` says nothing about which interface the object implements.
/// Use a [`crate::CapabilityResolver`] to obtain a typed capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyRef(String);

impl ProxyRef {
    pub fn new(proxy: impl Into<String>) -> Self {
        Self(proxy.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProxyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// CLUSTER B: IDENTITY
// =============================================================================

/// Authorization token issued by the authentication service.
///
/// `Debug` output is redacted so tokens never reach the logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(..)")
    }
}

/// Lowercase hex SHA-256 of a secret.
///
/// This is the only form in which passwords and the administrative secret
/// are stored or sent to the backend.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CredentialHash(String);

impl CredentialHash {
    /// Hash a plaintext secret.
    pub fn derive(secret: &str) -> Self {
        let digest = Sha256::digest(secret.as_bytes());
        Self(hex::encode(digest))
    }

    /// Wrap an already computed hex digest.
    pub fn from_hex(digest: impl Into<String>) -> Self {
        Self(digest.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialHash(..)")
    }
}

// =============================================================================
// CLUSTER C: CATALOG
// =============================================================================

/// Stable identifier of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptive fields of a catalog entry.
///
/// Tags are per user: the catalog returns the tags the requesting token's
/// owner attached to the media.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MediaInfo {
    pub name: String,
    pub tags: BTreeSet<String>,
}

/// A complete catalog record as returned by a full tile fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: MediaId,
    pub info: MediaInfo,
}

impl Media {
    pub fn new(id: MediaId, name: impl Into<String>, tags: BTreeSet<String>) -> Self {
        Self {
            id,
            info: MediaInfo {
                name: name.into(),
                tags,
            },
        }
    }
}
