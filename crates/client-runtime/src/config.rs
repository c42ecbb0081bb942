//! # Client Configuration
//!
//! Defaults, then an optional TOML file, then environment overrides.
//!
//! ## File Format
//!
//! Every section and key is optional:
//!
//! ```toml
//! [discovery]
//! expiry_secs = 12
//! silence_secs = 12
//! channel = "Announcements"
//!
//! [session]
//! max_retries = 3
//! retry_delay_secs = 5
//!
//! [transfer]
//! chunk_size = 1024
//! download_dir = "."
//!
//! [sandbox]
//! enabled = true
//! announce_interval_secs = 10
//! admin_secret = "admin"
//!
//! [[sandbox.users]]
//! name = "user"
//! password = "user"
//! ```
//!
//! ## Environment
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `MC_CONFIG` | config file path, when `--config` is not given |
//! | `MC_CHANNEL` | `discovery.channel` |
//! | `MC_MAX_RETRIES` | `session.max_retries` |
//! | `MC_DOWNLOAD_DIR` | `transfer.download_dir` |

use mc_01_discovery::DiscoveryConfig;
use mc_02_session::RetryPolicy;
use mc_04_command_gateway::GatewayConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "MC_CONFIG";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {error}")]
    Io { path: String, error: String },

    #[error("Invalid config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySection {
    pub expiry_secs: u64,
    pub silence_secs: u64,
    pub channel: String,
}

impl Default for DiscoverySection {
    fn default() -> Self {
        let defaults = DiscoveryConfig::default();
        Self {
            expiry_secs: defaults.expiry.as_secs(),
            silence_secs: defaults.silence_timeout.as_secs(),
            channel: defaults.channel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSection {
    pub max_retries: u32,
    pub retry_delay_secs: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = RetryPolicy::default();
        Self {
            max_retries: defaults.max_retries,
            retry_delay_secs: defaults.delay.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSection {
    pub chunk_size: usize,
    pub download_dir: PathBuf,
}

impl Default for TransferSection {
    fn default() -> Self {
        let defaults = GatewayConfig::default();
        Self {
            chunk_size: defaults.chunk_size,
            download_dir: defaults.download_dir,
        }
    }
}

/// An account the sandbox authenticator accepts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SandboxUser {
    pub name: String,
    pub password: String,
}

/// In-process backend served when no real transport is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxSection {
    pub enabled: bool,
    pub announce_interval_secs: u64,
    pub admin_secret: String,
    pub users: Vec<SandboxUser>,
}

impl Default for SandboxSection {
    fn default() -> Self {
        Self {
            enabled: true,
            announce_interval_secs: 10,
            admin_secret: "admin".to_string(),
            users: vec![SandboxUser {
                name: "user".to_string(),
                password: "user".to_string(),
            }],
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientConfig {
    pub discovery: DiscoverySection,
    pub session: SessionSection,
    pub transfer: TransferSection,
    pub sandbox: SandboxSection,
}

// ============================================================================
// File structure
// ============================================================================

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    discovery: DiscoveryFile,
    #[serde(default)]
    session: SessionFile,
    #[serde(default)]
    transfer: TransferFile,
    #[serde(default)]
    sandbox: SandboxFile,
}

#[derive(Debug, Deserialize, Default)]
struct DiscoveryFile {
    expiry_secs: Option<u64>,
    silence_secs: Option<u64>,
    channel: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SessionFile {
    max_retries: Option<u32>,
    retry_delay_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct TransferFile {
    chunk_size: Option<usize>,
    download_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct SandboxFile {
    enabled: Option<bool>,
    announce_interval_secs: Option<u64>,
    admin_secret: Option<String>,
    users: Option<Vec<SandboxUser>>,
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, parsed or validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string. Missing keys take defaults.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let defaults = Self::default();

        let d = file.discovery;
        let s = file.session;
        let t = file.transfer;
        let b = file.sandbox;
        let config = Self {
            discovery: DiscoverySection {
                expiry_secs: d.expiry_secs.unwrap_or(defaults.discovery.expiry_secs),
                silence_secs: d.silence_secs.unwrap_or(defaults.discovery.silence_secs),
                channel: d.channel.unwrap_or(defaults.discovery.channel),
            },
            session: SessionSection {
                max_retries: s.max_retries.unwrap_or(defaults.session.max_retries),
                retry_delay_secs: s
                    .retry_delay_secs
                    .unwrap_or(defaults.session.retry_delay_secs),
            },
            transfer: TransferSection {
                chunk_size: t.chunk_size.unwrap_or(defaults.transfer.chunk_size),
                download_dir: t.download_dir.unwrap_or(defaults.transfer.download_dir),
            },
            sandbox: SandboxSection {
                enabled: b.enabled.unwrap_or(defaults.sandbox.enabled),
                announce_interval_secs: b
                    .announce_interval_secs
                    .unwrap_or(defaults.sandbox.announce_interval_secs),
                admin_secret: b.admin_secret.unwrap_or(defaults.sandbox.admin_secret),
                users: b.users.unwrap_or(defaults.sandbox.users),
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Apply `MC_*` overrides read through `lookup`.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(channel) = lookup("MC_CHANNEL").filter(|c| !c.is_empty()) {
            self.discovery.channel = channel;
        }
        if let Some(raw) = lookup("MC_MAX_RETRIES") {
            match raw.parse() {
                Ok(n) => self.session.max_retries = n,
                Err(_) => warn!(value = %raw, "MC_MAX_RETRIES must be a non-negative integer"),
            }
        }
        if let Some(dir) = lookup("MC_DOWNLOAD_DIR").filter(|d| !d.is_empty()) {
            self.transfer.download_dir = PathBuf::from(dir);
        }
    }

    /// Reject values the client cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.discovery.channel.is_empty() {
            return Err(ConfigError::Invalid {
                key: "discovery.channel",
                reason: "must not be empty".to_string(),
            });
        }
        if self.discovery.silence_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "discovery.silence_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.transfer.chunk_size == 0 {
            return Err(ConfigError::Invalid {
                key: "transfer.chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.sandbox.enabled && self.sandbox.announce_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "sandbox.announce_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn discovery_config(&self) -> DiscoveryConfig {
        DiscoveryConfig {
            expiry: Duration::from_secs(self.discovery.expiry_secs),
            silence_timeout: Duration::from_secs(self.discovery.silence_secs),
            channel: self.discovery.channel.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.session.max_retries,
            Duration::from_secs(self.session.retry_delay_secs),
        )
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            chunk_size: self.transfer.chunk_size,
            download_dir: self.transfer.download_dir.clone(),
        }
    }

    pub fn announce_interval(&self) -> Duration {
        Duration::from_secs(self.sandbox.announce_interval_secs)
    }
}

/// Resolve the config file (`path`, else `MC_CONFIG`), load it and apply
/// environment overrides.
pub fn load_config<F>(path: Option<&Path>, lookup: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| lookup(CONFIG_ENV).filter(|p| !p.is_empty()).map(PathBuf::from));

    let mut config = match path {
        Some(path) => {
            let config = ClientConfig::load(&path)?;
            info!(path = %path.display(), "Loaded configuration file");
            config
        }
        None => ClientConfig::default(),
    };
    config.apply_overrides(&lookup);
    config.validate()?;
    Ok(config)
}
