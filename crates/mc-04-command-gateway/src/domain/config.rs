use std::path::PathBuf;

/// Default download chunk, in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// File transfer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Bytes requested per `receive` call when downloading.
    pub chunk_size: usize,
    /// Where downloads land when no path is given.
    pub download_dir: PathBuf,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            download_dir: PathBuf::from("."),
        }
    }
}
