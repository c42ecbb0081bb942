//! # Adapters
//!
//! Local file access for uploads.

use shared_types::FileUploader;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serves a local file to the file service in chunks while it pulls an
/// upload.
pub struct LocalFileUploader {
    path: PathBuf,
    file: Option<File>,
    sent: u64,
}

impl LocalFileUploader {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            file: Some(file),
            sent: 0,
        })
    }

    /// Bytes handed out so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl FileUploader for LocalFileUploader {
    fn receive(&mut self, size: usize) -> io::Result<Vec<u8>> {
        let Some(file) = self.file.as_mut() else {
            return Ok(Vec::new());
        };
        let mut chunk = Vec::with_capacity(size);
        file.by_ref().take(size as u64).read_to_end(&mut chunk)?;
        self.sent += chunk.len() as u64;
        Ok(chunk)
    }

    fn close(&mut self) -> io::Result<()> {
        if self.file.take().is_some() {
            debug!(path = %self.path.display(), bytes = self.sent, "Upload source closed");
        }
        Ok(())
    }
}
