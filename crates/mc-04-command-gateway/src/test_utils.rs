//! Test utilities for the command gateway.
//!
//! Enable with the `test-utils` feature flag.

use crate::domain::Interrupted;
use crate::ports::Prompter;
use mc_01_discovery::{DirectoryLocator, DiscoveryError, DiscoveryStatus, Reachability};
use parking_lot::Mutex;
use shared_types::DirectoryService;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Prompter answering from a queue. An empty queue behaves like ctrl-c.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Result<String, Interrupted>>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let prompter = Self::new();
        for answer in answers {
            prompter.answer(answer);
        }
        prompter
    }

    pub fn answer(&self, answer: impl Into<String>) {
        self.answers.lock().push_back(Ok(answer.into()));
    }

    pub fn interrupt(&self) {
        self.answers.lock().push_back(Err(Interrupted));
    }

    /// Labels asked so far.
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().clone()
    }

    fn next(&self, label: &str) -> Result<String, Interrupted> {
        self.asked.lock().push(label.to_string());
        self.answers.lock().pop_front().unwrap_or(Err(Interrupted))
    }
}

impl Prompter for ScriptedPrompter {
    fn prompt(&self, label: &str) -> Result<String, Interrupted> {
        self.next(label)
    }

    fn prompt_secret(&self, label: &str) -> Result<String, Interrupted> {
        self.next(label)
    }
}

/// Locator serving a fixed directory, with reachability set by hand.
pub struct StaticLocator {
    directory: Mutex<Option<Arc<dyn DirectoryService>>>,
    reachability: watch::Sender<Reachability>,
    channel: Mutex<Option<String>>,
    disconnects: AtomicUsize,
}

impl StaticLocator {
    /// No directory, unreachable.
    pub fn empty() -> Self {
        let (reachability, _) = watch::channel(Reachability::Unreachable);
        Self {
            directory: Mutex::new(None),
            reachability,
            channel: Mutex::new(None),
            disconnects: AtomicUsize::new(0),
        }
    }

    /// Reachable and serving `directory`.
    pub fn serving(directory: Arc<dyn DirectoryService>) -> Self {
        let locator = Self::empty();
        locator.set_directory(Some(directory));
        *locator.channel.lock() = Some("Announcements".to_string());
        locator
    }

    /// Replace the served directory; reachability follows.
    pub fn set_directory(&self, directory: Option<Arc<dyn DirectoryService>>) {
        let reachability = if directory.is_some() {
            Reachability::Reachable
        } else {
            Reachability::Unreachable
        };
        *self.directory.lock() = directory;
        self.reachability.send_replace(reachability);
    }

    /// Flip the signal without touching the directory, as a silence
    /// timeout would.
    pub fn set_reachability(&self, reachability: Reachability) {
        self.reachability.send_replace(reachability);
    }

    pub fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

impl DirectoryLocator for StaticLocator {
    fn is_reachable(&self) -> bool {
        self.reachability.borrow().is_reachable()
    }

    fn reachability(&self) -> watch::Receiver<Reachability> {
        self.reachability.subscribe()
    }

    fn select_active(&self) -> Option<Arc<dyn DirectoryService>> {
        self.directory.lock().clone()
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        *self.channel.lock() = None;
        self.reachability.send_replace(Reachability::Unreachable);
    }

    fn reconnect(&self, channel: Option<&str>) -> Result<(), DiscoveryError> {
        let channel = channel.unwrap_or("Announcements");
        if channel.is_empty() {
            return Err(DiscoveryError::InvalidChannel);
        }
        *self.channel.lock() = Some(channel.to_string());
        Ok(())
    }

    fn status(&self) -> DiscoveryStatus {
        DiscoveryStatus {
            reachability: *self.reachability.borrow(),
            channel: self.channel.lock().clone(),
            instances: Vec::new(),
        }
    }
}
