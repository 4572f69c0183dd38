//! `notify`-backed file watch service.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::source::{ConfigDocument, ConfigHash};
use crate::watch::{FileWatchService, WatchCallback, WatchControl, WatchError};

/// A file touched continuously is still read after this many debounce windows.
const MAX_SETTLE_WINDOWS: u32 = 10;

/// Watches files with the platform's native notification mechanism.
///
/// Each registration gets its own watcher and thread; the thread exits
/// when the callback returns [`WatchControl::Stop`].
#[derive(Debug, Clone)]
pub struct NotifyWatchService {
    poll_interval: Duration,
    debounce: Duration,
}

impl NotifyWatchService {
    pub fn new(poll_interval: Duration, debounce: Duration) -> Self {
        Self { poll_interval, debounce }
    }
}

impl Default for NotifyWatchService {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_millis(100))
    }
}

impl FileWatchService for NotifyWatchService {
    fn watch(&self, path: &Path, last_known: ConfigHash, callback: WatchCallback) -> Result<(), WatchError> {
        let path = path.to_path_buf();
        // Watch the directory: editors often replace the file instead of writing it.
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| WatchError::NoParent {
                path: path.display().to_string(),
            })?
            .to_path_buf();

        let (tx, rx) = mpsc::channel();
        let mut watcher = RecommendedWatcher::new(tx, Config::default().with_poll_interval(self.poll_interval))?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let watch = WatchLoop {
            path: path.clone(),
            last_seen: last_known,
            debounce: self.debounce,
            callback,
        };
        thread::Builder::new()
            .name("hotlog-watch".to_string())
            .spawn(move || watch.run(watcher, rx))
            .map_err(WatchError::Spawn)?;

        tracing::info!(path = %path.display(), "Logging configuration watcher started");
        Ok(())
    }
}

struct WatchLoop {
    path: PathBuf,
    last_seen: ConfigHash,
    debounce: Duration,
    callback: WatchCallback,
}

impl WatchLoop {
    fn run(mut self, watcher: RecommendedWatcher, rx: Receiver<notify::Result<Event>>) {
        // Dropping the watcher ends the OS-level watch.
        let _watcher = watcher;

        while let Ok(res) = rx.recv() {
            match res {
                Ok(event) if self.concerns(&event) => {}
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Watch error");
                    continue;
                }
            }

            if !self.settle(&rx) {
                return;
            }

            let document = match fs::read(&self.path) {
                Ok(content) => ConfigDocument::new(content),
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Could not read changed configuration");
                    continue;
                }
            };
            if document.hash() == self.last_seen {
                tracing::debug!(path = %self.path.display(), "Change event without content change");
                continue;
            }
            self.last_seen = document.hash();

            if (self.callback)(document) == WatchControl::Stop {
                break;
            }
        }

        tracing::debug!(path = %self.path.display(), "Logging configuration watcher stopped");
    }

    /// Wait until events pause for one debounce window, but never longer
    /// than [`MAX_SETTLE_WINDOWS`] windows in total. `false` once the
    /// watcher is gone.
    fn settle(&self, rx: &Receiver<notify::Result<Event>>) -> bool {
        let deadline = Instant::now() + self.debounce * MAX_SETTLE_WINDOWS;
        loop {
            let wait = self.debounce.min(deadline.saturating_duration_since(Instant::now()));
            if wait.is_zero() {
                return true;
            }
            match rx.recv_timeout(wait) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return true,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
    }

    fn concerns(&self, event: &Event) -> bool {
        (event.kind.is_modify() || event.kind.is_create())
            && event
                .paths
                .iter()
                .any(|p| p == &self.path || p.file_name() == self.path.file_name())
    }
}
