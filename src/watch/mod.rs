//! File watching for configuration reloads.
//!
//! # Data Flow
//! ```text
//! FileWatchService::watch(path, last_known_hash, callback)
//!     → OS notification (native.rs, notify crate)
//!     → debounce, read file, hash
//!     → hash == last seen?  skip
//!     → callback(document) → WatchControl::Continue | Stop
//! ```
//!
//! # Design Decisions
//! - The service owns the watch thread; the adapter only supplies a callback
//! - Cancellation is cooperative: the callback returns `Stop`
//! - The callback is never invoked from inside `watch` itself, so callers
//!   may register while holding their own locks

pub mod native;

use std::io;
use std::path::Path;

use thiserror::Error;

pub use native::NotifyWatchService;

use crate::source::{ConfigDocument, ConfigHash};

/// What the watch service should do after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchControl {
    Continue,
    Stop,
}

impl WatchControl {
    pub fn is_continue(self) -> bool {
        self == WatchControl::Continue
    }
}

/// Invoked with the new content each time the watched file changes.
pub type WatchCallback = Box<dyn FnMut(ConfigDocument) -> WatchControl + Send + 'static>;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("cannot watch {path}: it has no parent directory")]
    NoParent { path: String },

    #[error("file watcher failed")]
    Notify(#[from] notify::Error),

    #[error("failed to spawn watch thread")]
    Spawn(#[source] io::Error),
}

/// Notifies a callback when a file's content hash changes.
pub trait FileWatchService: Send + Sync {
    /// Start watching `path`. Changes are reported only when the content
    /// hash differs from the last one seen, starting from `last_known`.
    fn watch(&self, path: &Path, last_known: ConfigHash, callback: WatchCallback) -> Result<(), WatchError>;
}
