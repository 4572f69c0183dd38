//! Self-reconfiguring logging adapter.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     configure(backend) → ConfigSource::resolve → hash gate → backend.build
//!         → backend.install → reinstall bridge → record hash
//!     ensure_initialized() → Internal: register watch | External: no watch
//!
//! On change:
//!     watch thread → reconfigure(document) → hash gate (same: no-op)
//!         → backend.build → backend.reset → backend.install → bridge
//!
//! Shutdown:
//!     close() → Closing → backend.stop → Closed
//!     next watch callback → Stop
//! ```
//!
//! # Design Decisions
//! - One mutex around a small state struct serializes every operation,
//!   including the backend's apply step; the graph is never seen mid-rebuild
//! - Environmental failures become ERROR statuses and leave the previous
//!   graph running; contract violations are returned as `AdapterError`
//! - The watch callback holds a weak reference, so a dropped adapter stops
//!   its watch on the next change

pub mod directory;
pub mod engine;
pub mod lifecycle;
pub mod state;

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use url::Url;

pub use directory::INFO_DESTINATION;
pub use engine::ApplyOutcome;
pub use state::{Mode, Phase};

use crate::backend::LoggingBackend;
use crate::config::AdapterConfig;
use crate::observability::StatusManager;
use crate::source::{ConfigHash, ConfigSource, ResourceBundle};
use crate::watch::{FileWatchService, NotifyWatchService};

use self::state::EngineState;

/// A breach of the adapter's calling contract by the host.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("configuration {hash} is already applied; configure must not be repeated with identical content")]
    DuplicateConfiguration { hash: ConfigHash },

    #[error("logging adapter is closed")]
    Closed,

    #[error("no logging backend has been configured")]
    NoBackend,
}

/// Operations a hosting process uses to manage its logging.
pub trait LogAdapter: Send + Sync {
    /// Finish initialization. Idempotent.
    fn ensure_initialized(&self) -> Result<(), AdapterError>;

    /// Stop logging. Idempotent.
    fn close(&self);

    /// Directory of the `info` log file, if there is one and it exists.
    fn try_get_log_file_directory(&self) -> Result<Option<PathBuf>, AdapterError>;

    /// Where the active configuration was read from.
    fn try_get_log_configuration(&self) -> Result<Option<Url>, AdapterError>;
}

/// Binds a logging backend to an editable configuration file.
///
/// Cheap to clone; clones share the same state.
pub struct ReloadingAdapter<B: LoggingBackend> {
    inner: Arc<Inner<B>>,
}

struct Inner<B> {
    source: ConfigSource,
    watch: Option<Arc<dyn FileWatchService>>,
    status: StatusManager,
    state: Mutex<EngineState<B>>,
}

impl<B: LoggingBackend> ReloadingAdapter<B> {
    /// Create an adapter. Without a watch service, changes are only picked
    /// up through [`reload`](Self::reload).
    pub fn new(source: ConfigSource, watch: Option<Arc<dyn FileWatchService>>, status: StatusManager) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                watch,
                status,
                state: Mutex::new(EngineState::new()),
            }),
        }
    }

    /// Create an adapter from settings, watching with `notify` when enabled.
    pub fn from_config(config: &AdapterConfig) -> io::Result<Self> {
        let mut resources = ResourceBundle::bundled();
        if let Some(dir) = &config.resource_dir {
            resources = resources.with_dir(dir);
        }
        let source = ConfigSource::new(resources, config.resources.clone(), config.absolute_config_file()?);

        let watch: Option<Arc<dyn FileWatchService>> = config.watch.enabled.then(|| {
            Arc::new(NotifyWatchService::new(config.watch.poll_interval(), config.watch.debounce())) as Arc<dyn FileWatchService>
        });

        Ok(Self::new(source, watch, StatusManager::new()))
    }

    pub fn status(&self) -> &StatusManager {
        &self.inner.status
    }

    pub fn source(&self) -> &ConfigSource {
        &self.inner.source
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase
    }

    /// Hash of the configuration the live graph was built from.
    pub fn current_hash(&self) -> Option<ConfigHash> {
        self.lock().hash
    }

    /// Run `f` against the bound backend while holding the adapter lock.
    pub fn with_backend<R>(&self, f: impl FnOnce(&B) -> R) -> Option<R> {
        self.lock().backend.as_ref().map(f)
    }

    fn lock(&self) -> MutexGuard<'_, EngineState<B>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<B: LoggingBackend> Clone for ReloadingAdapter<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: LoggingBackend> fmt::Debug for ReloadingAdapter<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ReloadingAdapter")
            .field("phase", &state.phase)
            .field("hash", &state.hash)
            .field("location", &state.location)
            .field("config_file", &self.inner.source.config_file())
            .finish()
    }
}

impl<B: LoggingBackend> LogAdapter for ReloadingAdapter<B> {
    fn ensure_initialized(&self) -> Result<(), AdapterError> {
        ReloadingAdapter::ensure_initialized(self)
    }

    fn close(&self) {
        ReloadingAdapter::close(self)
    }

    fn try_get_log_file_directory(&self) -> Result<Option<PathBuf>, AdapterError> {
        ReloadingAdapter::try_get_log_file_directory(self)
    }

    fn try_get_log_configuration(&self) -> Result<Option<Url>, AdapterError> {
        ReloadingAdapter::try_get_log_configuration(self)
    }
}
