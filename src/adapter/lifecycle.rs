//! Initialization and shutdown.

use std::sync::Arc;

use crate::adapter::state::{EngineState, Mode, Phase};
use crate::adapter::{AdapterError, ReloadingAdapter};
use crate::backend::LoggingBackend;
use crate::source::ConfigHash;
use crate::watch::{WatchCallback, WatchControl};

const ORIGIN: &str = module_path!();

impl<B: LoggingBackend> ReloadingAdapter<B> {
    /// Finish initialization.
    ///
    /// With an applied configuration the adapter owns reloading and starts
    /// watching the configuration file. Without one, the configuration is
    /// treated as supplied by the host and nothing is watched. Calling this
    /// again never registers a second watch.
    pub fn ensure_initialized(&self) -> Result<(), AdapterError> {
        let mut state = self.lock();
        match state.phase {
            Phase::Closing | Phase::Closed => return Err(AdapterError::Closed),
            Phase::Initialized(Mode::Internal) => return Ok(()),
            Phase::Uninitialized | Phase::Initialized(Mode::External) => {}
        }

        let Some(hash) = state.hash else {
            if state.phase == Phase::Uninitialized {
                tracing::info!("Logging initialized with external configuration.");
                state.phase = Phase::Initialized(Mode::External);
            }
            return Ok(());
        };

        tracing::info!("Logging initialized.");
        state.phase = Phase::Initialized(Mode::Internal);
        self.register_watch(&state, hash);
        Ok(())
    }

    /// Stop the backend. Later watch callbacks return [`WatchControl::Stop`];
    /// later `configure`, `reload` and queries fail with
    /// [`AdapterError::Closed`].
    pub fn close(&self) {
        let mut state = self.lock();
        if state.phase.is_closing() {
            return;
        }
        state.phase = Phase::Closing;
        tracing::info!("Stopping logging.");
        if let Some(backend) = state.backend.take() {
            backend.stop();
        }
        state.phase = Phase::Closed;
    }

    fn register_watch(&self, state: &EngineState<B>, hash: ConfigHash) {
        let Some(watch) = &self.inner.watch else {
            tracing::debug!("Configuration watching disabled");
            return;
        };
        let Some(path) = state.location.as_ref().and_then(|l| l.watchable_path()) else {
            tracing::info!("Logging configured from a packaged resource, changes will not be watched.");
            return;
        };

        let adapter = Arc::downgrade(&self.inner);
        let callback: WatchCallback = Box::new(move |document| match adapter.upgrade() {
            Some(inner) => ReloadingAdapter { inner }.reconfigure(document),
            None => WatchControl::Stop,
        });

        if let Err(e) = watch.watch(path, hash, callback) {
            self.inner.status.error(
                ORIGIN,
                format!("Could not watch logging configuration {}.", path.display()),
                &e,
            );
        }
    }
}
