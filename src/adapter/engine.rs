//! Apply protocol: the hash gate and the build/reset/install sequence.

use crate::adapter::state::EngineState;
use crate::adapter::{AdapterError, ReloadingAdapter};
use crate::backend::{ApplyError, LoggingBackend};
use crate::source::{ConfigDocument, ConfigHash};
use crate::watch::WatchControl;

const ORIGIN: &str = module_path!();

/// What an apply did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new graph built from the document with this hash is live.
    Applied(ConfigHash),
    /// The document matched the live graph; nothing was touched.
    Unchanged,
    /// Resolution or apply failed and was reported as an ERROR status.
    /// The previous graph, if any, is still live.
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Teardown {
    Keep,
    Reset,
}

impl<B: LoggingBackend> ReloadingAdapter<B> {
    /// Bind `backend`, resolve the configuration source and apply it.
    ///
    /// Applying content identical to what is already live is a caller bug
    /// and fails with [`AdapterError::DuplicateConfiguration`]. Resolution
    /// and apply failures are reported on the status channel and yield
    /// [`ApplyOutcome::Failed`].
    ///
    /// `backend` replaces the bound one only once a graph is live on it.
    /// Until then a previously bound backend keeps its graph and its hash.
    pub fn configure(&self, backend: B) -> Result<ApplyOutcome, AdapterError> {
        let mut state = self.lock();
        if state.phase.is_closing() {
            return Err(AdapterError::Closed);
        }

        let resolved = match self.inner.source.resolve(&self.inner.status) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.inner.status.error(ORIGIN, "Could not configure logging.", &e);
                bind_if_unbound(&mut *state, backend);
                return Ok(ApplyOutcome::Failed);
            }
        };

        let hash = resolved.document.hash();
        if state.hash == Some(hash) {
            return Err(AdapterError::DuplicateConfiguration { hash });
        }
        state.location = Some(resolved.location);

        match apply(&backend, &resolved.document, Teardown::Keep) {
            Ok(()) => {
                state.backend = Some(backend);
                state.hash = Some(hash);
                tracing::debug!(hash = %hash, "Logging configured");
                Ok(ApplyOutcome::Applied(hash))
            }
            Err(e) => {
                self.inner.status.error(ORIGIN, "Could not configure logging.", &e);
                bind_if_unbound(&mut *state, backend);
                Ok(ApplyOutcome::Failed)
            }
        }
    }

    /// Apply a changed document delivered by the watch service.
    ///
    /// Content identical to the live configuration is ignored. Returns
    /// [`WatchControl::Stop`] once the adapter is closing.
    pub fn reconfigure(&self, document: ConfigDocument) -> WatchControl {
        let mut state = self.lock();
        if state.phase.is_closing() {
            tracing::debug!("Adapter closing, ignoring configuration change");
            return WatchControl::Stop;
        }
        self.reapply(&mut *state, &document);
        WatchControl::Continue
    }

    /// Re-read the configuration source and apply it if it changed.
    ///
    /// The location reported by `try_get_log_configuration` stays the one
    /// resolved by the last `configure`.
    pub fn reload(&self) -> Result<ApplyOutcome, AdapterError> {
        let mut state = self.lock();
        if state.phase.is_closing() {
            return Err(AdapterError::Closed);
        }
        if state.backend.is_none() {
            return Err(AdapterError::NoBackend);
        }

        let resolved = match self.inner.source.resolve(&self.inner.status) {
            Ok(resolved) => resolved,
            Err(e) => {
                self.inner.status.error(ORIGIN, "Could not reload logging configuration.", &e);
                return Ok(ApplyOutcome::Failed);
            }
        };
        Ok(self.reapply(&mut *state, &resolved.document))
    }

    fn reapply(&self, state: &mut EngineState<B>, document: &ConfigDocument) -> ApplyOutcome {
        let hash = document.hash();
        if state.hash == Some(hash) {
            tracing::debug!(hash = %hash, "Logging configuration unchanged");
            return ApplyOutcome::Unchanged;
        }

        tracing::info!("Reconfiguring logging.");
        let result = match &state.backend {
            Some(backend) => apply(backend, document, Teardown::Reset),
            None => Err(ApplyError::Unbound),
        };
        match result {
            Ok(()) => {
                state.hash = Some(hash);
                tracing::info!(hash = %hash, "Reconfigured logging.");
                ApplyOutcome::Applied(hash)
            }
            Err(e) => {
                self.inner.status.error(ORIGIN, "Could not reconfigure logging.", &e);
                ApplyOutcome::Failed
            }
        }
    }
}

/// A backend bound without a live graph has nothing to lose.
fn bind_if_unbound<B: LoggingBackend>(state: &mut EngineState<B>, backend: B) {
    if state.backend.is_none() {
        state.backend = Some(backend);
    }
}

/// Build first, then tear down and install. A failed build returns before
/// the live graph or the bridge is touched.
fn apply<B: LoggingBackend>(backend: &B, document: &ConfigDocument, teardown: Teardown) -> Result<(), ApplyError> {
    let graph = backend.build(document)?;
    if teardown == Teardown::Reset {
        backend.reset();
    }
    backend.install(graph);
    backend.reinstall_bridge();
    Ok(())
}
