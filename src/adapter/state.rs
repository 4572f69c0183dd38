//! Adapter state guarded by the adapter lock.

use std::fmt;

use crate::source::{ConfigHash, ResolvedConfigLocation};

/// Who owns reload-watching once initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The adapter applied the configuration and watches it.
    Internal,
    /// The host supplied the configuration; nothing is watched.
    External,
}

/// Lifecycle phase of an adapter.
///
/// ```text
/// Uninitialized → Initialized(Internal | External) → Closing → Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Initialized(Mode),
    Closing,
    Closed,
}

impl Phase {
    pub fn is_closing(self) -> bool {
        matches!(self, Phase::Closing | Phase::Closed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Uninitialized => f.write_str("uninitialized"),
            Phase::Initialized(Mode::Internal) => f.write_str("initialized (internal)"),
            Phase::Initialized(Mode::External) => f.write_str("initialized (external)"),
            Phase::Closing => f.write_str("closing"),
            Phase::Closed => f.write_str("closed"),
        }
    }
}

/// Everything the lock protects.
pub(crate) struct EngineState<B> {
    pub(crate) phase: Phase,
    /// Bound by `configure`, released by `close`.
    pub(crate) backend: Option<B>,
    /// Hash of the document the live graph was built from.
    pub(crate) hash: Option<ConfigHash>,
    /// Location resolved by the last `configure`.
    pub(crate) location: Option<ResolvedConfigLocation>,
}

impl<B> EngineState<B> {
    pub(crate) fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
            backend: None,
            hash: None,
            location: None,
        }
    }
}
