//! Logging backend contract and the `tracing`-based implementation.
//!
//! # Data Flow
//! ```text
//! ConfigDocument
//!     → LoggingBackend::build()          (parse, open files; may fail)
//!     → [reset()]                        (watch-triggered applies only)
//!     → install(graph)                   (atomic swap; cannot fail)
//!     → reinstall_bridge()               (legacy `log` facade follows the new graph)
//! ```
//!
//! # Design Decisions
//! - All fallible work happens in `build`, before anything is torn down
//! - `install` replaces the whole graph; documents are never merged
//! - The backend is driven by the adapter under its lock and does no
//!   locking of its own around the graph

pub mod bridge;
pub mod graph;
pub mod subscriber;

use std::io;
use std::path::PathBuf;
use std::str::Utf8Error;

use thiserror::Error;

use crate::source::ConfigDocument;

pub use self::bridge::LegacyBridge;
pub use self::graph::LoggerGraph;
pub use self::subscriber::{BackendInitError, TracingBackend};

/// An output destination attached to the live logger graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    /// The appender name from the configuration document.
    pub name: String,
    /// The file written to, for file-backed destinations.
    pub file: Option<PathBuf>,
}

/// A configuration document the backend could not turn into a graph.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("configuration is not valid UTF-8")]
    Encoding(#[from] Utf8Error),

    #[error("configuration could not be parsed")]
    Parse(#[from] toml::de::Error),

    #[error("logger {logger} has invalid level {level:?}")]
    InvalidLevel { logger: String, level: String },

    #[error("logger {logger} references unknown appender {appender}")]
    UnknownAppender { logger: String, appender: String },

    #[error("failed to open log file {}", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("configuration rejected: {0}")]
    Rejected(String),

    #[error("no logging backend is bound")]
    Unbound,
}

/// The logging backend the adapter drives.
///
/// Implementations own the live logger graph. The adapter calls every
/// method while holding its lock, so implementations never see two of
/// these calls at once.
pub trait LoggingBackend: Send + Sync + 'static {
    /// A fully prepared graph, ready to be installed.
    type Graph: Send;

    /// Prepare a graph from `document` without touching the live one.
    fn build(&self, document: &ConfigDocument) -> Result<Self::Graph, ApplyError>;

    /// Replace the live graph.
    fn install(&self, graph: Self::Graph);

    /// Tear the live graph down, falling back to failsafe output.
    fn reset(&self);

    /// Tear the live graph down for good.
    fn stop(&self);

    /// Remove and reinstall the bridge from the legacy logging facade.
    fn reinstall_bridge(&self);

    /// Output destinations of the live graph.
    fn destinations(&self) -> Vec<Destination>;
}
