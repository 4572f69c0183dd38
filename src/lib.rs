//! Self-reconfiguring logging runtime adapter.
//!
//! Binds a `tracing` logger graph to an editable configuration file and
//! re-applies the file whenever its content changes, without restarting the
//! process.
//!
//! ```no_run
//! use hotlog::config::AdapterConfig;
//!
//! let adapter = hotlog::init(&AdapterConfig::default())?;
//! tracing::info!("logging is live");
//! if let Some(dir) = adapter.try_get_log_file_directory()? {
//!     println!("log files in {}", dir.display());
//! }
//! adapter.close();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core
pub mod adapter;
pub mod backend;
pub mod source;
pub mod watch;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use adapter::{AdapterError, ApplyOutcome, LogAdapter, Mode, Phase, ReloadingAdapter};
pub use backend::{LoggingBackend, TracingBackend};
pub use lifecycle::init;
pub use source::{ConfigDocument, ConfigHash};
pub use watch::{FileWatchService, WatchControl};
