//! Process lifecycle around the adapter.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validate settings → Install tracing backend → configure → ensure_initialized
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Signal::Shutdown
//!     SIGHUP → Signal::Reload
//!
//! Shutdown (shutdown.rs):
//!     trigger() → notify subscribers → adapter.close()
//! ```
//!
//! # Design Decisions
//! - Startup fails only on contract breaches or an occupied global
//!   subscriber; a bad configuration still yields a running adapter
//! - Reload is a signal, not a restart
//! - Closing logging is the last step of shutdown

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::Signal;
pub use startup::{init, InitError};
