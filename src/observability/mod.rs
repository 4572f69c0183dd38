//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Adapter operations produce:
//!     → status.rs (status records about the adapter itself)
//!     → tracing macros (adapter diagnostics, routed through the live graph)
//!
//! Consumers:
//!     → Host inspects StatusManager (tests, CLI `resolve`)
//!     → Every status is mirrored into tracing under `hotlog::status`
//! ```
//!
//! # Design Decisions
//! - Status records are append-only and separate from application output
//! - Environmental failures surface here instead of as return values
//! - Mirroring is best effort: with no graph installed it lands on the
//!   failsafe stderr output

pub mod status;

pub use status::{Status, StatusLevel, StatusManager};
