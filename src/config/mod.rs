//! Adapter settings.
//!
//! # Data Flow
//! ```text
//! settings file (TOML) or AdapterConfig::default()
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AdapterConfig (validated, immutable)
//!     → ReloadingAdapter::from_config / lifecycle::startup::init
//! ```
//!
//! # Design Decisions
//! - These settings describe the adapter, not the logging graph; the
//!   graph's own configuration is what the adapter reloads
//! - All fields have defaults to allow minimal settings
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{AdapterConfig, WatchConfig};
