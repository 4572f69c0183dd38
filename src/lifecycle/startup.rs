//! Startup orchestration: the configurator entry point.

use std::io;

use thiserror::Error;

use crate::adapter::{AdapterError, ReloadingAdapter};
use crate::backend::{BackendInitError, TracingBackend};
use crate::config::validation::{validate_config, ValidationError};
use crate::config::AdapterConfig;

#[derive(Debug, Error)]
pub enum InitError {
    #[error("invalid adapter settings: {}", format_errors(.0))]
    Settings(Vec<ValidationError>),

    #[error("could not determine the configuration file path")]
    Path(#[from] io::Error),

    #[error(transparent)]
    Backend(#[from] BackendInitError),

    #[error(transparent)]
    Adapter(#[from] AdapterError),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Install the tracing backend as the process-wide subscriber, apply the
/// resolved configuration and start watching it.
///
/// A configuration that cannot be read or applied does not fail startup:
/// it is reported on the adapter's status channel and output stays on the
/// failsafe stderr logger until a valid configuration arrives.
pub fn init(config: &AdapterConfig) -> Result<ReloadingAdapter<TracingBackend>, InitError> {
    validate_config(config).map_err(InitError::Settings)?;

    let adapter = ReloadingAdapter::from_config(config)?;
    let backend = TracingBackend::install_global()?;
    adapter.configure(backend)?;
    adapter.ensure_initialized()?;

    tracing::debug!(phase = %adapter.phase(), "Logging adapter ready");
    Ok(adapter)
}
