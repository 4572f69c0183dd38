//! Introspection of the live configuration.

use std::path::{Path, PathBuf};

use url::Url;

use crate::adapter::{AdapterError, ReloadingAdapter};
use crate::backend::LoggingBackend;

/// Name of the destination whose file marks the log directory.
pub const INFO_DESTINATION: &str = "info";

impl<B: LoggingBackend> ReloadingAdapter<B> {
    /// Parent directory of the file written by the `info` destination.
    ///
    /// `None` when there is no such file-backed destination or when its
    /// directory no longer exists.
    pub fn try_get_log_file_directory(&self) -> Result<Option<PathBuf>, AdapterError> {
        self.ensure_initialized()?;
        let state = self.lock();
        if state.phase.is_closing() {
            return Err(AdapterError::Closed);
        }
        let Some(backend) = &state.backend else {
            return Ok(None);
        };

        Ok(backend
            .destinations()
            .into_iter()
            .filter(|d| d.name == INFO_DESTINATION)
            .find_map(|d| d.file)
            .and_then(|file| std::path::absolute(file).ok())
            .and_then(|file| file.parent().map(Path::to_path_buf))
            .filter(|dir| dir.is_dir()))
    }

    /// URI of the location the active configuration was resolved from.
    pub fn try_get_log_configuration(&self) -> Result<Option<Url>, AdapterError> {
        self.ensure_initialized()?;
        let state = self.lock();
        if state.phase.is_closing() {
            return Err(AdapterError::Closed);
        }
        Ok(state.location.as_ref().and_then(|l| l.uri()))
    }
}
