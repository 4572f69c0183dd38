//! Status channel for the adapter's own operational messages.

use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Target under which status records are mirrored into `tracing`.
pub const STATUS_TARGET: &str = "hotlog::status";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

impl fmt::Display for StatusLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusLevel::Info => "INFO",
            StatusLevel::Warn => "WARN",
            StatusLevel::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// One status record.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub level: StatusLevel,
    pub message: String,
    /// Module that emitted the record.
    pub origin: &'static str,
    /// Rendered cause chain, errors only.
    pub cause: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u128,
}

/// Append-only, shareable list of status records.
#[derive(Clone, Default)]
pub struct StatusManager {
    records: Arc<Mutex<Vec<Status>>>,
}

impl StatusManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, origin: &'static str, message: impl Into<String>) {
        self.add(StatusLevel::Info, origin, message.into(), None);
    }

    pub fn warn(&self, origin: &'static str, message: impl Into<String>) {
        self.add(StatusLevel::Warn, origin, message.into(), None);
    }

    pub fn error(&self, origin: &'static str, message: impl Into<String>, cause: &dyn Error) {
        self.add(StatusLevel::Error, origin, message.into(), Some(render_chain(cause)));
    }

    /// Snapshot of all records so far, oldest first.
    pub fn statuses(&self) -> Vec<Status> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self, level: StatusLevel) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|s| s.level == level)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.count(StatusLevel::Error) > 0
    }

    /// Highest level recorded so far.
    pub fn highest_level(&self) -> Option<StatusLevel> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|s| s.level)
            .max()
    }

    fn add(&self, level: StatusLevel, origin: &'static str, message: String, cause: Option<String>) {
        match (level, &cause) {
            (StatusLevel::Info, _) => tracing::info!(target: STATUS_TARGET, origin, "{}", message),
            (StatusLevel::Warn, _) => tracing::warn!(target: STATUS_TARGET, origin, "{}", message),
            (StatusLevel::Error, Some(cause)) => {
                tracing::error!(target: STATUS_TARGET, origin, cause = %cause, "{}", message)
            }
            (StatusLevel::Error, None) => tracing::error!(target: STATUS_TARGET, origin, "{}", message),
        }

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Status { level, message, origin, cause, timestamp_ms });
    }
}

impl fmt::Debug for StatusManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusManager")
            .field("records", &self.records.lock().unwrap_or_else(PoisonError::into_inner).len())
            .finish()
    }
}

fn render_chain(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_records_are_appended_in_order() {
        let status = StatusManager::new();
        status.info("t", "first");
        status.warn("t", "second");

        let records = status.statuses();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].message, "first");
        assert_eq!(records[1].level, StatusLevel::Warn);
        assert!(!status.has_errors());
        assert_eq!(status.highest_level(), Some(StatusLevel::Warn));
    }

    #[test]
    fn test_error_keeps_cause() {
        let status = StatusManager::new();
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        status.error("t", "Could not configure logging.", &err);

        assert!(status.has_errors());
        let record = &status.statuses()[0];
        assert_eq!(record.cause.as_deref(), Some("denied"));
    }

    #[test]
    fn test_clones_share_records() {
        let status = StatusManager::new();
        let clone = status.clone();
        clone.info("t", "shared");
        assert_eq!(status.count(StatusLevel::Info), 1);
    }
}
