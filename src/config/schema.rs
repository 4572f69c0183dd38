//! Configuration schema definitions.
//!
//! Settings of the adapter itself, as opposed to the logging configuration
//! it manages. All types derive Serde traits so hosts can embed them in
//! their own configuration files.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::source::ResourceNames;

/// Root settings for the logging adapter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// External configuration file, relative to the working directory
    /// unless absolute.
    pub config_file: PathBuf,

    /// Directory of packaged resources shipped alongside the binary.
    pub resource_dir: Option<PathBuf>,

    /// Names of the packaged resources.
    pub resources: ResourceNames,

    /// File watching settings.
    pub watch: WatchConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("logging.toml"),
            resource_dir: None,
            resources: ResourceNames::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl AdapterConfig {
    /// `config_file` made absolute against the current working directory.
    pub fn absolute_config_file(&self) -> io::Result<PathBuf> {
        std::path::absolute(&self.config_file)
    }
}

/// File watching configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Watch the external configuration file for changes.
    pub enabled: bool,

    /// Poll interval for platforms without native notifications.
    pub poll_interval_ms: u64,

    /// Quiet period after the last change event before reloading.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 2_000,
            debounce_ms: 100,
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdapterConfig::default();
        assert_eq!(config.config_file, PathBuf::from("logging.toml"));
        assert_eq!(config.resources.active, "logging.toml");
        assert_eq!(config.resources.test, "logging-test.toml");
        assert!(config.watch.enabled);
        assert_eq!(config.watch.debounce(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AdapterConfig = toml::from_str(
            r#"
            config_file = "/etc/app/logging.toml"

            [watch]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.config_file, PathBuf::from("/etc/app/logging.toml"));
        assert!(!config.watch.enabled);
        assert_eq!(config.watch.poll_interval_ms, 2_000);
        assert_eq!(config.resources.default_template, "logging-default.toml");
    }

    #[test]
    fn test_absolute_config_file() {
        let config = AdapterConfig::default();
        let path = config.absolute_config_file().unwrap();
        assert!(path.is_absolute());
        assert!(path.ends_with("logging.toml"));
    }
}
