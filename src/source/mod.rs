//! Configuration source resolution.
//!
//! # Data Flow
//! ```text
//! ConfigSource::resolve()
//!     → packaged resource <active>      (found: use as-is, not watchable)
//!     → packaged resource <test>        (found: use as-is, not watchable)
//!     → external file <config_file>     (missing: copy default template, WARN)
//!     → read bytes → ConfigDocument (bytes + SHA-256)
//! ```
//!
//! # Design Decisions
//! - Precedence is fixed; the first hit wins
//! - Only the external file is watchable
//! - The external path is a constructor parameter, not process-wide state
//! - One INFO status names the resolved location on every resolution
//! - The default template is staged next to the target and moved into
//!   place, so a failed copy never leaves a partial file

pub mod hash;
pub mod resources;

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use hash::{ConfigDocument, ConfigHash};
pub use resources::{ResourceBundle, DEFAULT_TEMPLATE, DEFAULT_TEMPLATE_NAME};

use crate::observability::StatusManager;

const ORIGIN: &str = module_path!();

/// Where the active configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedConfigLocation {
    /// A packaged resource, identified by name. Not watchable.
    Resource(String),
    /// An absolute filesystem path. Watchable.
    File(PathBuf),
}

impl ResolvedConfigLocation {
    pub fn uri(&self) -> Option<Url> {
        match self {
            ResolvedConfigLocation::Resource(name) => ResourceBundle::uri(name),
            ResolvedConfigLocation::File(path) => Url::from_file_path(path).ok(),
        }
    }

    /// The path to watch, if this location can be watched at all.
    pub fn watchable_path(&self) -> Option<&Path> {
        match self {
            ResolvedConfigLocation::Resource(_) => None,
            ResolvedConfigLocation::File(path) => Some(path),
        }
    }
}

impl fmt::Display for ResolvedConfigLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.uri() {
            Some(uri) => write!(f, "{uri}"),
            None => match self {
                ResolvedConfigLocation::Resource(name) => write!(f, "resource {name}"),
                ResolvedConfigLocation::File(path) => write!(f, "{}", path.display()),
            },
        }
    }
}

/// A resolved location together with the document read from it.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub location: ResolvedConfigLocation,
    pub document: ConfigDocument,
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to read configuration from {location}")]
    Read {
        location: ResolvedConfigLocation,
        #[source]
        source: io::Error,
    },

    #[error("default template resource {name} is not available")]
    MissingTemplate { name: String },

    #[error("failed to copy default template to {}", path.display())]
    CopyTemplate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Names of the packaged resources consulted during resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourceNames {
    /// Resource for the regular environment.
    pub active: String,

    /// Resource for the test environment.
    pub test: String,

    /// Template copied to the external file when it does not exist.
    pub default_template: String,
}

impl Default for ResourceNames {
    fn default() -> Self {
        Self {
            active: "logging.toml".to_string(),
            test: "logging-test.toml".to_string(),
            default_template: DEFAULT_TEMPLATE_NAME.to_string(),
        }
    }
}

/// Resolves which configuration document is active.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    resources: ResourceBundle,
    names: ResourceNames,
    config_file: PathBuf,
}

impl ConfigSource {
    /// `config_file` should be absolute; see [`std::path::absolute`].
    pub fn new(resources: ResourceBundle, names: ResourceNames, config_file: impl Into<PathBuf>) -> Self {
        Self {
            resources,
            names,
            config_file: config_file.into(),
        }
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    pub fn resources(&self) -> &ResourceBundle {
        &self.resources
    }

    /// Determine the location without reading it or creating any file.
    pub fn locate(&self) -> ResolvedConfigLocation {
        [&self.names.active, &self.names.test]
            .into_iter()
            .find(|name| self.resources.contains(name))
            .map(|name| ResolvedConfigLocation::Resource(name.clone()))
            .unwrap_or_else(|| ResolvedConfigLocation::File(self.config_file.clone()))
    }

    /// Resolve and read the active configuration.
    ///
    /// Copies the default template into place when the external file is
    /// missing. Emits one INFO status naming the location.
    pub fn resolve(&self, status: &StatusManager) -> Result<ResolvedConfig, ResolutionError> {
        let location = self.locate();

        let content = match &location {
            ResolvedConfigLocation::Resource(name) => {
                status.info(ORIGIN, format!("Configuring logging from {location}."));
                self.resources
                    .get(name)
                    .and_then(|content| {
                        content.ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "resource vanished"))
                    })
                    .map_err(|source| ResolutionError::Read {
                        location: location.clone(),
                        source,
                    })?
            }
            ResolvedConfigLocation::File(path) => {
                if !path.exists() {
                    self.copy_default_template(path, status)?;
                }
                status.info(ORIGIN, format!("Configuring logging from {location}."));
                fs::read(path).map_err(|source| ResolutionError::Read {
                    location: location.clone(),
                    source,
                })?
            }
        };

        Ok(ResolvedConfig {
            location,
            document: ConfigDocument::new(content),
        })
    }

    fn copy_default_template(&self, path: &Path, status: &StatusManager) -> Result<(), ResolutionError> {
        let name = &self.names.default_template;
        let template = self
            .resources
            .get(name)
            .ok()
            .flatten()
            .ok_or_else(|| ResolutionError::MissingTemplate { name: name.clone() })?;

        let copy_err = |source: io::Error| ResolutionError::CopyTemplate {
            path: path.to_path_buf(),
            source,
        };

        match write_new_file(path, |file| file.write_all(&template)) {
            Ok(true) => {}
            Ok(false) => return Ok(()),
            Err(e) => return Err(copy_err(e)),
        }

        let from = ResourceBundle::uri(name).map_or_else(|| name.clone(), |u| u.to_string());
        status.warn(
            ORIGIN,
            format!(
                "Logging configuration file {} did not exist, copied default from {}.",
                path.display(),
                from
            ),
        );
        Ok(())
    }
}

/// Fill a staging file next to `path`, then move it into place unless
/// `path` exists by then. `Ok(false)` when another writer got there first.
/// `path` only ever appears with complete content.
fn write_new_file(path: &Path, fill: impl FnOnce(&mut File) -> io::Result<()>) -> io::Result<bool> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new().prefix(".hotlog-").tempfile_in(dir)?;
    fill(staged.as_file_mut())?;
    staged.as_file().sync_all()?;

    match staged.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::StatusLevel;

    fn source_in(dir: &Path, resources: ResourceBundle) -> ConfigSource {
        ConfigSource::new(resources, ResourceNames::default(), dir.join("logging.toml"))
    }

    #[test]
    fn test_active_resource_wins() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logging.toml"), b"external").unwrap();
        let resources = ResourceBundle::bundled()
            .with_resource("logging.toml", "active")
            .with_resource("logging-test.toml", "test");

        let status = StatusManager::new();
        let resolved = source_in(dir.path(), resources).resolve(&status).unwrap();

        assert_eq!(resolved.location, ResolvedConfigLocation::Resource("logging.toml".into()));
        assert_eq!(resolved.document.bytes(), b"active");
        assert!(resolved.location.watchable_path().is_none());
    }

    #[test]
    fn test_test_resource_before_external_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logging.toml"), b"external").unwrap();
        let resources = ResourceBundle::bundled().with_resource("logging-test.toml", "test");

        let resolved = source_in(dir.path(), resources)
            .resolve(&StatusManager::new())
            .unwrap();

        assert_eq!(resolved.location, ResolvedConfigLocation::Resource("logging-test.toml".into()));
        assert_eq!(resolved.document.bytes(), b"test");
    }

    #[test]
    fn test_existing_external_file_is_used() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logging.toml");
        fs::write(&path, b"external").unwrap();

        let status = StatusManager::new();
        let resolved = source_in(dir.path(), ResourceBundle::bundled()).resolve(&status).unwrap();

        assert_eq!(resolved.location, ResolvedConfigLocation::File(path.clone()));
        assert_eq!(resolved.location.watchable_path(), Some(path.as_path()));
        assert_eq!(resolved.document.bytes(), b"external");
        assert_eq!(status.count(StatusLevel::Warn), 0);
        assert_eq!(status.count(StatusLevel::Info), 1);
    }

    #[test]
    fn test_missing_external_file_gets_default_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logging.toml");

        let status = StatusManager::new();
        let resolved = source_in(dir.path(), ResourceBundle::bundled()).resolve(&status).unwrap();

        assert!(path.exists());
        assert_eq!(fs::read(&path).unwrap(), DEFAULT_TEMPLATE);
        assert_eq!(resolved.document.bytes(), DEFAULT_TEMPLATE);
        assert_eq!(status.count(StatusLevel::Warn), 1);
    }

    #[test]
    fn test_missing_template_is_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = source_in(dir.path(), ResourceBundle::new())
            .resolve(&StatusManager::new())
            .unwrap_err();
        assert!(matches!(err, ResolutionError::MissingTemplate { .. }));
        assert!(!dir.path().join("logging.toml").exists());
    }

    #[test]
    fn test_copy_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = ConfigSource::new(
            ResourceBundle::bundled(),
            ResourceNames::default(),
            dir.path().join("absent").join("logging.toml"),
        );
        let err = source.resolve(&StatusManager::new()).unwrap_err();
        assert!(matches!(err, ResolutionError::CopyTemplate { .. }));
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_default_copy_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        source_in(dir.path(), ResourceBundle::bundled())
            .resolve(&StatusManager::new())
            .unwrap();
        assert_eq!(dir_entries(dir.path()), vec!["logging.toml"]);
    }

    #[test]
    fn test_failed_write_leaves_no_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logging.toml");

        let err = write_new_file(&path, |file| {
            file.write_all(b"[root]\nlev")?;
            Err(io::Error::other("disk full"))
        })
        .unwrap_err();

        assert_eq!(err.to_string(), "disk full");
        assert!(!path.exists());
        assert!(dir_entries(dir.path()).is_empty());

        // The next resolution still copies the whole template and warns.
        let status = StatusManager::new();
        let resolved = source_in(dir.path(), ResourceBundle::bundled()).resolve(&status).unwrap();
        assert_eq!(resolved.document.bytes(), DEFAULT_TEMPLATE);
        assert_eq!(status.count(StatusLevel::Warn), 1);
    }

    #[test]
    fn test_copy_never_clobbers_a_file_created_meanwhile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logging.toml");
        fs::write(&path, b"mine").unwrap();

        let status = StatusManager::new();
        source_in(dir.path(), ResourceBundle::bundled())
            .copy_default_template(&path, &status)
            .unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"mine");
        assert_eq!(status.count(StatusLevel::Warn), 0);
        assert_eq!(dir_entries(dir.path()), vec!["logging.toml"]);
    }

    #[test]
    fn test_file_location_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logging.toml");
        let uri = ResolvedConfigLocation::File(path).uri().unwrap();
        assert_eq!(uri.scheme(), "file");
        assert!(uri.path().ends_with("/logging.toml"));
    }
}
