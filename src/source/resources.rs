//! Packaged configuration resources.
//!
//! Resources are either compiled into the binary or read from a resource
//! directory shipped alongside it. Either way they are read-only from the
//! adapter's point of view and never watched.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use url::Url;

/// Name under which the bundled default template is registered.
pub const DEFAULT_TEMPLATE_NAME: &str = "logging-default.toml";

/// The default template, copied byte-for-byte when no external file exists.
pub const DEFAULT_TEMPLATE: &[u8] = include_bytes!("../../resources/logging-default.toml");

/// A lookup table of named, read-only resources.
#[derive(Clone, Debug, Default)]
pub struct ResourceBundle {
    embedded: HashMap<String, Arc<[u8]>>,
    dir: Option<PathBuf>,
}

impl ResourceBundle {
    /// An empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundle shipped with this crate: only the default template.
    pub fn bundled() -> Self {
        Self::new().with_resource(DEFAULT_TEMPLATE_NAME, DEFAULT_TEMPLATE)
    }

    pub fn with_resource(mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        self.embedded.insert(name.into(), content.into().into());
        self
    }

    /// Also look up resources in `dir`. Embedded resources take precedence.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Whether a resource with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.embedded.contains_key(name) || self.dir_entry(name).is_some_and(|p| p.is_file())
    }

    /// Read a resource. `Ok(None)` when it does not exist.
    pub fn get(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        if let Some(content) = self.embedded.get(name) {
            return Ok(Some(content.to_vec()));
        }
        match self.dir_entry(name) {
            Some(path) => match fs::read(&path) {
                Ok(content) => Ok(Some(content)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            },
            None => Ok(None),
        }
    }

    /// The URI a resource is reported under, e.g. `resource:/logging.toml`.
    pub fn uri(name: &str) -> Option<Url> {
        let name = name.trim_start_matches('/');
        Url::parse(&format!("resource:/{name}")).ok()
    }

    fn dir_entry(&self, name: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_contains_template() {
        let bundle = ResourceBundle::bundled();
        assert!(bundle.contains(DEFAULT_TEMPLATE_NAME));
        assert_eq!(bundle.get(DEFAULT_TEMPLATE_NAME).unwrap().unwrap(), DEFAULT_TEMPLATE);
        assert!(bundle.get("logging.toml").unwrap().is_none());
    }

    #[test]
    fn test_dir_lookup() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logging-test.toml"), b"[root]\n").unwrap();

        let bundle = ResourceBundle::new().with_dir(dir.path());
        assert!(bundle.contains("logging-test.toml"));
        assert!(!bundle.contains("logging.toml"));
        assert_eq!(bundle.get("logging-test.toml").unwrap().unwrap(), b"[root]\n");
    }

    #[test]
    fn test_embedded_shadows_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("logging.toml"), b"from dir").unwrap();

        let bundle = ResourceBundle::new()
            .with_dir(dir.path())
            .with_resource("logging.toml", "embedded");
        assert_eq!(bundle.get("logging.toml").unwrap().unwrap(), b"embedded");
    }

    #[test]
    fn test_uri() {
        assert_eq!(ResourceBundle::uri("logging.toml").unwrap().as_str(), "resource:/logging.toml");
        assert_eq!(ResourceBundle::uri("/logging.toml").unwrap().as_str(), "resource:/logging.toml");
    }
}
