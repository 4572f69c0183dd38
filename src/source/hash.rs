//! Content hashing for change detection.

use std::fmt;
use std::str::Utf8Error;
use std::sync::Arc;

use sha2::{Digest, Sha256};

/// SHA-256 digest of a configuration document.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigHash([u8; 32]);

impl ConfigHash {
    /// Hash arbitrary content.
    pub fn of(content: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(content);
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for ConfigHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConfigHash({})", &hex::encode(self.0)[..12])
    }
}

/// Immutable configuration bytes together with their hash.
///
/// Cloning is cheap; the content is shared.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfigDocument {
    content: Arc<[u8]>,
    hash: ConfigHash,
}

impl ConfigDocument {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        let content: Arc<[u8]> = content.into().into();
        let hash = ConfigHash::of(&content);
        Self { content, hash }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.content
    }

    pub fn hash(&self) -> ConfigHash {
        self.hash
    }

    /// The content as text, for backends whose grammar is textual.
    pub fn as_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.content)
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

impl fmt::Debug for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigDocument")
            .field("len", &self.content.len())
            .field("hash", &self.hash)
            .finish()
    }
}

impl From<&str> for ConfigDocument {
    fn from(text: &str) -> Self {
        Self::new(text.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(ConfigHash::of(b"level = \"info\""), ConfigHash::of(b"level = \"info\""));
        assert_ne!(ConfigHash::of(b"a"), ConfigHash::of(b"b"));
    }

    #[test]
    fn test_known_digest() {
        // sha256("")
        assert_eq!(
            ConfigHash::of(b"").to_string(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_document_carries_hash_of_content() {
        let doc = ConfigDocument::from("[root]\nlevel = \"warn\"\n");
        assert_eq!(doc.hash(), ConfigHash::of(doc.bytes()));
        assert_eq!(doc.as_str().unwrap(), "[root]\nlevel = \"warn\"\n");
        assert!(!doc.is_empty());
    }
}
