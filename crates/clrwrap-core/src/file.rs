//! Generated output files and their content digests.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A 32-byte SHA-256 digest of a file's content.
pub type ContentDigest = [u8; 32];

/// Digest of raw bytes.
pub fn content_digest(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Format a digest as lowercase hex.
pub fn digest_hex(digest: &ContentDigest) -> String {
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// The header declaring the managed types.
    Declaration,
    /// The translation unit implementing them.
    Definition,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Declaration => f.write_str("declaration"),
            FileKind::Definition => f.write_str("definition"),
        }
    }
}

/// One emitted file. Contents are final bytes, newline convention applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFile {
    pub kind: FileKind,
    pub name: String,
    #[serde(skip)]
    pub contents: Vec<u8>,
}

impl GeneratedFile {
    pub fn new(kind: FileKind, name: impl Into<String>, contents: Vec<u8>) -> Self {
        Self {
            kind,
            name: name.into(),
            contents,
        }
    }

    pub fn digest(&self) -> ContentDigest {
        content_digest(&self.contents)
    }

    /// Contents as text. Generated files are always UTF-8.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = GeneratedFile::new(FileKind::Declaration, "M.h", b"namespace M {}\n".to_vec());
        let b = GeneratedFile::new(FileKind::Declaration, "M.h", b"namespace M {}\n".to_vec());
        assert_eq!(a.digest(), b.digest());
        assert_eq!(digest_hex(&a.digest()).len(), 64);
    }

    #[test]
    fn digest_tracks_content() {
        let a = GeneratedFile::new(FileKind::Definition, "M.cpp", b"a".to_vec());
        let b = GeneratedFile::new(FileKind::Definition, "M.cpp", b"b".to_vec());
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.text(), "a");
    }
}
