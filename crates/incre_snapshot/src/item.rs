//! Keyed, fingerprinted item types.
//!
//! An item carries a key that identifies it across scans and a fingerprint
//! that changes whenever the item's content is considered changed.

use incre_common::ContentHash;
use serde::{Deserialize, Serialize};

/// The capability every snapshot item provides.
///
/// `key` must be stable across scans and unique within one snapshot.
/// `fingerprint_equals` compares only fingerprint state; it is only ever called
/// on two items whose keys are already known to be equal.
pub trait Fingerprintable: Clone {
    /// Tag recorded in persisted state so one item kind is never decoded as another.
    const KIND: &'static str;

    /// The item's key.
    fn key(&self) -> &str;

    /// Returns `true` if `other` (an item with the same key) is unchanged.
    fn fingerprint_equals(&self, other: &Self) -> bool;
}

/// Change-detection state of a scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFingerprint {
    /// Last-modified time and byte length.
    Metadata {
        /// Modification time in nanoseconds since the Unix epoch.
        modified_ns: u64,
        /// File length in bytes.
        len: u64,
    },
    /// Hash of the file content and byte length.
    Content {
        /// XXH3-128 of the file bytes.
        hash: ContentHash,
        /// File length in bytes.
        len: u64,
    },
}

impl FileFingerprint {
    /// Returns the file length recorded in either variant.
    pub fn len(&self) -> u64 {
        match self {
            Self::Metadata { len, .. } | Self::Content { len, .. } => *len,
        }
    }

    /// Returns `true` if the recorded file length is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A file found under a scan root, keyed by its `/`-separated relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileItem {
    relative_path: String,
    fingerprint: FileFingerprint,
}

impl FileItem {
    /// Creates a file item from a relative path and fingerprint.
    pub fn new(relative_path: impl Into<String>, fingerprint: FileFingerprint) -> Self {
        Self {
            relative_path: relative_path.into(),
            fingerprint,
        }
    }

    /// Creates a metadata-fingerprinted item from a walker's
    /// `(relative_path, last_modified, byte_length)` tuple.
    pub fn with_metadata(relative_path: impl Into<String>, modified_ns: u64, len: u64) -> Self {
        Self::new(relative_path, FileFingerprint::Metadata { modified_ns, len })
    }

    /// The path relative to the scan root.
    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    /// The recorded fingerprint.
    pub fn fingerprint(&self) -> &FileFingerprint {
        &self.fingerprint
    }
}

impl Fingerprintable for FileItem {
    const KIND: &'static str = "file";

    fn key(&self) -> &str {
        &self.relative_path
    }

    fn fingerprint_equals(&self, other: &Self) -> bool {
        self.fingerprint == other.fingerprint
    }
}

/// An item that is nothing but its key.
///
/// Two key items with the same key are always equal, so diffs over key items
/// only ever report additions and removals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyItem(String);

impl KeyItem {
    /// Wraps a key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl Fingerprintable for KeyItem {
    const KIND: &'static str = "key";

    fn key(&self) -> &str {
        &self.0
    }

    fn fingerprint_equals(&self, _other: &Self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_metadata_is_unchanged() {
        let a = FileItem::with_metadata("a.txt", 100, 5);
        let b = FileItem::with_metadata("a.txt", 100, 5);
        assert!(a.fingerprint_equals(&b));
    }

    #[test]
    fn touched_file_is_changed() {
        let a = FileItem::with_metadata("a.txt", 100, 5);
        let b = FileItem::with_metadata("a.txt", 200, 5);
        assert!(!a.fingerprint_equals(&b));
    }

    #[test]
    fn resized_file_is_changed() {
        let a = FileItem::with_metadata("a.txt", 100, 5);
        let b = FileItem::with_metadata("a.txt", 100, 6);
        assert!(!a.fingerprint_equals(&b));
    }

    #[test]
    fn content_fingerprint_ignores_mtime() {
        let hash = ContentHash::from_bytes(b"hello");
        let a = FileItem::new("a.txt", FileFingerprint::Content { hash, len: 5 });
        let b = FileItem::new("a.txt", FileFingerprint::Content { hash, len: 5 });
        assert!(a.fingerprint_equals(&b));
    }

    #[test]
    fn switching_fingerprint_mode_counts_as_change() {
        let a = FileItem::with_metadata("a.txt", 100, 5);
        let b = FileItem::new(
            "a.txt",
            FileFingerprint::Content {
                hash: ContentHash::from_bytes(b"hello"),
                len: 5,
            },
        );
        assert!(!a.fingerprint_equals(&b));
    }

    #[test]
    fn fingerprint_len_reads_both_variants() {
        let meta = FileFingerprint::Metadata {
            modified_ns: 1,
            len: 7,
        };
        let content = FileFingerprint::Content {
            hash: ContentHash::from_bytes(b""),
            len: 0,
        };
        assert_eq!(meta.len(), 7);
        assert!(content.is_empty());
    }

    #[test]
    fn key_item_never_changes() {
        let a = KeyItem::new("src/main/java");
        let b = KeyItem::new("src/main/java");
        assert_eq!(a.key(), "src/main/java");
        assert!(a.fingerprint_equals(&b));
    }
}
