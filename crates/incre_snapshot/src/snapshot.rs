//! The snapshot type and the diff engine.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use incre_common::{IncreResult, InternalError};
use serde::de::{self, DeserializeOwned};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec;
use crate::diff::{DiffInfo, DiffResult};
use crate::error::CorruptStateError;
use crate::item::{FileItem, Fingerprintable, KeyItem};

/// A snapshot of a directory tree's files.
pub type DirectorySnapshot = Snapshot<FileItem>;

/// A snapshot of a set of strings.
pub type StringSnapshot = Snapshot<KeyItem>;

/// Every item under one root at one point in time, keyed by item key.
///
/// Immutable once built. Keys are unique; building a snapshot with a repeated
/// key is a programming error reported as [`InternalError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    root: String,
    items: HashMap<String, T>,
}

impl<T: Fingerprintable> Snapshot<T> {
    /// Creates a snapshot with no items.
    pub fn empty(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            items: HashMap::new(),
        }
    }

    /// Builds a snapshot from already-collected items.
    pub fn from_items(
        root: impl Into<String>,
        items: impl IntoIterator<Item = T>,
    ) -> IncreResult<Self> {
        let mut snapshot = Self::empty(root);
        for item in items {
            snapshot.insert(item)?;
        }
        Ok(snapshot)
    }

    pub(crate) fn insert(&mut self, item: T) -> IncreResult<()> {
        match self.items.entry(item.key().to_string()) {
            Entry::Occupied(e) => Err(InternalError::new(format!(
                "duplicate key '{}' in snapshot of {}",
                e.key(),
                self.root
            ))),
            Entry::Vacant(e) => {
                e.insert(item);
                Ok(())
            }
        }
    }

    /// The identity of the scanned root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the snapshot holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks up an item by key.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.items.get(key)
    }

    /// Returns `true` if an item with this key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// Iterates over the items in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Iterates over the keys in unspecified order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items.keys().map(String::as_str)
    }

    /// Compares `self` (now) against `previous` (before).
    ///
    /// Keys only in `self` are `Added`, keys only in `previous` are `Removed`,
    /// and keys in both whose fingerprints differ are `Changed`. Keys in both
    /// with equal fingerprints are left out. Pure; safe to call repeatedly.
    pub fn diff(&self, previous: &Snapshot<T>) -> DiffResult<T> {
        let mut result = DiffResult::new();

        for (key, current) in &self.items {
            match previous.items.get(key) {
                None => result.insert(DiffInfo::added(current.clone())),
                Some(old) if !current.fingerprint_equals(old) => {
                    result.insert(DiffInfo::changed(current.clone(), old.clone()))
                }
                Some(_) => {}
            }
        }
        for (key, old) in &previous.items {
            if !self.items.contains_key(key) {
                result.insert(DiffInfo::removed(old.clone()));
            }
        }

        tracing::debug!(
            root = %self.root,
            current = self.items.len(),
            previous = previous.items.len(),
            changes = result.len(),
            "diffed snapshots"
        );
        result
    }
}

impl<T: Fingerprintable + Serialize> Snapshot<T> {
    /// Encodes the snapshot into the persisted state format.
    pub fn serialize(&self) -> IncreResult<Vec<u8>> {
        codec::encode(T::KIND, self)
    }
}

impl<T: Fingerprintable + DeserializeOwned> Snapshot<T> {
    /// Decodes a snapshot written by [`Snapshot::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CorruptStateError> {
        let repr: SnapshotRepr<T> = codec::decode(T::KIND, bytes)?;
        repr.into_snapshot()
    }
}

impl Snapshot<FileItem> {
    /// Resolves an item's relative path against the snapshot root.
    pub fn absolute_path(&self, item: &FileItem) -> PathBuf {
        Path::new(&self.root).join(item.relative_path())
    }
}

impl Snapshot<KeyItem> {
    /// Builds a snapshot whose items are the given strings.
    pub fn from_strings<I, S>(root: impl Into<String>, strings: I) -> IncreResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_items(root, strings.into_iter().map(KeyItem::new))
    }
}

/// Wire shape of a snapshot: the root and the items, without the key index.
#[derive(Deserialize)]
struct SnapshotRepr<T> {
    root: String,
    items: Vec<T>,
}

impl<T: Fingerprintable> SnapshotRepr<T> {
    fn into_snapshot(self) -> Result<Snapshot<T>, CorruptStateError> {
        let mut snapshot = Snapshot::empty(self.root);
        for item in self.items {
            if snapshot.contains_key(item.key()) {
                return Err(CorruptStateError::DuplicateKey {
                    key: item.key().to_string(),
                });
            }
            snapshot.items.insert(item.key().to_string(), item);
        }
        Ok(snapshot)
    }
}

impl<T: Fingerprintable + Serialize> Serialize for Snapshot<T> {
    /// Writes items sorted by key so equal snapshots encode to equal bytes.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut items: Vec<&T> = self.items.values().collect();
        items.sort_by(|a, b| a.key().cmp(b.key()));
        let mut state = serializer.serialize_struct("Snapshot", 2)?;
        state.serialize_field("root", &self.root)?;
        state.serialize_field("items", &items)?;
        state.end()
    }
}

impl<'de, T: Fingerprintable + Deserialize<'de>> Deserialize<'de> for Snapshot<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        SnapshotRepr::<T>::deserialize(deserializer)?
            .into_snapshot()
            .map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Status;
    use crate::item::FileFingerprint;
    use incre_common::ContentHash;

    fn files(root: &str, items: &[(&str, u64, u64)]) -> DirectorySnapshot {
        Snapshot::from_items(
            root,
            items
                .iter()
                .map(|(key, t, len)| FileItem::with_metadata(*key, *t, *len)),
        )
        .unwrap()
    }

    #[test]
    fn added_and_removed_keys() {
        let current = files("/p", &[("a.txt", 100, 5), ("b.txt", 100, 5)]);
        let previous = files("/p", &[("a.txt", 100, 5), ("c.txt", 50, 2)]);

        let diff = current.diff(&previous);
        assert_eq!(diff.len(), 2);
        assert_eq!(diff.get("b.txt").map(DiffInfo::status), Some(Status::Added));
        assert_eq!(diff.get("c.txt").map(DiffInfo::status), Some(Status::Removed));
        assert!(diff.get("a.txt").is_none());
    }

    #[test]
    fn changed_key() {
        let current = files("/p", &[("a.txt", 200, 6)]);
        let previous = files("/p", &[("a.txt", 100, 5)]);

        let diff = Snapshot::diff(&current, &previous);
        assert_eq!(diff.len(), 1);
        let info = diff.get("a.txt").unwrap();
        assert_eq!(info.status(), Status::Changed);
        assert_eq!(info.current().map(|i| i.fingerprint().len()), Some(6));
        assert_eq!(info.previous().map(|i| i.fingerprint().len()), Some(5));
    }

    #[test]
    fn diff_with_itself_is_empty() {
        let s = files("/p", &[("a", 1, 1), ("b", 2, 2), ("c/d", 3, 3)]);
        assert!(s.diff(&s).is_empty());
    }

    #[test]
    fn diff_against_empty_marks_everything_added() {
        let s = files("/p", &[("a", 1, 1), ("b", 2, 2)]);
        let diff = s.diff(&Snapshot::empty("/p"));
        assert_eq!(diff.count(Status::Added), 2);

        let reverse = Snapshot::empty("/p").diff(&s);
        assert_eq!(reverse.count(Status::Removed), 2);
    }

    #[test]
    fn every_key_classified_once() {
        let current = files("/p", &[("same", 1, 1), ("touched", 2, 1), ("new", 1, 1)]);
        let previous = files("/p", &[("same", 1, 1), ("touched", 1, 1), ("gone", 1, 1)]);
        let diff = current.diff(&previous);

        let union: std::collections::BTreeSet<&str> =
            current.keys().chain(previous.keys()).collect();
        for key in union {
            let in_both = current.contains_key(key) && previous.contains_key(key);
            match diff.get(key) {
                None => {
                    assert!(in_both);
                    let now = current.get(key).unwrap();
                    assert!(now.fingerprint_equals(previous.get(key).unwrap()));
                }
                Some(info) => match info.status() {
                    Status::Added => assert!(!previous.contains_key(key)),
                    Status::Removed => assert!(!current.contains_key(key)),
                    Status::Changed => assert!(in_both),
                },
            }
        }
        assert_eq!(diff.len(), 3);
    }

    #[test]
    fn duplicate_key_is_internal_error() {
        let err = Snapshot::from_items(
            "/p",
            [
                FileItem::with_metadata("a", 1, 1),
                FileItem::with_metadata("a", 2, 2),
            ],
        )
        .unwrap_err();
        assert!(err.message.contains("duplicate key 'a'"));
    }

    #[test]
    fn serialize_roundtrip_preserves_items() {
        let hash = ContentHash::from_bytes(b"body");
        let s = Snapshot::from_items(
            "/p",
            [
                FileItem::with_metadata("a.txt", 100, 5),
                FileItem::new("b.txt", FileFingerprint::Content { hash, len: 4 }),
            ],
        )
        .unwrap();
        let bytes = s.serialize().unwrap();
        let back = DirectorySnapshot::deserialize(&bytes).unwrap();
        assert_eq!(back, s);
        assert_eq!(back.root(), "/p");
    }

    #[test]
    fn equal_snapshots_encode_identically() {
        let a = files("/p", &[("x", 1, 1), ("y", 2, 2), ("z", 3, 3)]);
        let b = files("/p", &[("z", 3, 3), ("x", 1, 1), ("y", 2, 2)]);
        assert_eq!(a.serialize().unwrap(), b.serialize().unwrap());
    }

    #[test]
    fn string_snapshot_cannot_load_file_state() {
        let bytes = files("/p", &[("a", 1, 1)]).serialize().unwrap();
        let err = StringSnapshot::deserialize(&bytes).unwrap_err();
        assert!(matches!(err, CorruptStateError::KindMismatch { .. }));
    }

    #[test]
    fn duplicate_persisted_key_is_corrupt() {
        #[derive(Serialize)]
        struct Raw {
            root: String,
            items: Vec<KeyItem>,
        }
        let raw = Raw {
            root: "r".to_string(),
            items: vec![KeyItem::new("dup"), KeyItem::new("dup")],
        };
        let bytes = codec::encode(KeyItem::KIND, &raw).unwrap();
        let err = StringSnapshot::deserialize(&bytes).unwrap_err();
        assert_eq!(
            err,
            CorruptStateError::DuplicateKey {
                key: "dup".to_string()
            }
        );
    }

    #[test]
    fn string_snapshot_diff() {
        let now = StringSnapshot::from_strings("sets", ["src/main", "src/extra"]).unwrap();
        let old = StringSnapshot::from_strings("sets", ["src/main", "src/legacy"]).unwrap();
        let diff = now.diff(&old);
        assert_eq!(diff.keys_with_status(Status::Added), vec!["src/extra"]);
        assert_eq!(diff.keys_with_status(Status::Removed), vec!["src/legacy"]);
        assert_eq!(diff.count(Status::Changed), 0);
    }

    #[test]
    fn absolute_path_joins_root() {
        let s = files("/work/app", &[("src/A.java", 1, 1)]);
        let item = s.get("src/A.java").unwrap();
        assert_eq!(s.absolute_path(item), PathBuf::from("/work/app/src/A.java"));
    }
}
