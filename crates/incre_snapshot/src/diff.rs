//! Diff records produced by comparing two snapshots.
//!
//! Unchanged keys never appear in a [`DiffResult`]; their absence is the signal.

use std::collections::hash_map;
use std::collections::{BTreeSet, HashMap};

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::item::Fingerprintable;

/// How a key differs between the current and previous snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Present now, absent before.
    Added,
    /// Absent now, present before.
    Removed,
    /// Present on both sides with different fingerprints.
    Changed,
}

/// One key's change between two snapshots.
///
/// Constructed only through [`DiffInfo::added`], [`DiffInfo::removed`] and
/// [`DiffInfo::changed`], so the presence of `current` and `previous` always
/// agrees with `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffInfo<T> {
    status: Status,
    key: String,
    current: Option<T>,
    previous: Option<T>,
}

impl<T: Fingerprintable> DiffInfo<T> {
    /// An item that only exists in the current snapshot.
    pub fn added(current: T) -> Self {
        Self {
            status: Status::Added,
            key: current.key().to_string(),
            current: Some(current),
            previous: None,
        }
    }

    /// An item that only exists in the previous snapshot.
    pub fn removed(previous: T) -> Self {
        Self {
            status: Status::Removed,
            key: previous.key().to_string(),
            current: None,
            previous: Some(previous),
        }
    }

    /// An item whose fingerprint differs between the two snapshots.
    pub fn changed(current: T, previous: T) -> Self {
        debug_assert_eq!(current.key(), previous.key());
        Self {
            status: Status::Changed,
            key: current.key().to_string(),
            current: Some(current),
            previous: Some(previous),
        }
    }
}

impl<T> DiffInfo<T> {
    /// The kind of change.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The changed key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The item as it is now (`Added` and `Changed`).
    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    /// The item as it was before (`Removed` and `Changed`).
    pub fn previous(&self) -> Option<&T> {
        self.previous.as_ref()
    }
}

/// The set of keys whose state differs between two snapshots.
///
/// Holds at most one entry per key. Iteration order is unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffResult<T> {
    entries: HashMap<String, DiffInfo<T>>,
}

impl<T> Default for DiffResult<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> DiffResult<T> {
    /// Creates an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an entry, replacing any previous entry for the same key.
    pub(crate) fn insert(&mut self, info: DiffInfo<T>) {
        self.entries.insert(info.key.clone(), info);
    }

    /// Number of changed keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up the entry for a key. `None` means the key is unchanged or unknown.
    pub fn get(&self, key: &str) -> Option<&DiffInfo<T>> {
        self.entries.get(key)
    }

    /// Iterates over every entry.
    pub fn iter(&self) -> impl Iterator<Item = &DiffInfo<T>> {
        self.entries.values()
    }

    /// Iterates over the entries with the given status.
    pub fn with_status(&self, status: Status) -> impl Iterator<Item = &DiffInfo<T>> {
        self.entries.values().filter(move |d| d.status == status)
    }

    /// Number of entries with the given status.
    pub fn count(&self, status: Status) -> usize {
        self.with_status(status).count()
    }

    /// Sorted keys of the entries with the given status.
    pub fn keys_with_status(&self, status: Status) -> Vec<&str> {
        let mut keys: Vec<&str> = self.with_status(status).map(|d| d.key.as_str()).collect();
        keys.sort_unstable();
        keys
    }

    /// Sorted keys that were added or changed, i.e. whose outputs need rebuilding.
    pub fn added_or_changed_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .entries
            .values()
            .filter(|d| d.status != Status::Removed)
            .map(|d| d.key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Glob patterns of the outputs derived from added or changed sources.
    ///
    /// Every added or changed key ending in `.source_ext` maps to its stem with
    /// `.output_ext`, plus a `$*` variant for nested outputs: `app/Main.java`
    /// yields `app/Main.class` and `app/Main$*.class`. Other keys are ignored.
    pub fn stale_output_patterns(&self, source_ext: &str, output_ext: &str) -> BTreeSet<String> {
        let suffix = format!(".{}", source_ext.trim_start_matches('.'));
        let output_ext = output_ext.trim_start_matches('.');
        self.entries
            .values()
            .filter(|d| d.status != Status::Removed)
            .filter_map(|d| d.key.strip_suffix(suffix.as_str()))
            .flat_map(|stem| [format!("{stem}.{output_ext}"), format!("{stem}$*.{output_ext}")])
            .collect()
    }

    /// Folds another result into this one. On a key collision the entry from
    /// `other` wins.
    pub fn merge(&mut self, other: DiffResult<T>) {
        self.entries.extend(other.entries);
    }
}

impl<T> IntoIterator for DiffResult<T> {
    type Item = DiffInfo<T>;
    type IntoIter = hash_map::IntoValues<String, DiffInfo<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_values()
    }
}

impl<T: Serialize> Serialize for DiffResult<T> {
    /// Serializes as a list ordered by key so reports are stable across runs.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut sorted: Vec<&DiffInfo<T>> = self.entries.values().collect();
        sorted.sort_by(|a, b| a.key.cmp(&b.key));
        let mut seq = serializer.serialize_seq(Some(sorted.len()))?;
        for info in sorted {
            seq.serialize_element(info)?;
        }
        seq.end()
    }
}
