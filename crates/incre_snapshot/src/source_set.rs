//! Snapshots spanning several source directories of one project.
//!
//! Each source directory gets its own snapshot, keyed relative to that
//! directory. A directory that appears or disappears between runs reports all
//! of its files as added or removed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use incre_common::IncreResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::diff::{DiffResult, Status};
use crate::error::{CorruptStateError, ScanError};
use crate::item::{Fingerprintable, KeyItem};
use crate::scan::{ScanFilter, ScanOptions, ScannedItem};
use crate::snapshot::{Snapshot, StringSnapshot};

/// Per-directory snapshots of a project's source directories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "T: Fingerprintable + Serialize",
    deserialize = "T: Fingerprintable + Deserialize<'de>"
))]
pub struct SourceSetSnapshot<T> {
    project_root: String,
    directories: StringSnapshot,
    sets: BTreeMap<String, Snapshot<T>>,
}

/// Changes across all source directories.
#[derive(Debug, Clone)]
pub struct SourceSetDiff<T> {
    /// Source directories that were added or removed.
    pub directories: DiffResult<KeyItem>,
    /// File changes per source directory; directories without changes are absent.
    pub files: BTreeMap<String, DiffResult<T>>,
}

impl<T> SourceSetDiff<T> {
    /// Returns `true` if no directory and no file changed.
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }

    /// Total number of changed files across all directories.
    pub fn file_change_count(&self) -> usize {
        self.files.values().map(DiffResult::len).sum()
    }

    /// Output patterns made stale by added or changed sources in any directory.
    ///
    /// See [`DiffResult::stale_output_patterns`].
    pub fn stale_output_patterns(&self, source_ext: &str, output_ext: &str) -> BTreeSet<String> {
        self.files
            .values()
            .flat_map(|diff| diff.stale_output_patterns(source_ext, output_ext))
            .collect()
    }

    /// The file changes of one source directory.
    pub fn files_in(&self, directory: &str) -> Option<&DiffResult<T>> {
        self.files.get(directory)
    }
}

impl<T: ScannedItem> SourceSetSnapshot<T> {
    /// Scans each source directory of a project.
    ///
    /// Directories are keyed by their path as given (relative paths resolve
    /// against `project_root`). A source directory that does not exist yet is
    /// recorded as empty; any other scan failure aborts the whole scan.
    pub fn scan<P, F>(
        project_root: &Path,
        source_dirs: &[P],
        filter: &F,
        options: &ScanOptions,
    ) -> Result<Self, ScanError>
    where
        P: AsRef<Path>,
        F: ScanFilter + ?Sized,
    {
        let mut keys = Vec::with_capacity(source_dirs.len());
        let mut sets = BTreeMap::new();
        for dir in source_dirs {
            let dir = dir.as_ref();
            let key = dir.to_string_lossy().into_owned();
            let absolute = project_root.join(dir);
            let snapshot = match Snapshot::scan_with(&absolute, filter, options) {
                Err(ScanError::MissingRoot { .. }) => {
                    tracing::debug!(dir = %absolute.display(), "source directory does not exist");
                    Snapshot::empty(absolute.to_string_lossy())
                }
                other => other?,
            };
            keys.push(key.clone());
            sets.insert(key, snapshot);
        }

        Ok(Self {
            project_root: project_root.to_string_lossy().into_owned(),
            directories: StringSnapshot::from_strings(project_root.to_string_lossy(), keys)?,
            sets,
        })
    }
}

impl<T: Fingerprintable> SourceSetSnapshot<T> {
    /// The project root the source directories were resolved against.
    pub fn project_root(&self) -> &str {
        &self.project_root
    }

    /// The snapshot of the source directory names.
    pub fn directories(&self) -> &StringSnapshot {
        &self.directories
    }

    /// The snapshot of one source directory.
    pub fn set(&self, directory: &str) -> Option<&Snapshot<T>> {
        self.sets.get(directory)
    }

    /// Compares `self` (now) against `previous` (before), directory by directory.
    pub fn diff(&self, previous: &SourceSetSnapshot<T>) -> SourceSetDiff<T> {
        let directories = self.directories.diff(&previous.directories);
        let mut files = BTreeMap::new();

        for (key, current) in &self.sets {
            let result = match previous.sets.get(key) {
                Some(old) => current.diff(old),
                None => current.diff(&Snapshot::empty(current.root())),
            };
            if !result.is_empty() {
                files.insert(key.clone(), result);
            }
        }
        for key in directories.keys_with_status(Status::Removed) {
            if let Some(old) = previous.sets.get(key) {
                let result = Snapshot::empty(old.root()).diff(old);
                if !result.is_empty() {
                    files.insert(key.to_string(), result);
                }
            }
        }

        SourceSetDiff { directories, files }
    }

    fn kind() -> String {
        format!("source-set:{}", T::KIND)
    }
}

impl<T: Fingerprintable + Serialize> SourceSetSnapshot<T> {
    /// Encodes the source-set snapshot into the persisted state format.
    pub fn serialize(&self) -> IncreResult<Vec<u8>> {
        codec::encode(&Self::kind(), self)
    }
}

impl<T: Fingerprintable + DeserializeOwned> SourceSetSnapshot<T> {
    /// Decodes a source-set snapshot written by [`SourceSetSnapshot::serialize`].
    pub fn deserialize(bytes: &[u8]) -> Result<Self, CorruptStateError> {
        codec::decode(&Self::kind(), bytes)
    }
}
