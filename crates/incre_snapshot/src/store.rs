//! On-disk persistence of snapshots between build invocations.
//!
//! Each build is a fresh process: the previous run's snapshot is loaded from the
//! state directory, diffed against a fresh scan, and the fresh scan replaces it
//! once the build step succeeds. Unreadable state never fails the build; it
//! degrades to an empty previous snapshot so every current key is `Added`.

use std::path::{Path, PathBuf};

use incre_common::IncreResult;
use incre_config::SnapshotSettings;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::diff::DiffResult;
use crate::error::{CorruptStateError, ScanError, StoreError};
use crate::item::Fingerprintable;
use crate::scan::{PathFilter, ScanFilter, ScanOptions, ScannedItem};
use crate::snapshot::Snapshot;
use crate::source_set::SourceSetSnapshot;

/// File extension for persisted state.
const STATE_EXT: &str = "snapshot";

/// File extension for JSON diff reports.
const REPORT_EXT: &str = "diff.json";

/// A value that can be written to and read back from the state directory.
pub trait PersistedState: Sized {
    /// Encodes the value.
    fn to_state_bytes(&self) -> IncreResult<Vec<u8>>;

    /// Decodes a value written by [`PersistedState::to_state_bytes`].
    fn from_state_bytes(bytes: &[u8]) -> Result<Self, CorruptStateError>;
}

impl<T: Fingerprintable + Serialize + DeserializeOwned> PersistedState for Snapshot<T> {
    fn to_state_bytes(&self) -> IncreResult<Vec<u8>> {
        self.serialize()
    }

    fn from_state_bytes(bytes: &[u8]) -> Result<Self, CorruptStateError> {
        Self::deserialize(bytes)
    }
}

impl<T: Fingerprintable + Serialize + DeserializeOwned> PersistedState for SourceSetSnapshot<T> {
    fn to_state_bytes(&self) -> IncreResult<Vec<u8>> {
        self.serialize()
    }

    fn from_state_bytes(bytes: &[u8]) -> Result<Self, CorruptStateError> {
        Self::deserialize(bytes)
    }
}

/// Named persisted snapshots under one state directory.
///
/// A snapshot named `main` lives at `<state_dir>/main.snapshot`.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    state_dir: PathBuf,
}

impl SnapshotStore {
    /// Creates a store rooted at the given state directory.
    pub fn new(state_dir: &Path) -> Self {
        Self {
            state_dir: state_dir.to_path_buf(),
        }
    }

    /// Creates the store configured by `[snapshot] state_dir`, relative to the
    /// project root.
    pub fn from_settings(project_root: &Path, settings: &SnapshotSettings) -> Self {
        Self::new(&project_root.join(&settings.state_dir))
    }

    /// The state directory.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// Returns the file path of a named snapshot.
    pub fn state_path(&self, name: &str) -> PathBuf {
        self.state_dir.join(format!("{name}.{STATE_EXT}"))
    }

    /// Returns the file path of a named diff report.
    pub fn report_path(&self, name: &str) -> PathBuf {
        self.state_dir.join(format!("{name}.{REPORT_EXT}"))
    }

    /// Persists a value under `name`, replacing any previous state.
    ///
    /// Writes to a temporary file first so an interrupted save never leaves a
    /// half-written state file behind.
    pub fn save<S: PersistedState>(&self, name: &str, state: &S) -> Result<(), StoreError> {
        let bytes = state.to_state_bytes()?;
        self.write_atomic(&self.state_path(name), &bytes)
    }

    /// Loads the value saved under `name`.
    ///
    /// Returns `Ok(None)` if nothing was saved yet.
    pub fn load<S: PersistedState>(&self, name: &str) -> Result<Option<S>, StoreError> {
        let path = self.state_path(name);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        Ok(Some(S::from_state_bytes(&bytes)?))
    }

    /// Loads the snapshot saved under `name`, or an empty snapshot of `root`
    /// if there is none or it cannot be read.
    pub fn load_or_empty<T>(&self, name: &str, root: &str) -> Snapshot<T>
    where
        T: Fingerprintable + Serialize + DeserializeOwned,
    {
        self.load_previous(name).unwrap_or_else(|| Snapshot::empty(root))
    }

    /// Loads persisted state, logging and discarding anything unreadable.
    fn load_previous<S: PersistedState>(&self, name: &str) -> Option<S> {
        match self.load(name) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    state = name,
                    path = %self.state_path(name).display(),
                    error = %e,
                    "discarding unreadable incremental state; running a full pass"
                );
                None
            }
        }
    }

    /// Deletes the state saved under `name`. Returns `true` if a file was removed.
    pub fn remove(&self, name: &str) -> Result<bool, StoreError> {
        let path = self.state_path(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Writes a human-readable JSON report of a diff next to the state.
    pub fn save_report<T: Serialize>(
        &self,
        name: &str,
        diff: &DiffResult<T>,
    ) -> Result<PathBuf, StoreError> {
        let json = serde_json::to_string_pretty(diff).map_err(|e| StoreError::Report {
            reason: e.to_string(),
        })?;
        let path = self.report_path(name);
        self.write_atomic(&path, json.as_bytes())?;
        Ok(path)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.state_dir).map_err(|e| StoreError::Io {
            path: self.state_dir.clone(),
            source: e,
        })?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, bytes).map_err(|e| StoreError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp, path).map_err(|e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// The result of one incremental scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome<T> {
    /// The fresh snapshot; becomes the next run's previous state on commit.
    pub current: Snapshot<T>,
    /// Changes since the previous run.
    pub diff: DiffResult<T>,
    /// `false` if there was no usable previous state, so every item is `Added`.
    pub had_previous: bool,
}

impl<T> ScanOutcome<T> {
    /// Returns `true` if this run could not use previous state.
    pub fn is_full_pass(&self) -> bool {
        !self.had_previous
    }
}

/// Scans a root, diffs it against the persisted previous scan, and commits the
/// new scan once the caller has processed the changes.
#[derive(Debug, Clone)]
pub struct IncrementalScanner<F> {
    store: SnapshotStore,
    name: String,
    filter: F,
    options: ScanOptions,
}

impl<F: ScanFilter> IncrementalScanner<F> {
    /// Creates a scanner persisting under `name` in `store`.
    pub fn new(store: SnapshotStore, name: &str, filter: F, options: ScanOptions) -> Self {
        Self {
            store,
            name: name.to_string(),
            filter,
            options,
        }
    }

    /// The backing store.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Scans `root` and diffs it against the previous committed scan.
    ///
    /// Scan failures propagate; unreadable previous state does not.
    pub fn scan<T>(&self, root: &Path) -> Result<ScanOutcome<T>, ScanError>
    where
        T: ScannedItem + Serialize + DeserializeOwned,
    {
        let current: Snapshot<T> = Snapshot::scan_with(root, &self.filter, &self.options)?;
        let previous: Option<Snapshot<T>> = self.store.load_previous(&self.name);
        let had_previous = previous.is_some();
        let previous = previous.unwrap_or_else(|| Snapshot::empty(current.root()));
        if had_previous && previous.root() != current.root() {
            tracing::info!(
                previous = previous.root(),
                current = current.root(),
                "scan root moved since last run; comparing relative keys"
            );
        }

        let diff = current.diff(&previous);
        tracing::debug!(
            state = %self.name,
            changes = diff.len(),
            full_pass = !had_previous,
            "incremental scan finished"
        );
        Ok(ScanOutcome {
            current,
            diff,
            had_previous,
        })
    }

    /// Persists the outcome's snapshot as the previous state for the next run.
    pub fn commit<T>(&self, outcome: &ScanOutcome<T>) -> Result<(), StoreError>
    where
        T: Fingerprintable + Serialize + DeserializeOwned,
    {
        self.store.save(&self.name, &outcome.current)
    }
}

impl IncrementalScanner<PathFilter> {
    /// Builds a scanner from the `[snapshot]` settings of a project.
    pub fn from_settings(project_root: &Path, name: &str, settings: &SnapshotSettings) -> Self {
        Self::new(
            SnapshotStore::from_settings(project_root, settings),
            name,
            PathFilter::from_settings(settings),
            ScanOptions::from_settings(settings),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::Status;
    use crate::item::{FileItem, KeyItem};
    use crate::scan::AcceptAll;

    fn make_store() -> (tempfile::TempDir, SnapshotStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(&dir.path().join("state"));
        (dir, store)
    }

    fn sample() -> Snapshot<FileItem> {
        Snapshot::from_items(
            "/p",
            [
                FileItem::with_metadata("a.txt", 100, 5),
                FileItem::with_metadata("b.txt", 100, 5),
            ],
        )
        .unwrap()
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (_dir, store) = make_store();
        store.save("main", &sample()).unwrap();
        let back: Option<Snapshot<FileItem>> = store.load("main").unwrap();
        assert_eq!(back, Some(sample()));
        assert!(!store.state_path("main").with_extension("tmp").exists());
    }

    #[test]
    fn load_missing_is_none() {
        let (_dir, store) = make_store();
        let back: Option<Snapshot<FileItem>> = store.load("main").unwrap();
        assert!(back.is_none());
    }

    #[test]
    fn load_corrupt_is_error() {
        let (_dir, store) = make_store();
        std::fs::create_dir_all(store.state_dir()).unwrap();
        std::fs::write(store.state_path("main"), b"not a snapshot").unwrap();
        let err = store.load::<Snapshot<FileItem>>("main").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(CorruptStateError::BadMagic)));
    }

    #[test]
    fn load_or_empty_recovers_from_corruption() {
        let (_dir, store) = make_store();
        std::fs::create_dir_all(store.state_dir()).unwrap();
        std::fs::write(store.state_path("main"), b"INCR\xff\xff\xff\xff").unwrap();
        let s: Snapshot<FileItem> = store.load_or_empty("main", "/p");
        assert!(s.is_empty());
        assert_eq!(s.root(), "/p");
    }

    #[test]
    fn load_or_empty_rejects_other_kind() {
        let (_dir, store) = make_store();
        let names = Snapshot::from_strings("/p", ["a"]).unwrap();
        store.save("main", &names).unwrap();
        let s: Snapshot<FileItem> = store.load_or_empty("main", "/p");
        assert!(s.is_empty());
        let same: Snapshot<KeyItem> = store.load_or_empty("main", "/p");
        assert_eq!(same.len(), 1);
    }

    #[test]
    fn remove_deletes_state() {
        let (_dir, store) = make_store();
        store.save("main", &sample()).unwrap();
        assert!(store.remove("main").unwrap());
        assert!(!store.remove("main").unwrap());
        assert!(store.load::<Snapshot<FileItem>>("main").unwrap().is_none());
    }

    #[test]
    fn save_report_writes_json() {
        let (_dir, store) = make_store();
        let diff = sample().diff(&Snapshot::empty("/p"));
        let path = store.save_report("main", &diff).unwrap();
        let json = std::fs::read_to_string(path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn save_creates_nested_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(&dir.path().join("deeply/nested/state"));
        store.save("main", &sample()).unwrap();
        assert!(store.state_path("main").exists());
    }

    #[test]
    fn from_settings_resolves_state_dir() {
        let settings = SnapshotSettings::default();
        let store = SnapshotStore::from_settings(Path::new("/work/app"), &settings);
        assert_eq!(store.state_dir(), Path::new("/work/app/.incre"));
        assert_eq!(
            store.state_path("main"),
            Path::new("/work/app/.incre/main.snapshot")
        );
    }

    #[test]
    fn first_scan_is_full_pass() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.txt"), "aaaaa").unwrap();

        let scanner = IncrementalScanner::new(
            SnapshotStore::new(&dir.path().join("state")),
            "src",
            AcceptAll,
            ScanOptions::default(),
        );
        let outcome = scanner.scan::<FileItem>(&src).unwrap();
        assert!(outcome.is_full_pass());
        assert_eq!(outcome.diff.keys_with_status(Status::Added), vec!["a.txt"]);
    }

    #[test]
    fn uncommitted_scan_is_not_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.txt"), "aaaaa").unwrap();

        let scanner = IncrementalScanner::new(
            SnapshotStore::new(&dir.path().join("state")),
            "src",
            AcceptAll,
            ScanOptions::default(),
        );
        let _ = scanner.scan::<FileItem>(&src).unwrap();
        let again = scanner.scan::<FileItem>(&src).unwrap();
        assert!(again.is_full_pass());

        scanner.commit(&again).unwrap();
        let third = scanner.scan::<FileItem>(&src).unwrap();
        assert!(!third.is_full_pass());
        assert!(third.diff.is_empty());
    }
}
