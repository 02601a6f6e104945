//! Building snapshots by walking a directory tree.
//!
//! The walk is shared by every item kind: an item type only decides how one
//! accepted file becomes an item (see [`ScannedItem`]).

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use incre_common::{ContentHash, InternalError};
use incre_config::{FingerprintMode, SnapshotSettings};
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::item::{FileFingerprint, FileItem, Fingerprintable, KeyItem};
use crate::snapshot::Snapshot;

/// Decides which files become snapshot items.
///
/// Receives the path relative to the scan root. Directories are always walked;
/// only files are filtered.
pub trait ScanFilter: Sync {
    /// Returns `true` to include the file.
    fn accept(&self, relative: &Path) -> bool;
}

impl<F> ScanFilter for F
where
    F: Fn(&Path) -> bool + Sync,
{
    fn accept(&self, relative: &Path) -> bool {
        self(relative)
    }
}

/// Accepts every file.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl ScanFilter for AcceptAll {
    fn accept(&self, _relative: &Path) -> bool {
        true
    }
}

/// Filters by file extension and optionally skips hidden entries.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    extensions: Vec<String>,
    skip_hidden: bool,
}

impl PathFilter {
    /// Creates a filter that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts accepted files to these extensions (leading dots are ignored).
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim_start_matches('.').to_string())
            .collect();
        self
    }

    /// Skips files whose path has any component starting with a dot.
    pub fn skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Builds the filter described by the `[snapshot]` settings.
    pub fn from_settings(settings: &SnapshotSettings) -> Self {
        Self::new()
            .with_extensions(&settings.extensions)
            .skip_hidden(settings.skip_hidden)
    }
}

impl ScanFilter for PathFilter {
    fn accept(&self, relative: &Path) -> bool {
        if self.skip_hidden
            && relative
                .components()
                .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
        {
            return false;
        }
        if self.extensions.is_empty() {
            return true;
        }
        relative
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }
}

/// Options that change how items are produced, independent of the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// How file fingerprints are computed.
    pub fingerprint: FingerprintMode,
    /// Walk each top-level entry on its own worker.
    pub parallel: bool,
}

impl ScanOptions {
    /// Takes the options from the `[snapshot]` settings.
    pub fn from_settings(settings: &SnapshotSettings) -> Self {
        Self {
            fingerprint: settings.fingerprint,
            parallel: settings.parallel,
        }
    }
}

/// One accepted file, as handed to [`ScannedItem::from_entry`].
#[derive(Debug)]
pub struct EntryInfo<'a> {
    /// `/`-separated path relative to the scan root.
    pub key: String,
    /// Full path of the file.
    pub path: &'a Path,
    /// The file's metadata.
    pub metadata: &'a Metadata,
}

/// An item kind that can be produced by walking a directory.
pub trait ScannedItem: Fingerprintable + Send {
    /// Builds the item for one accepted file.
    fn from_entry(entry: &EntryInfo<'_>, options: &ScanOptions) -> std::io::Result<Self>;
}

impl ScannedItem for FileItem {
    fn from_entry(entry: &EntryInfo<'_>, options: &ScanOptions) -> std::io::Result<Self> {
        let len = entry.metadata.len();
        let fingerprint = match options.fingerprint {
            FingerprintMode::Metadata => FileFingerprint::Metadata {
                modified_ns: modified_ns(entry.metadata)?,
                len,
            },
            FingerprintMode::Content => {
                let bytes = std::fs::read(entry.path)?;
                FileFingerprint::Content {
                    hash: ContentHash::from_bytes(&bytes),
                    len: bytes.len() as u64,
                }
            }
        };
        Ok(FileItem::new(entry.key.clone(), fingerprint))
    }
}

impl ScannedItem for KeyItem {
    fn from_entry(entry: &EntryInfo<'_>, _options: &ScanOptions) -> std::io::Result<Self> {
        Ok(KeyItem::new(entry.key.clone()))
    }
}

/// Modification time in nanoseconds since the epoch; pre-epoch times clamp to 0.
fn modified_ns(metadata: &Metadata) -> std::io::Result<u64> {
    let modified = metadata.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0))
}

impl<T: ScannedItem> Snapshot<T> {
    /// Scans every accepted file under `root` with default options.
    pub fn scan<F>(root: &Path, filter: &F) -> Result<Self, ScanError>
    where
        F: ScanFilter + ?Sized,
    {
        Self::scan_with(root, filter, &ScanOptions::default())
    }

    /// Scans `root` on parallel workers, one per top-level entry.
    pub fn scan_parallel<F>(root: &Path, filter: &F) -> Result<Self, ScanError>
    where
        F: ScanFilter + ?Sized,
    {
        let options = ScanOptions {
            parallel: true,
            ..ScanOptions::default()
        };
        Self::scan_with(root, filter, &options)
    }

    /// Scans every accepted file under `root`.
    ///
    /// Symlinks to files are included and fingerprinted through their target.
    /// Symlinked directories and dangling symlinks are skipped.
    ///
    /// Fails if the root is missing or not a directory, if any entry cannot be
    /// walked or fingerprinted, or if an accepted file's path is not UTF-8.
    /// Nothing is returned on failure.
    pub fn scan_with<F>(root: &Path, filter: &F, options: &ScanOptions) -> Result<Self, ScanError>
    where
        F: ScanFilter + ?Sized,
    {
        check_root(root)?;
        let identity = root.to_string_lossy().into_owned();

        let items = if options.parallel {
            let top_level = list_dir(root)?;
            let chunks: Vec<Vec<T>> = top_level
                .par_iter()
                .map(|entry| {
                    let mut out = Vec::new();
                    walk_into(root, entry, filter, options, &mut out)?;
                    Ok::<_, ScanError>(out)
                })
                .collect::<Result<_, ScanError>>()?;
            chunks.into_iter().flatten().collect()
        } else {
            let mut out = Vec::new();
            walk_into(root, root, filter, options, &mut out)?;
            out
        };

        let snapshot = Snapshot::from_items(identity, items)?;
        tracing::debug!(
            root = %root.display(),
            items = snapshot.len(),
            parallel = options.parallel,
            "scanned snapshot"
        );
        Ok(snapshot)
    }
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    match std::fs::metadata(root) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScanError::MissingRoot {
            path: root.to_path_buf(),
        }),
        Err(e) => Err(ScanError::Io {
            path: root.to_path_buf(),
            source: e,
        }),
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
    let io_err = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        paths.push(entry.map_err(io_err)?.path());
    }
    Ok(paths)
}

/// Walks `start` (the root or one of its entries) and appends accepted items.
fn walk_into<T, F>(
    root: &Path,
    start: &Path,
    filter: &F,
    options: &ScanOptions,
    out: &mut Vec<T>,
) -> Result<(), ScanError>
where
    T: ScannedItem,
    F: ScanFilter + ?Sized,
{
    // Top-level symlinks are only followed when walking the root itself, so a
    // parallel walk sees the same entries as a sequential one.
    let walker = WalkDir::new(start)
        .follow_links(false)
        .follow_root_links(start == root);
    for entry in walker {
        let entry = entry.map_err(|e| walk_error(start, e))?;
        let file_type = entry.file_type();
        // Symlinks to files are items fingerprinted through their target;
        // symlinked directories are never descended.
        let target_metadata = if file_type.is_file() {
            None
        } else if file_type.is_symlink() {
            match std::fs::metadata(entry.path()) {
                Ok(meta) if meta.is_file() => Some(meta),
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!(
                        path = %entry.path().display(),
                        error = %e,
                        "skipping dangling symlink"
                    );
                    continue;
                }
            }
        } else {
            continue;
        };

        let relative = entry.path().strip_prefix(root).map_err(|_| {
            InternalError::new(format!(
                "{} is not under scan root {}",
                entry.path().display(),
                root.display()
            ))
        })?;
        if !filter.accept(relative) {
            continue;
        }
        let key = relative_key(relative).ok_or_else(|| ScanError::NonUtf8Path {
            path: entry.path().to_path_buf(),
        })?;
        let metadata = match target_metadata {
            Some(meta) => meta,
            None => entry.metadata().map_err(|e| walk_error(entry.path(), e))?,
        };
        let info = EntryInfo {
            key,
            path: entry.path(),
            metadata: &metadata,
        };
        let item = T::from_entry(&info, options).map_err(|source| ScanError::Io {
            path: entry.path().to_path_buf(),
            source,
        })?;
        out.push(item);
    }
    Ok(())
}

fn walk_error(fallback: &Path, source: walkdir::Error) -> ScanError {
    let path = source
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| fallback.to_path_buf());
    ScanError::Walk { path, source }
}

/// Joins path components with `/` so keys are identical on every platform.
///
/// Returns `None` if any component is not valid UTF-8; a lossy key could
/// collide with another file's key.
fn relative_key(relative: &Path) -> Option<String> {
    let parts = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}
