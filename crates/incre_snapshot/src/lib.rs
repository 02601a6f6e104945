//! Snapshots of keyed, fingerprinted items and the diff engine between them.
//!
//! A [`Snapshot`] captures every item under a root at one point in time. Two
//! snapshots of the same kind diff into a [`DiffResult`] naming each key that was
//! added, removed, or changed. Snapshots persist through a framed, versioned
//! byte format so the previous build's state survives into the next process.

#![warn(missing_docs)]

pub mod codec;
pub mod diff;
pub mod error;
pub mod item;
pub mod scan;
pub mod snapshot;
pub mod source_set;
pub mod store;

pub use diff::{DiffInfo, DiffResult, Status};
pub use error::{CorruptStateError, ScanError, StoreError};
pub use item::{FileFingerprint, FileItem, Fingerprintable, KeyItem};
pub use scan::{AcceptAll, EntryInfo, PathFilter, ScanFilter, ScanOptions, ScannedItem};
pub use snapshot::{DirectorySnapshot, Snapshot, StringSnapshot};
pub use source_set::{SourceSetDiff, SourceSetSnapshot};
pub use store::{IncrementalScanner, PersistedState, ScanOutcome, SnapshotStore};
