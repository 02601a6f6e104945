//! Error types for scanning, decoding, and storing snapshots.

use std::path::PathBuf;

use incre_common::InternalError;

/// Errors that abort a scan. No partial snapshot is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The scan root does not exist.
    #[error("scan root {path} does not exist")]
    MissingRoot {
        /// The requested root.
        path: PathBuf,
    },

    /// The scan root exists but is not a directory.
    #[error("scan root {path} is not a directory")]
    NotADirectory {
        /// The requested root.
        path: PathBuf,
    },

    /// The directory walk failed part way through.
    #[error("failed to walk {path}: {source}")]
    Walk {
        /// The entry (or root) where the walk failed.
        path: PathBuf,
        /// The underlying walker error.
        source: walkdir::Error,
    },

    /// An item's fingerprint could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The file being fingerprinted.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file path is not valid UTF-8, so it has no lossless key.
    #[error("path {path:?} is not valid UTF-8")]
    NonUtf8Path {
        /// The offending file.
        path: PathBuf,
    },

    /// A broken invariant while assembling the snapshot.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Persisted snapshot bytes that cannot be trusted.
///
/// Callers recover by treating the previous state as empty, which turns every
/// current key into an `Added` entry for this run.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CorruptStateError {
    /// The input ends before the frame header is complete.
    #[error("persisted state is truncated ({len} bytes)")]
    Truncated {
        /// Number of bytes available.
        len: usize,
    },

    /// The input does not start with the expected magic bytes.
    #[error("persisted state has bad magic bytes")]
    BadMagic,

    /// The frame was written by an incompatible format version.
    #[error("persisted state format version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The version this build reads.
        expected: u32,
        /// The version found in the frame.
        actual: u32,
    },

    /// The frame holds a different kind of state than requested.
    #[error("persisted state kind mismatch: expected '{expected}', got '{actual}'")]
    KindMismatch {
        /// The requested kind tag.
        expected: String,
        /// The kind tag found in the frame.
        actual: String,
    },

    /// The payload does not match the checksum in the header.
    #[error("persisted state checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Checksum stored in the header.
        expected: String,
        /// Checksum of the payload as read.
        actual: String,
    },

    /// The header or payload could not be decoded.
    #[error("failed to decode persisted state: {reason}")]
    Decode {
        /// Description of the decode failure.
        reason: String,
    },

    /// The payload decoded without consuming every byte.
    #[error("persisted state has {count} trailing bytes")]
    TrailingBytes {
        /// Number of unread bytes.
        count: usize,
    },

    /// Two persisted items share one key.
    #[error("persisted state contains duplicate key '{key}'")]
    DuplicateKey {
        /// The repeated key.
        key: String,
    },
}

/// Errors from reading or writing the on-disk snapshot store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An I/O error occurred while reading or writing state files.
    #[error("state I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The stored bytes are corrupt.
    #[error(transparent)]
    Corrupt(#[from] CorruptStateError),

    /// A value could not be encoded.
    #[error(transparent)]
    Encode(#[from] InternalError),

    /// A diff report could not be rendered as JSON.
    #[error("failed to render report: {reason}")]
    Report {
        /// Description of the failure.
        reason: String,
    },
}
