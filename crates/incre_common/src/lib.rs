//! Shared foundational types used across the incremental build crates.
//!
//! This crate provides content hashing for change detection and integrity checks,
//! plus the internal error type used to report bugs rather than user errors.

#![warn(missing_docs)]

pub mod hash;
pub mod result;

pub use hash::ContentHash;
pub use result::{IncreResult, InternalError};
