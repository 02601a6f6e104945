//! Packing compilation units into output groups under a reference budget.
//!
//! Output formats with 16-bit member indices cap how many distinct field and
//! method references one output may hold. The [`ReferenceCountStrategy`]
//! accepts units into the open group while the union of their references stays
//! within capacity, counting a reference shared by several units only once.

#![warn(missing_docs)]

pub mod error;
pub mod pack;
pub mod pool;
pub mod reference;
pub mod strategy;
pub mod unit;

pub use error::MergeError;
pub use pack::pack;
pub use pool::{Admission, MergeCapacity, ReferencePool};
pub use reference::{FieldRef, MethodRef};
pub use strategy::{MergingStrategy, ReferenceCountStrategy};
pub use unit::{CompilationUnit, UnitRefs};
