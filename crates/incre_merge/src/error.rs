//! Error types for group packing.

/// Errors raised while packing units into groups.
///
/// A rejected `try_add` is ordinary control flow and never becomes an error.
/// Only a unit that cannot fit even an empty group is fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The unit's own references exceed a capacity, so no group can hold it.
    #[error("unit #{index} cannot be packaged: {fields} field refs, {methods} method refs")]
    UnitTooLarge {
        /// Position of the unit in the input sequence.
        index: usize,
        /// Distinct field references in the unit.
        fields: usize,
        /// Distinct method references in the unit.
        methods: usize,
    },

    /// Packing was asked to start while the strategy still held an open group.
    #[error("cannot start packing: the open group already holds {units} units")]
    GroupNotEmpty {
        /// Units already in the open group.
        units: usize,
    },
}
