//! Drives a merging strategy over a whole unit sequence.

use crate::error::MergeError;
use crate::strategy::MergingStrategy;
use crate::unit::CompilationUnit;

/// Packs `units` into groups, in input order, using `strategy`.
///
/// A rejected unit seals the open group and is retried against a fresh one.
/// The strategy is left with an empty group on success and on error.
///
/// # Errors
///
/// Returns [`MergeError::GroupNotEmpty`] without touching the strategy if its
/// open group already holds units, and [`MergeError::UnitTooLarge`] if a unit
/// is rejected by an empty group.
pub fn pack<S, U, I>(strategy: &mut S, units: I) -> Result<Vec<Vec<U>>, MergeError>
where
    S: MergingStrategy<U>,
    U: CompilationUnit + Clone,
    I: IntoIterator<Item = U>,
{
    let leftover = strategy.current_batch().len();
    if leftover > 0 {
        return Err(MergeError::GroupNotEmpty { units: leftover });
    }

    let mut groups = Vec::new();

    for (index, unit) in units.into_iter().enumerate() {
        if strategy.try_add(&unit) {
            continue;
        }
        if !strategy.current_batch().is_empty() {
            seal(strategy, &mut groups);
            if strategy.try_add(&unit) {
                continue;
            }
        }
        strategy.start_new_group();
        return Err(MergeError::UnitTooLarge {
            index,
            fields: unit.field_references().len(),
            methods: unit.method_references().len(),
        });
    }

    if !strategy.current_batch().is_empty() {
        seal(strategy, &mut groups);
    }
    Ok(groups)
}

fn seal<S, U>(strategy: &mut S, groups: &mut Vec<Vec<U>>)
where
    S: MergingStrategy<U>,
    U: Clone,
{
    let group = strategy.seal_group();
    tracing::info!(group = groups.len(), units = group.len(), "output group sealed");
    groups.push(group);
}
