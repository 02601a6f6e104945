//! Greedy, order-sensitive packing of units into the open output group.

use incre_config::MergeSettings;

use crate::pool::{Admission, MergeCapacity, ReferencePool};
use crate::unit::CompilationUnit;

/// A stateful packer deciding, unit by unit, whether a unit joins the open group.
///
/// Implementations are single-writer accumulators. Callers offer units in a
/// stable order; the grouping depends on it.
pub trait MergingStrategy<U> {
    /// Offers a unit to the open group.
    ///
    /// Returns `false` with no state change if the unit does not fit. That is
    /// expected control flow: seal the group, call
    /// [`start_new_group`](Self::start_new_group) and offer it again.
    fn try_add(&mut self, unit: &U) -> bool;

    /// Discards the open group's references and units.
    fn start_new_group(&mut self);

    /// Units accepted into the open group, in acceptance order.
    fn current_batch(&self) -> &[U];

    /// Takes the open group's units and starts a new group.
    fn seal_group(&mut self) -> Vec<U>
    where
        U: Clone,
    {
        let batch = self.current_batch().to_vec();
        self.start_new_group();
        batch
    }
}

/// Accepts a unit while the group's distinct field and method counts stay
/// within capacity. References shared with already accepted units are free.
#[derive(Debug, Clone)]
pub struct ReferenceCountStrategy<U> {
    pool: ReferencePool,
    units: Vec<U>,
}

impl<U> ReferenceCountStrategy<U> {
    /// Creates a strategy with an empty open group.
    pub fn new(capacity: MergeCapacity) -> Self {
        Self {
            pool: ReferencePool::new(capacity),
            units: Vec::new(),
        }
    }

    /// Creates a strategy sized by the `[merge]` settings.
    pub fn from_settings(settings: &MergeSettings) -> Self {
        Self::new(MergeCapacity::from_settings(settings))
    }

    /// The per-group capacities.
    pub fn capacity(&self) -> MergeCapacity {
        self.pool.capacity()
    }

    /// The open group's reference pool.
    pub fn pool(&self) -> &ReferencePool {
        &self.pool
    }
}

impl<U> Default for ReferenceCountStrategy<U> {
    fn default() -> Self {
        Self::new(MergeCapacity::default())
    }
}

impl<U: CompilationUnit + Clone> MergingStrategy<U> for ReferenceCountStrategy<U> {
    fn try_add(&mut self, unit: &U) -> bool {
        match self
            .pool
            .admit(unit.field_references(), unit.method_references())
        {
            Admission::Admitted {
                new_fields,
                new_methods,
            } => {
                self.units.push(unit.clone());
                tracing::debug!(
                    new_fields,
                    new_methods,
                    fields = self.pool.field_count(),
                    methods = self.pool.method_count(),
                    units = self.units.len(),
                    "unit accepted"
                );
                true
            }
            rejected => {
                tracing::debug!(?rejected, units = self.units.len(), "unit rejected");
                false
            }
        }
    }

    fn start_new_group(&mut self) {
        self.pool.clear();
        self.units.clear();
    }

    fn current_batch(&self) -> &[U] {
        &self.units
    }
}
