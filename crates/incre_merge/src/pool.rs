//! Distinct-reference accounting for the open output group.

use std::collections::HashSet;
use std::hash::Hash;

use incre_config::{MergeSettings, DEFAULT_REFERENCE_CAPACITY};

use crate::reference::{FieldRef, MethodRef};

/// Maximum distinct references per output group, per reference kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeCapacity {
    /// Distinct field references allowed.
    pub fields: usize,
    /// Distinct method references allowed.
    pub methods: usize,
}

impl MergeCapacity {
    /// The same ceiling for fields and methods.
    pub fn uniform(limit: usize) -> Self {
        Self {
            fields: limit,
            methods: limit,
        }
    }

    /// Takes the capacities from the `[merge]` settings.
    pub fn from_settings(settings: &MergeSettings) -> Self {
        Self {
            fields: settings.field_capacity,
            methods: settings.method_capacity,
        }
    }
}

impl Default for MergeCapacity {
    /// A 16-bit index space for both kinds.
    fn default() -> Self {
        Self::uniform(DEFAULT_REFERENCE_CAPACITY)
    }
}

/// Outcome of offering one unit's references to a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Both sets fit; the pool now holds their union.
    Admitted {
        /// Field references new to the pool.
        new_fields: usize,
        /// Method references new to the pool.
        new_methods: usize,
    },
    /// Adding the fields would exceed the field capacity. Pool unchanged.
    FieldsExceeded {
        /// Field count the pool would reach.
        would_be: usize,
    },
    /// Adding the methods would exceed the method capacity. Pool unchanged.
    MethodsExceeded {
        /// Method count the pool would reach.
        would_be: usize,
    },
}

impl Admission {
    /// Returns `true` if the references were added.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Self::Admitted { .. })
    }
}

/// The distinct field and method references of the open output group.
#[derive(Debug, Clone, Default)]
pub struct ReferencePool {
    fields: HashSet<FieldRef>,
    methods: HashSet<MethodRef>,
    capacity: MergeCapacity,
}

impl ReferencePool {
    /// Creates an empty pool.
    pub fn new(capacity: MergeCapacity) -> Self {
        Self {
            fields: HashSet::new(),
            methods: HashSet::new(),
            capacity,
        }
    }

    /// The pool's capacities.
    pub fn capacity(&self) -> MergeCapacity {
        self.capacity
    }

    /// Distinct field references held.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Distinct method references held.
    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    /// Returns `true` if the pool holds no references.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.methods.is_empty()
    }

    /// Returns `true` if the field reference is already counted.
    pub fn contains_field(&self, field: &FieldRef) -> bool {
        self.fields.contains(field)
    }

    /// Returns `true` if the method reference is already counted.
    pub fn contains_method(&self, method: &MethodRef) -> bool {
        self.methods.contains(method)
    }

    /// Adds both sets if, after removing references already counted, each
    /// kind stays within its capacity. All or nothing: on rejection neither
    /// set is added.
    pub fn admit(&mut self, fields: HashSet<FieldRef>, methods: HashSet<MethodRef>) -> Admission {
        let new_fields = net_new(&self.fields, &fields);
        let field_total = self.fields.len() + new_fields;
        if field_total > self.capacity.fields {
            return Admission::FieldsExceeded {
                would_be: field_total,
            };
        }

        let new_methods = net_new(&self.methods, &methods);
        let method_total = self.methods.len() + new_methods;
        if method_total > self.capacity.methods {
            return Admission::MethodsExceeded {
                would_be: method_total,
            };
        }

        self.fields.extend(fields);
        self.methods.extend(methods);
        Admission::Admitted {
            new_fields,
            new_methods,
        }
    }

    /// Empties the pool.
    pub fn clear(&mut self) {
        self.fields.clear();
        self.methods.clear();
    }
}

/// References in `candidate` not yet in `pool`.
fn net_new<R: Eq + Hash>(pool: &HashSet<R>, candidate: &HashSet<R>) -> usize {
    candidate.len() - candidate.intersection(pool).count()
}
