//! The compilation-unit capability consumed by merging strategies.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::reference::{FieldRef, MethodRef};

/// An externally produced unit that contributes references to its output group.
///
/// Merging never mutates a unit; it only reads its reference sets.
pub trait CompilationUnit {
    /// The distinct field references the unit contains.
    fn field_references(&self) -> HashSet<FieldRef>;

    /// The distinct method references the unit contains.
    fn method_references(&self) -> HashSet<MethodRef>;
}

impl<U: CompilationUnit + ?Sized> CompilationUnit for Arc<U> {
    fn field_references(&self) -> HashSet<FieldRef> {
        (**self).field_references()
    }

    fn method_references(&self) -> HashSet<MethodRef> {
        (**self).method_references()
    }
}

/// A unit described directly by its reference lists.
///
/// For callers whose reader has already extracted each unit's references.
/// Lists may repeat a reference; it still counts once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRefs {
    /// Name used in logs and errors, e.g. the archive entry path.
    pub name: String,
    /// Field references, possibly repeated.
    #[serde(default)]
    pub fields: Vec<FieldRef>,
    /// Method references, possibly repeated.
    #[serde(default)]
    pub methods: Vec<MethodRef>,
}

impl UnitRefs {
    /// Creates a unit with no references.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Adds a field reference.
    pub fn with_field(mut self, field: FieldRef) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds a method reference.
    pub fn with_method(mut self, method: MethodRef) -> Self {
        self.methods.push(method);
        self
    }
}

impl CompilationUnit for UnitRefs {
    fn field_references(&self) -> HashSet<FieldRef> {
        self.fields.iter().cloned().collect()
    }

    fn method_references(&self) -> HashSet<MethodRef> {
        self.methods.iter().cloned().collect()
    }
}
