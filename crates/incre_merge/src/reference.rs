//! Symbolic field and method references.
//!
//! References are plain values: two references are the same reference exactly
//! when every field is equal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A reference to a field: declaring type, name, and field type descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldRef {
    /// Type descriptor of the declaring class, e.g. `Lcom/example/Main;`.
    pub declaring_type: String,
    /// Field name.
    pub name: String,
    /// Type descriptor of the field, e.g. `I`.
    pub type_descriptor: String,
}

impl FieldRef {
    /// Creates a field reference.
    pub fn new(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        type_descriptor: impl Into<String>,
    ) -> Self {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            type_descriptor: type_descriptor.into(),
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.declaring_type, self.name, self.type_descriptor)
    }
}

/// A reference to a method: declaring type, name, parameter types, return type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodRef {
    /// Type descriptor of the declaring class.
    pub declaring_type: String,
    /// Method name.
    pub name: String,
    /// Parameter type descriptors, in order.
    pub parameter_types: Vec<String>,
    /// Return type descriptor, e.g. `V`.
    pub return_type: String,
}

impl MethodRef {
    /// Creates a method reference.
    pub fn new<P, S>(
        declaring_type: impl Into<String>,
        name: impl Into<String>,
        parameter_types: P,
        return_type: impl Into<String>,
    ) -> Self
    where
        P: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            declaring_type: declaring_type.into(),
            name: name.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
            return_type: return_type.into(),
        }
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}->{}({}){}",
            self.declaring_type,
            self.name,
            self.parameter_types.concat(),
            self.return_type
        )
    }
}
