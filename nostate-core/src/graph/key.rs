//! Dependency keys and trigger operations.

use std::fmt;

use crate::value::Value;

/// What an effect depends on within one target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DepKey {
    /// A named property of a plain object.
    Field(String),
    /// An element of an array.
    Index(usize),
    /// A key of a map, or a member of a set (always a raw value).
    Entry(Value),
    /// Structural sentinel of arrays: the element set changed.
    Length,
    /// Structural sentinel of objects and collections: the key set changed.
    Iterate,
}

impl DepKey {
    pub fn is_structural(&self) -> bool {
        matches!(self, DepKey::Length | DepKey::Iterate)
    }
}

impl fmt::Display for DepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepKey::Field(name) => f.write_str(name),
            DepKey::Index(index) => write!(f, "{index}"),
            DepKey::Entry(value) => write!(f, "{value}"),
            DepKey::Length => f.write_str("length"),
            DepKey::Iterate => f.write_str("<iterate>"),
        }
    }
}

/// The kind of change a write made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerOp {
    /// An existing key now holds a different value.
    Set,
    /// A key that did not exist was created.
    Add,
    /// An existing key was removed.
    Delete,
    /// Every key was removed.
    Clear,
}

impl TriggerOp {
    /// Whether the key/member set itself changed.
    pub fn is_structural(&self) -> bool {
        matches!(self, TriggerOp::Add | TriggerOp::Delete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_keys() {
        assert!(DepKey::Length.is_structural());
        assert!(DepKey::Iterate.is_structural());
        assert!(!DepKey::Field("length".into()).is_structural());
        assert_ne!(DepKey::Length, DepKey::Iterate);
    }

    #[test]
    fn structural_ops() {
        assert!(TriggerOp::Add.is_structural());
        assert!(TriggerOp::Delete.is_structural());
        assert!(!TriggerOp::Set.is_structural());
        assert!(!TriggerOp::Clear.is_structural());
    }
}
