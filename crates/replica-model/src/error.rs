//! Error types for the object model
//!
//! Covers registration, construction and member assignment failures.

use crate::types::{Capability, TypeKey};

/// Errors raised by the object model
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// A descriptor with the same key is already registered
    #[error("type already registered: '{0}'")]
    DuplicateType(TypeKey),

    /// No descriptor registered under this key
    #[error("unknown type: '{0}'")]
    UnknownType(TypeKey),

    /// Member name not declared by the type
    #[error("type '{type_key}' has no member named '{member}'")]
    UnknownMember {
        /// Owning type
        type_key: TypeKey,
        /// Requested member name
        member: String,
    },

    /// Assigned value does not fit the declared member type
    #[error("member '{member}' expects {expected}, got {found}")]
    TypeMismatch {
        /// Member name
        member: String,
        /// Declared type, rendered
        expected: String,
        /// Runtime value kind
        found: &'static str,
    },

    /// Index outside of an array or member list
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds {
        /// Requested index
        index: usize,
        /// Length of the indexed sequence
        len: usize,
    },

    /// Type has no constructor path
    #[error("type '{type_key}' is not constructible: {reason}")]
    NotConstructible {
        /// Type that could not be constructed
        type_key: TypeKey,
        /// Why construction is impossible
        reason: String,
    },

    /// Container kind lacks a capability required by the operation
    #[error("container '{container}' lacks the {capability} capability")]
    MissingCapability {
        /// Container kind, rendered
        container: String,
        /// Missing capability
        capability: Capability,
    },

    /// Entry shape does not match the container (element vs key/value pair)
    #[error("container '{container}' expects {expected} entries")]
    EntryShape {
        /// Container kind, rendered
        container: String,
        /// Expected shape
        expected: &'static str,
    },

    /// Duplicate member name within one descriptor
    #[error("type '{type_key}' declares member '{member}' twice")]
    DuplicateMember {
        /// Owning type
        type_key: TypeKey,
        /// Repeated member name
        member: String,
    },

    /// Value cannot be converted to the requested Rust type
    #[error("expected {expected} value, got {found}")]
    Conversion {
        /// Requested kind
        expected: &'static str,
        /// Runtime value kind
        found: &'static str,
    },
}

impl ModelError {
    /// Create not-constructible error
    pub fn not_constructible(type_key: impl Into<TypeKey>, reason: impl Into<String>) -> Self {
        Self::NotConstructible {
            type_key: type_key.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for model operations
pub type ModelResult<T> = Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_member_display() {
        let err = ModelError::UnknownMember {
            type_key: TypeKey::new("Point"),
            member: "z".to_string(),
        };
        assert_eq!(err.to_string(), "type 'Point' has no member named 'z'");
    }

    #[test]
    fn missing_capability_display() {
        let err = ModelError::MissingCapability {
            container: "ReadOnlyList<Int>".to_string(),
            capability: Capability::Insert,
        };
        assert!(err.to_string().contains("insert"));
    }
}
