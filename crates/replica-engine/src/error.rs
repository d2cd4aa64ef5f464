//! Error types for the clone engine
//!
//! Every failure reaching the public API is a [`CloneError`]. Errors are
//! `Clone` so compilation failures can be cached per type and handed to
//! every later caller.

use replica_model::{Capability, ModelError, TypeKey};
use std::any::Any;

/// Clone failure taxonomy
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CloneError {
    /// Abstract container or object type without a concrete mapping
    #[error("no concrete implementation mapped for abstract type '{type_name}'")]
    UnmappedAbstractType {
        /// Abstract type, rendered
        type_name: String,
    },

    /// Container lacks the count or insert capability needed to copy it
    #[error("container '{container}' lacks the {capability} capability required for cloning")]
    MissingContainerCapability {
        /// Container type, rendered
        container: String,
        /// Missing capability
        capability: Capability,
    },

    /// Type has no usable constructor path
    #[error("cannot construct '{type_name}': {reason}")]
    Construction {
        /// Type that could not be built
        type_name: String,
        /// Cause
        reason: String,
    },

    /// Serializer round trip failed
    #[error("serializer fallback failed: {0}")]
    FallbackSerialization(String),

    /// Anything else caught at the façade
    #[error("an error occurred while cloning the object: {0}")]
    Unknown(String),
}

/// Discriminant of [`CloneError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneErrorKind {
    /// [`CloneError::UnmappedAbstractType`]
    UnmappedAbstractType,
    /// [`CloneError::MissingContainerCapability`]
    MissingContainerCapability,
    /// [`CloneError::Construction`]
    Construction,
    /// [`CloneError::FallbackSerialization`]
    FallbackSerialization,
    /// [`CloneError::Unknown`]
    Unknown,
}

impl CloneError {
    /// Create unmapped-abstract-type error
    pub fn unmapped(type_name: impl ToString) -> Self {
        Self::UnmappedAbstractType {
            type_name: type_name.to_string(),
        }
    }

    /// Create missing-capability error
    pub fn missing_capability(container: impl ToString, capability: Capability) -> Self {
        Self::MissingContainerCapability {
            container: container.to_string(),
            capability,
        }
    }

    /// Create construction error
    pub fn construction(type_name: impl ToString, reason: impl Into<String>) -> Self {
        Self::Construction {
            type_name: type_name.to_string(),
            reason: reason.into(),
        }
    }

    /// Create serializer fallback error
    pub fn fallback(message: impl Into<String>) -> Self {
        Self::FallbackSerialization(message.into())
    }

    /// Create unknown error
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    /// Convert a caught panic payload
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with non-string payload".to_string());
        Self::Unknown(message)
    }

    /// Error kind
    #[must_use]
    pub fn kind(&self) -> CloneErrorKind {
        match self {
            Self::UnmappedAbstractType { .. } => CloneErrorKind::UnmappedAbstractType,
            Self::MissingContainerCapability { .. } => CloneErrorKind::MissingContainerCapability,
            Self::Construction { .. } => CloneErrorKind::Construction,
            Self::FallbackSerialization(_) => CloneErrorKind::FallbackSerialization,
            Self::Unknown(_) => CloneErrorKind::Unknown,
        }
    }
}

impl From<ModelError> for CloneError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::MissingCapability {
                container,
                capability,
            } => Self::MissingContainerCapability {
                container,
                capability,
            },
            ModelError::NotConstructible { type_key, reason } => Self::Construction {
                type_name: type_key.to_string(),
                reason,
            },
            ModelError::UnknownType(key) => unregistered(&key),
            other => Self::Unknown(other.to_string()),
        }
    }
}

pub(crate) fn unregistered(key: &TypeKey) -> CloneError {
    CloneError::construction(key, "type is not registered")
}

/// Result type alias for clone operations
pub type CloneResult<T> = Result<T, CloneError>;

/// Configuration failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a configuration
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            CloneError::unmapped("PriorityQueue").kind(),
            CloneErrorKind::UnmappedAbstractType
        );
        assert_eq!(
            CloneError::construction("Socket", "opaque").kind(),
            CloneErrorKind::Construction
        );
        assert_eq!(CloneError::fallback("x").kind(), CloneErrorKind::FallbackSerialization);
    }

    #[test]
    fn unknown_carries_prefix() {
        let err = CloneError::unknown("boom");
        assert_eq!(
            err.to_string(),
            "an error occurred while cloning the object: boom"
        );
    }

    #[test]
    fn model_errors_map_to_taxonomy() {
        let err: CloneError = ModelError::MissingCapability {
            container: "ReadOnlyList".to_string(),
            capability: Capability::Insert,
        }
        .into();
        assert_eq!(err.kind(), CloneErrorKind::MissingContainerCapability);

        let err: CloneError = ModelError::not_constructible("Shape", "abstract").into();
        assert_eq!(err.kind(), CloneErrorKind::Construction);

        let err: CloneError = ModelError::UnknownType(TypeKey::new("Ghost")).into();
        assert_eq!(err.kind(), CloneErrorKind::Construction);
    }

    #[test]
    fn panic_payloads() {
        let boxed: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(
            CloneError::from_panic(boxed.as_ref()),
            CloneError::Unknown("static message".to_string())
        );
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(
            CloneError::from_panic(boxed.as_ref()),
            CloneError::Unknown("owned".to_string())
        );
    }
}
