//! Type registry
//!
//! Concurrent map from [`TypeKey`] to its [`TypeDescriptor`]. Descriptors are
//! immutable once registered.

use crate::descriptor::{TypeDescriptor, TypeKind};
use crate::error::{ModelError, ModelResult};
use crate::handle::ObjectRef;
use crate::types::TypeKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::sync::Arc;

static GLOBAL: Lazy<Arc<TypeRegistry>> = Lazy::new(|| Arc::new(TypeRegistry::new()));

/// Registered types
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: DashMap<TypeKey, Arc<TypeDescriptor>>,
}

impl TypeRegistry {
    /// Create empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    #[must_use]
    pub fn global() -> Arc<TypeRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Register a descriptor
    ///
    /// # Errors
    /// Returns [`ModelError::DuplicateType`] if the key is taken
    pub fn register(&self, descriptor: TypeDescriptor) -> ModelResult<Arc<TypeDescriptor>> {
        match self.types.entry(descriptor.key().clone()) {
            Entry::Occupied(entry) => Err(ModelError::DuplicateType(entry.key().clone())),
            Entry::Vacant(entry) => {
                let descriptor = Arc::new(descriptor);
                entry.insert(Arc::clone(&descriptor));
                Ok(descriptor)
            }
        }
    }

    /// Look up a descriptor
    #[must_use]
    pub fn get(&self, key: &TypeKey) -> Option<Arc<TypeDescriptor>> {
        self.types.get(key).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a descriptor that must exist
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownType`] if nothing is registered under `key`
    pub fn require(&self, key: &TypeKey) -> ModelResult<Arc<TypeDescriptor>> {
        self.get(key)
            .ok_or_else(|| ModelError::UnknownType(key.clone()))
    }

    /// Is `key` registered
    #[must_use]
    pub fn contains(&self, key: &TypeKey) -> bool {
        self.types.contains_key(key)
    }

    /// Number of registered types
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// No types registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Allocate an instance with every member at its default
    ///
    /// # Errors
    /// - [`ModelError::UnknownType`] if `key` is not registered
    /// - [`ModelError::NotConstructible`] for abstract and opaque types
    pub fn instantiate(&self, key: impl Into<TypeKey>) -> ModelResult<ObjectRef> {
        let key = key.into();
        let descriptor = self.require(&key)?;
        match descriptor.kind() {
            TypeKind::Composite => Ok(ObjectRef::new(descriptor)),
            TypeKind::Abstract => Err(ModelError::not_constructible(
                key,
                "abstract types have no constructor",
            )),
            TypeKind::Opaque => Err(ModelError::not_constructible(
                key,
                "opaque native resource",
            )),
        }
    }
}
