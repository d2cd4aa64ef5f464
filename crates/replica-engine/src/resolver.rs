//! Concrete-Type Resolver
//!
//! Static table from abstract container shapes (and abstract object types)
//! to one constructible implementation. Extended by registration before the
//! cloner is built; read-only afterwards.

use crate::error::{CloneError, CloneResult};
use replica_model::{ContainerKind, TypeKey};
use std::collections::HashMap;

/// Abstract-to-concrete mapping table
#[derive(Debug, Clone)]
pub struct ConcreteResolver {
    containers: HashMap<ContainerKind, ContainerKind>,
    types: HashMap<TypeKey, TypeKey>,
}

impl ConcreteResolver {
    /// Create resolver with the built-in container table
    ///
    /// | abstract | concrete |
    /// |---|---|
    /// | `Enumerable`, `Sequence`, `ReadOnlySequence` | `List` |
    /// | `Set` | `HashSet` |
    /// | `Map`, `ReadOnlyMap` | `Dictionary` |
    #[must_use]
    pub fn new() -> Self {
        let containers = [
            (ContainerKind::Enumerable, ContainerKind::List),
            (ContainerKind::Sequence, ContainerKind::List),
            (ContainerKind::ReadOnlySequence, ContainerKind::List),
            (ContainerKind::Set, ContainerKind::HashSet),
            (ContainerKind::Map, ContainerKind::Dictionary),
            (ContainerKind::ReadOnlyMap, ContainerKind::Dictionary),
        ]
        .into_iter()
        .collect();

        Self {
            containers,
            types: HashMap::new(),
        }
    }

    /// Map an abstract container shape to a concrete kind
    pub fn map_container(&mut self, shape: ContainerKind, concrete: ContainerKind) {
        self.containers.insert(shape, concrete);
    }

    /// Map an abstract object type to a concrete registered type
    pub fn map_type(&mut self, abstract_type: impl Into<TypeKey>, concrete: impl Into<TypeKey>) {
        self.types.insert(abstract_type.into(), concrete.into());
    }

    /// Constructible kind for `kind`; concrete kinds resolve to themselves
    ///
    /// # Errors
    /// Returns [`CloneError::UnmappedAbstractType`] if no mapping exists
    pub fn resolve_container(&self, kind: &ContainerKind) -> CloneResult<ContainerKind> {
        if !kind.is_abstract() {
            return Ok(kind.clone());
        }
        self.containers
            .get(kind)
            .cloned()
            .ok_or_else(|| CloneError::unmapped(kind))
    }

    /// Concrete type registered for an abstract object type
    ///
    /// # Errors
    /// Returns [`CloneError::UnmappedAbstractType`] if no mapping exists
    pub fn resolve_type(&self, key: &TypeKey) -> CloneResult<TypeKey> {
        self.types
            .get(key)
            .cloned()
            .ok_or_else(|| CloneError::unmapped(key))
    }
}

impl Default for ConcreteResolver {
    fn default() -> Self {
        Self::new()
    }
}
