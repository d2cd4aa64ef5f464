//! Type Classifier
//!
//! Decides whether a type can be aliased instead of copied. Composite types
//! are classified once, when their descriptor is built; this module combines
//! that flag with the structure of declared type expressions.

use replica_model::{Entry, TypeRef, TypeRegistry, Value};

/// Immutability checks against a registry
#[derive(Debug, Clone, Copy)]
pub struct TypeClassifier<'a> {
    registry: &'a TypeRegistry,
}

impl<'a> TypeClassifier<'a> {
    /// Classifier over `registry`
    #[inline]
    #[must_use]
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self { registry }
    }

    /// Values of this declared type never need copying
    ///
    /// - scalars and text are immutable
    /// - named types use the descriptor flag; unregistered names are not
    /// - persistent containers are immutable when all type arguments are
    /// - arrays, mutable containers and `Any` are not
    #[must_use]
    pub fn is_immutable(&self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Primitive(_) | TypeRef::Text => true,
            TypeRef::Named(key) => self
                .registry
                .get(key)
                .is_some_and(|descriptor| descriptor.is_immutable()),
            TypeRef::Container(kind, args) if kind.is_persistent() => {
                args.iter().all(|arg| self.is_immutable(arg))
            }
            TypeRef::Any | TypeRef::Array(_) | TypeRef::Container(..) => false,
        }
    }

    /// This runtime value never needs copying
    ///
    /// Scalars, text and objects of immutable types qualify. Persistent
    /// values qualify when every entry does, checked element by element.
    #[must_use]
    pub fn is_immutable_value(value: &Value) -> bool {
        let mut pending = vec![value.clone()];
        while let Some(value) = pending.pop() {
            match value {
                Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_) => {}
                Value::Object(object) if object.descriptor().is_immutable() => {}
                Value::Persistent(persistent) => {
                    for entry in persistent.entries() {
                        match entry {
                            Entry::Element(item) => pending.push(item),
                            Entry::Pair(key, item) => pending.extend([key, item]),
                        }
                    }
                }
                Value::Object(_) | Value::Array(_) | Value::Container(_) => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_model::{ContainerKind, Persistent, TypeDescriptor};

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry
            .register(
                TypeDescriptor::composite("Money")
                    .read_only("amount", TypeRef::int())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
            .register(
                TypeDescriptor::composite("Point")
                    .field("x", TypeRef::int())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    #[test]
    fn scalars_and_text_are_immutable() {
        let registry = registry();
        let classifier = TypeClassifier::new(&registry);
        assert!(classifier.is_immutable(&TypeRef::int()));
        assert!(classifier.is_immutable(&TypeRef::text()));
        assert!(!classifier.is_immutable(&TypeRef::Any));
    }

    #[test]
    fn named_types_use_descriptor() {
        let registry = registry();
        let classifier = TypeClassifier::new(&registry);
        assert!(classifier.is_immutable(&TypeRef::named("Money")));
        assert!(!classifier.is_immutable(&TypeRef::named("Point")));
        assert!(!classifier.is_immutable(&TypeRef::named("Unregistered")));
    }

    #[test]
    fn persistent_containers_depend_on_arguments() {
        let registry = registry();
        let classifier = TypeClassifier::new(&registry);
        let money = TypeRef::container(ContainerKind::PersistentList, TypeRef::named("Money"));
        let points = TypeRef::container(ContainerKind::PersistentList, TypeRef::named("Point"));
        assert!(classifier.is_immutable(&money));
        assert!(!classifier.is_immutable(&points));
        assert!(!classifier.is_immutable(&TypeRef::list(TypeRef::int())));
        assert!(!classifier.is_immutable(&TypeRef::array(TypeRef::int())));
    }

    #[test]
    fn values() {
        let registry = registry();
        assert!(TypeClassifier::is_immutable_value(&Value::text("x")));
        let money = registry.instantiate("Money").unwrap();
        let point = registry.instantiate("Point").unwrap();
        assert!(TypeClassifier::is_immutable_value(&money.clone().into()));
        assert!(!TypeClassifier::is_immutable_value(&point.clone().into()));

        let wallets = Persistent::List([Value::from(&money)].into_iter().collect());
        let mixed = Persistent::Map(
            [(Value::text("m"), Value::from(&money)), (Value::text("p"), Value::from(&point))]
                .into_iter()
                .collect(),
        );
        assert!(TypeClassifier::is_immutable_value(&wallets.into()));
        assert!(!TypeClassifier::is_immutable_value(&mixed.into()));
    }
}
