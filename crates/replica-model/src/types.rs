//! Type keys and declared type expressions
//!
//! A [`TypeRef`] is the declared type of a member. It is what the clone-plan
//! compiler inspects; runtime values carry their own concrete shape.

use crate::value::{Entry, Value};
use std::fmt;
use std::sync::Arc;

/// Name of a registered type, used as identity in registries and caches
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeKey(Arc<str>);

impl TypeKey {
    /// Create key from a type name
    #[inline]
    #[must_use]
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Type name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeKey {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl From<&TypeKey> for TypeKey {
    fn from(key: &TypeKey) -> Self {
        key.clone()
    }
}

/// Scalar value types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// `true` / `false`
    Bool,
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
}

/// Operations a container kind supports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Element count is observable
    Count,
    /// Elements can be added one at a time
    Insert,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => f.write_str("count"),
            Self::Insert => f.write_str("insert"),
        }
    }
}

/// Capability set of a container kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Supports [`Capability::Count`]
    pub count: bool,
    /// Supports [`Capability::Insert`]
    pub insert: bool,
}

impl Capabilities {
    /// Check for a capability
    #[inline]
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Count => self.count,
            Capability::Insert => self.insert,
        }
    }
}

/// Container shapes, concrete and abstract
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    /// Growable ordered sequence
    List,
    /// Double-ended queue
    Deque,
    /// Insertion-ordered hash set
    HashSet,
    /// Insertion-ordered hash map
    Dictionary,
    /// Ordered read-only view: countable, not insertable
    ReadOnlyList,
    /// Persistent vector
    PersistentList,
    /// Persistent hash set
    PersistentSet,
    /// Persistent hash map
    PersistentMap,
    /// Anything enumerable
    Enumerable,
    /// Ordered sequence interface
    Sequence,
    /// Read-only ordered sequence interface
    ReadOnlySequence,
    /// Set interface
    Set,
    /// Associative map interface
    Map,
    /// Read-only associative map interface
    ReadOnlyMap,
    /// User-named abstract shape
    Abstract(TypeKey),
}

impl ContainerKind {
    /// Concrete kinds, in a stable order
    pub const CONCRETE: [ContainerKind; 8] = [
        Self::List,
        Self::Deque,
        Self::HashSet,
        Self::Dictionary,
        Self::ReadOnlyList,
        Self::PersistentList,
        Self::PersistentSet,
        Self::PersistentMap,
    ];

    /// Interface or user-named shape without storage of its own
    #[inline]
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        matches!(
            self,
            Self::Enumerable
                | Self::Sequence
                | Self::ReadOnlySequence
                | Self::Set
                | Self::Map
                | Self::ReadOnlyMap
                | Self::Abstract(_)
        )
    }

    /// Member of the persistent (known-immutable) family
    #[inline]
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(
            self,
            Self::PersistentList | Self::PersistentSet | Self::PersistentMap
        )
    }

    /// Number of type arguments, `None` for user-named shapes
    #[must_use]
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::Dictionary | Self::PersistentMap | Self::Map | Self::ReadOnlyMap => Some(2),
            Self::Abstract(_) => None,
            _ => Some(1),
        }
    }

    /// Entries are key/value pairs
    #[inline]
    #[must_use]
    pub fn is_keyed(&self) -> bool {
        self.arity() == Some(2)
    }

    /// Supported operations
    #[must_use]
    pub fn capabilities(&self) -> Capabilities {
        match self {
            Self::List | Self::Deque | Self::HashSet | Self::Dictionary => Capabilities {
                count: true,
                insert: true,
            },
            Self::ReadOnlyList
            | Self::PersistentList
            | Self::PersistentSet
            | Self::PersistentMap => Capabilities {
                count: true,
                insert: false,
            },
            _ => Capabilities::default(),
        }
    }

    /// Stable kind name
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::List => "List",
            Self::Deque => "Deque",
            Self::HashSet => "HashSet",
            Self::Dictionary => "Dictionary",
            Self::ReadOnlyList => "ReadOnlyList",
            Self::PersistentList => "PersistentList",
            Self::PersistentSet => "PersistentSet",
            Self::PersistentMap => "PersistentMap",
            Self::Enumerable => "Enumerable",
            Self::Sequence => "Sequence",
            Self::ReadOnlySequence => "ReadOnlySequence",
            Self::Set => "Set",
            Self::Map => "Map",
            Self::ReadOnlyMap => "ReadOnlyMap",
            Self::Abstract(key) => key.as_str(),
        }
    }

    /// A runtime container of concrete kind `runtime` fits this declaration
    ///
    /// Interfaces accept the concrete kinds with their shape: sets only
    /// `HashSet`, maps only `Dictionary`, sequences only ordered kinds.
    /// User-named shapes accept any non-persistent container.
    #[must_use]
    pub fn accepts(&self, runtime: &ContainerKind) -> bool {
        match self {
            Self::Enumerable => matches!(
                runtime,
                Self::List | Self::Deque | Self::HashSet | Self::ReadOnlyList
            ),
            Self::Sequence => matches!(runtime, Self::List | Self::Deque),
            Self::ReadOnlySequence => {
                matches!(runtime, Self::List | Self::Deque | Self::ReadOnlyList)
            }
            Self::Set => *runtime == Self::HashSet,
            Self::Map | Self::ReadOnlyMap => *runtime == Self::Dictionary,
            Self::Abstract(_) => !runtime.is_persistent() && !runtime.is_abstract(),
            concrete => concrete == runtime,
        }
    }

    /// Parse a concrete kind name
    #[must_use]
    pub fn concrete_from_name(name: &str) -> Option<Self> {
        Self::CONCRETE.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Declared type of a member
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// Scalar
    Primitive(Primitive),
    /// Immutable text
    Text,
    /// Any runtime value; handled by its runtime shape
    Any,
    /// Registered object type
    Named(TypeKey),
    /// Fixed-length array
    Array(Box<TypeRef>),
    /// Container with its type arguments
    Container(ContainerKind, Vec<TypeRef>),
}

impl TypeRef {
    /// `Bool`
    #[must_use]
    pub fn bool() -> Self {
        Self::Primitive(Primitive::Bool)
    }

    /// `Int`
    #[must_use]
    pub fn int() -> Self {
        Self::Primitive(Primitive::Int)
    }

    /// `Float`
    #[must_use]
    pub fn float() -> Self {
        Self::Primitive(Primitive::Float)
    }

    /// `Text`
    #[must_use]
    pub fn text() -> Self {
        Self::Text
    }

    /// Registered type by name
    #[must_use]
    pub fn named(key: impl Into<TypeKey>) -> Self {
        Self::Named(key.into())
    }

    /// `T[]`
    #[must_use]
    pub fn array(element: TypeRef) -> Self {
        Self::Array(Box::new(element))
    }

    /// `List<T>`
    #[must_use]
    pub fn list(element: TypeRef) -> Self {
        Self::Container(ContainerKind::List, vec![element])
    }

    /// Single-argument container of the given kind
    #[must_use]
    pub fn container(kind: ContainerKind, element: TypeRef) -> Self {
        Self::Container(kind, vec![element])
    }

    /// Keyed container of the given kind
    #[must_use]
    pub fn keyed(kind: ContainerKind, key: TypeRef, value: TypeRef) -> Self {
        Self::Container(kind, vec![key, value])
    }

    /// `Dictionary<K, V>`
    #[must_use]
    pub fn dictionary(key: TypeRef, value: TypeRef) -> Self {
        Self::keyed(ContainerKind::Dictionary, key, value)
    }

    /// Scalar or text
    #[inline]
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Primitive(_) | Self::Text)
    }

    /// Default value a fresh instance holds for a member of this type
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            Self::Primitive(Primitive::Bool) => Value::Bool(false),
            Self::Primitive(Primitive::Int) => Value::Int(0),
            Self::Primitive(Primitive::Float) => Value::Float(0.0),
            _ => Value::Null,
        }
    }

    /// Whether `value` may be stored in a member of this type
    ///
    /// Object members accept any object; the runtime type decides how it is
    /// cloned. Persistent values are checked element by element, containers
    /// and arrays by their shape only.
    #[must_use]
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Primitive(Primitive::Bool), Value::Bool(_))
            | (Self::Primitive(Primitive::Int), Value::Int(_))
            | (Self::Primitive(Primitive::Float), Value::Float(_)) => true,
            (Self::Primitive(_), _) => false,
            (_, Value::Null) => true,
            (Self::Text, Value::Text(_))
            | (Self::Named(_), Value::Object(_))
            | (Self::Array(_), Value::Array(_)) => true,
            (Self::Container(kind, args), Value::Persistent(p)) => {
                *kind == p.kind() && p.entries().iter().all(|entry| entry_fits(args, entry))
            }
            (Self::Container(kind, _), Value::Container(c)) => kind.accepts(&c.kind()),
            _ => false,
        }
    }
}

fn entry_fits(args: &[TypeRef], entry: &Entry) -> bool {
    let fits = |arg: Option<&TypeRef>, value: &Value| arg.map_or(true, |ty| ty.admits(value));
    match entry {
        Entry::Element(item) => fits(args.first(), item),
        Entry::Pair(key, item) => fits(args.first(), key) && fits(args.get(1), item),
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(Primitive::Bool) => f.write_str("Bool"),
            Self::Primitive(Primitive::Int) => f.write_str("Int"),
            Self::Primitive(Primitive::Float) => f.write_str("Float"),
            Self::Text => f.write_str("Text"),
            Self::Any => f.write_str("Any"),
            Self::Named(key) => write!(f, "{key}"),
            Self::Array(element) => write!(f, "{element}[]"),
            Self::Container(kind, args) => {
                write!(f, "{kind}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Persistent;

    #[test]
    fn type_ref_display() {
        let ty = TypeRef::dictionary(TypeRef::text(), TypeRef::list(TypeRef::named("Point")));
        assert_eq!(ty.to_string(), "Dictionary<Text, List<Point>>");
        assert_eq!(TypeRef::array(TypeRef::int()).to_string(), "Int[]");
    }

    #[test]
    fn container_capabilities() {
        assert!(ContainerKind::List.capabilities().has(Capability::Insert));
        assert!(ContainerKind::ReadOnlyList.capabilities().has(Capability::Count));
        assert!(!ContainerKind::ReadOnlyList.capabilities().has(Capability::Insert));
        assert_eq!(ContainerKind::Sequence.capabilities(), Capabilities::default());
    }

    #[test]
    fn container_shape() {
        assert!(ContainerKind::Map.is_abstract());
        assert!(ContainerKind::Map.is_keyed());
        assert!(ContainerKind::PersistentSet.is_persistent());
        assert_eq!(ContainerKind::Abstract(TypeKey::new("Queue")).arity(), None);
        assert_eq!(
            ContainerKind::concrete_from_name("Deque"),
            Some(ContainerKind::Deque)
        );
        assert_eq!(ContainerKind::concrete_from_name("Sequence"), None);
    }

    #[test]
    fn defaults_follow_declared_type() {
        assert_eq!(TypeRef::int().default_value(), Value::Int(0));
        assert_eq!(TypeRef::bool().default_value(), Value::Bool(false));
        assert!(TypeRef::text().default_value().is_null());
        assert!(TypeRef::named("Node").default_value().is_null());
    }

    #[test]
    fn admits_checks_shape() {
        assert!(TypeRef::int().admits(&Value::Int(3)));
        assert!(!TypeRef::int().admits(&Value::Null));
        assert!(TypeRef::text().admits(&Value::Null));
        assert!(!TypeRef::text().admits(&Value::Int(1)));
        assert!(TypeRef::Any.admits(&Value::Float(1.5)));
    }

    #[test]
    fn abstract_shapes_accept_matching_kinds() {
        assert!(ContainerKind::Set.accepts(&ContainerKind::HashSet));
        assert!(!ContainerKind::Set.accepts(&ContainerKind::List));
        assert!(ContainerKind::Sequence.accepts(&ContainerKind::Deque));
        assert!(!ContainerKind::Sequence.accepts(&ContainerKind::ReadOnlyList));
        assert!(ContainerKind::ReadOnlySequence.accepts(&ContainerKind::ReadOnlyList));
        assert!(!ContainerKind::Map.accepts(&ContainerKind::List));
        assert!(ContainerKind::Abstract(TypeKey::new("Queue")).accepts(&ContainerKind::Deque));
        assert!(!ContainerKind::List.accepts(&ContainerKind::Deque));
    }

    #[test]
    fn persistent_elements_are_checked() {
        let texts = TypeRef::container(ContainerKind::PersistentList, TypeRef::text());
        let ok = Value::Persistent(Persistent::List([Value::text("a")].into_iter().collect()));
        let bad = Value::Persistent(Persistent::List([Value::Int(1)].into_iter().collect()));
        assert!(texts.admits(&ok));
        assert!(!texts.admits(&bad));

        let map = TypeRef::keyed(ContainerKind::PersistentMap, TypeRef::text(), TypeRef::int());
        let pairs = Value::Persistent(Persistent::Map(
            [(Value::text("k"), Value::text("v"))].into_iter().collect(),
        ));
        assert!(!map.admits(&pairs));
    }
}
