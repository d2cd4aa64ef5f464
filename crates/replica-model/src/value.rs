//! Runtime values
//!
//! Objects, arrays and containers are shared handles with reference
//! identity. Scalars, text and persistent containers are plain values.
//! Equality and hashing follow the same split: handles compare by identity,
//! everything else by content.

use crate::error::{ModelError, ModelResult};
use crate::handle::{ArrayRef, ContainerRef, ObjectRef};
use crate::types::ContainerKind;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Absent reference
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Immutable shared text
    Text(Arc<str>),
    /// Object handle
    Object(ObjectRef),
    /// Array handle
    Array(ArrayRef),
    /// Mutable container handle
    Container(ContainerRef),
    /// Persistent container value
    Persistent(Persistent),
}

impl Value {
    /// Text value
    #[must_use]
    pub fn text(s: impl AsRef<str>) -> Self {
        Self::Text(Arc::from(s.as_ref()))
    }

    /// Is `Null`
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short kind name for diagnostics
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Float(_) => "Float",
            Self::Text(_) => "Text",
            Self::Object(_) => "Object",
            Self::Array(_) => "Array",
            Self::Container(_) => "Container",
            Self::Persistent(_) => "Persistent",
        }
    }

    /// Identity of a handle value, `None` for plain values
    #[must_use]
    pub fn identity(&self) -> Option<usize> {
        match self {
            Self::Object(o) => Some(o.identity()),
            Self::Array(a) => Some(a.identity()),
            Self::Container(c) => Some(c.identity()),
            _ => None,
        }
    }

    /// Identity equality
    ///
    /// Handles must be the same allocation; text must share its buffer;
    /// persistent containers must share their root; scalars compare by value.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => Arc::ptr_eq(a, b),
            (Self::Persistent(a), Self::Persistent(b)) => a.ptr_eq(b),
            _ => match (self.identity(), other.identity()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Object handle, if this is an object
    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Array handle, if this is an array
    #[must_use]
    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Container handle, if this is a container
    #[must_use]
    pub fn as_container(&self) -> Option<&ContainerRef> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }

    /// Integer payload
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Text payload
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Persistent(a), Self::Persistent(b)) => a == b,
            _ => self.same(other),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
            Self::Object(_) | Self::Array(_) | Self::Container(_) => self.identity().hash(state),
            Self::Persistent(p) => p.hash(state),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Self::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(Arc::from(s))
    }
}

impl From<Arc<str>> for Value {
    fn from(s: Arc<str>) -> Self {
        Self::Text(s)
    }
}

impl From<&ArrayRef> for Value {
    fn from(a: &ArrayRef) -> Self {
        Self::Array(a.clone())
    }
}

impl From<&ContainerRef> for Value {
    fn from(c: &ContainerRef) -> Self {
        Self::Container(c.clone())
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Self::Object(o)
    }
}

impl From<&ObjectRef> for Value {
    fn from(o: &ObjectRef) -> Self {
        Self::Object(o.clone())
    }
}

impl From<ArrayRef> for Value {
    fn from(a: ArrayRef) -> Self {
        Self::Array(a)
    }
}

impl From<ContainerRef> for Value {
    fn from(c: ContainerRef) -> Self {
        Self::Container(c)
    }
}

impl From<Persistent> for Value {
    fn from(p: Persistent) -> Self {
        Self::Persistent(p)
    }
}

/// One enumerated container entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Element of a single-argument container
    Element(Value),
    /// Key/value pair of a keyed container
    Pair(Value, Value),
}

/// Persistent container value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistent {
    /// Persistent vector
    List(im::Vector<Value>),
    /// Persistent hash set
    Set(im::HashSet<Value>),
    /// Persistent hash map
    Map(im::HashMap<Value, Value>),
}

impl Persistent {
    /// Container kind of this value
    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::List(_) => ContainerKind::PersistentList,
            Self::Set(_) => ContainerKind::PersistentSet,
            Self::Map(_) => ContainerKind::PersistentMap,
        }
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::List(v) => v.len(),
            Self::Set(s) => s.len(),
            Self::Map(m) => m.len(),
        }
    }

    /// Has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Entries in enumeration order
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        match self {
            Self::List(v) => v.iter().cloned().map(Entry::Element).collect(),
            Self::Set(s) => s.iter().cloned().map(Entry::Element).collect(),
            Self::Map(m) => m
                .iter()
                .map(|(k, v)| Entry::Pair(k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Convert a staged entry list into the persistent form, once
    ///
    /// # Errors
    /// Returns error if `kind` is not persistent or an entry has the wrong shape
    pub fn from_staging(kind: &ContainerKind, staging: Vec<Entry>) -> ModelResult<Self> {
        let shape_error = |expected| ModelError::EntryShape {
            container: kind.to_string(),
            expected,
        };
        match kind {
            ContainerKind::PersistentList => staging
                .into_iter()
                .map(|entry| match entry {
                    Entry::Element(v) => Ok(v),
                    Entry::Pair(..) => Err(shape_error("element")),
                })
                .collect::<ModelResult<im::Vector<_>>>()
                .map(Self::List),
            ContainerKind::PersistentSet => staging
                .into_iter()
                .map(|entry| match entry {
                    Entry::Element(v) => Ok(v),
                    Entry::Pair(..) => Err(shape_error("element")),
                })
                .collect::<ModelResult<im::HashSet<_>>>()
                .map(Self::Set),
            ContainerKind::PersistentMap => staging
                .into_iter()
                .map(|entry| match entry {
                    Entry::Pair(k, v) => Ok((k, v)),
                    Entry::Element(_) => Err(shape_error("key/value")),
                })
                .collect::<ModelResult<im::HashMap<_, _>>>()
                .map(Self::Map),
            other => Err(ModelError::not_constructible(
                other.name(),
                "not a persistent container kind",
            )),
        }
    }

    /// Shares its root with `other`
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => a.ptr_eq(b),
            (Self::Set(a), Self::Set(b)) => a.ptr_eq(b),
            (Self::Map(a), Self::Map(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Hash for Persistent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash sets and maps have no canonical order; kind and length keep
        // the hash consistent with equality.
        std::mem::discriminant(self).hash(state);
        self.len().hash(state);
    }
}

/// Typed view of a [`Value`]
///
/// Implemented for the handle types and scalars so that callers can clone
/// a graph without wrapping and unwrapping values by hand.
pub trait GraphValue: Sized + Send + 'static {
    /// Wrap as a value
    fn to_value(&self) -> Value;

    /// Unwrap from a value
    ///
    /// # Errors
    /// Returns [`ModelError::Conversion`] if the value has another kind
    fn from_value(value: Value) -> ModelResult<Self>;
}

impl GraphValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> ModelResult<Self> {
        Ok(value)
    }
}

macro_rules! graph_value {
    ($ty:ty, $variant:ident, $name:literal) => {
        impl GraphValue for $ty {
            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            fn from_value(value: Value) -> ModelResult<Self> {
                match value {
                    Value::$variant(inner) => Ok(inner),
                    other => Err(ModelError::Conversion {
                        expected: $name,
                        found: other.kind_name(),
                    }),
                }
            }
        }
    };
}

graph_value!(bool, Bool, "Bool");
graph_value!(i64, Int, "Int");
graph_value!(f64, Float, "Float");
graph_value!(Arc<str>, Text, "Text");
graph_value!(ObjectRef, Object, "Object");
graph_value!(ArrayRef, Array, "Array");
graph_value!(ContainerRef, Container, "Container");
graph_value!(Persistent, Persistent, "Persistent");
