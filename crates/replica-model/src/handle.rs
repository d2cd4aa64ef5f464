//! Shared handles: objects, arrays and mutable containers
//!
//! Every handle is an `Arc` around a lock, so its address is its identity.
//! `Debug` output never walks into contents; graphs may be cyclic.

use crate::descriptor::TypeDescriptor;
use crate::error::{ModelError, ModelResult};
use crate::types::{Capability, ContainerKind, TypeKey};
use crate::value::{Entry, Value};
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

struct ObjectCell {
    descriptor: Arc<TypeDescriptor>,
    fields: RwLock<Vec<Value>>,
}

impl Drop for ObjectCell {
    fn drop(&mut self) {
        release(std::mem::take(self.fields.get_mut()));
    }
}

/// Tear down uniquely owned handles without recursion
fn release(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::Object(ObjectRef(cell)) => {
                if let Ok(mut cell) = Arc::try_unwrap(cell) {
                    pending.append(cell.fields.get_mut());
                }
            }
            Value::Array(ArrayRef(items)) => {
                if let Ok(items) = Arc::try_unwrap(items) {
                    pending.extend(items.into_inner());
                }
            }
            Value::Container(ContainerRef(cell)) => {
                if let Ok(mut cell) = Arc::try_unwrap(cell) {
                    pending.extend(cell.take_values());
                }
            }
            _ => {}
        }
    }
}

/// Handle to an instance of a registered composite type
#[derive(Clone)]
pub struct ObjectRef(Arc<ObjectCell>);

impl ObjectRef {
    /// Allocate an instance with every member at its default
    ///
    /// Constructibility is the registry's concern; see
    /// [`TypeRegistry::instantiate`](crate::TypeRegistry::instantiate).
    #[must_use]
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        let fields = descriptor.default_fields();
        Self(Arc::new(ObjectCell {
            descriptor,
            fields: RwLock::new(fields),
        }))
    }

    /// Address-based identity
    #[inline]
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Same allocation
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Runtime type
    #[inline]
    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        self.0.descriptor.key()
    }

    /// Descriptor of the runtime type
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.0.descriptor
    }

    /// Read a member
    ///
    /// # Errors
    /// Returns [`ModelError::UnknownMember`] if the type has no such member
    pub fn get(&self, member: &str) -> ModelResult<Value> {
        let index = self.index_of(member)?;
        Ok(self.0.fields.read()[index].clone())
    }

    /// Assign a member, checking it against the declared type
    ///
    /// # Errors
    /// - [`ModelError::UnknownMember`] if the type has no such member
    /// - [`ModelError::TypeMismatch`] if the value does not fit
    pub fn set(&self, member: &str, value: impl Into<Value>) -> ModelResult<()> {
        let index = self.index_of(member)?;
        let value = value.into();
        let declared = &self.0.descriptor.members()[index];
        if !declared.ty().admits(&value) {
            return Err(ModelError::TypeMismatch {
                member: member.to_string(),
                expected: declared.ty().to_string(),
                found: value.kind_name(),
            });
        }
        self.0.fields.write()[index] = value;
        Ok(())
    }

    /// Snapshot of all member values, in declaration order
    #[must_use]
    pub fn fields(&self) -> Vec<Value> {
        self.0.fields.read().clone()
    }

    /// Assign members by position without declared-type checks
    ///
    /// # Errors
    /// Returns [`ModelError::IndexOutOfBounds`] for a bad position; earlier
    /// assignments in the batch are kept
    pub fn write_fields(&self, updates: impl IntoIterator<Item = (usize, Value)>) -> ModelResult<()> {
        let mut fields = self.0.fields.write();
        let len = fields.len();
        for (index, value) in updates {
            let slot = fields
                .get_mut(index)
                .ok_or(ModelError::IndexOutOfBounds { index, len })?;
            *slot = value;
        }
        Ok(())
    }

    fn index_of(&self, member: &str) -> ModelResult<usize> {
        self.0
            .descriptor
            .member_index(member)
            .ok_or_else(|| ModelError::UnknownMember {
                type_key: self.type_key().clone(),
                member: member.to_string(),
            })
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({}@{:#x})", self.type_key(), self.identity())
    }
}

/// Handle to a fixed-length array
#[derive(Clone)]
pub struct ArrayRef(Arc<RwLock<Vec<Value>>>);

impl ArrayRef {
    /// Array holding `items`
    #[must_use]
    pub fn new(items: Vec<Value>) -> Self {
        Self(Arc::new(RwLock::new(items)))
    }

    /// Array of `len` nulls
    #[must_use]
    pub fn with_len(len: usize) -> Self {
        Self::new(vec![Value::Null; len])
    }

    /// Address-based identity
    #[inline]
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Same allocation
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Length
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Has length zero
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read one slot
    ///
    /// # Errors
    /// Returns [`ModelError::IndexOutOfBounds`] past the end
    pub fn get(&self, index: usize) -> ModelResult<Value> {
        let items = self.0.read();
        items
            .get(index)
            .cloned()
            .ok_or(ModelError::IndexOutOfBounds {
                index,
                len: items.len(),
            })
    }

    /// Write one slot
    ///
    /// # Errors
    /// Returns [`ModelError::IndexOutOfBounds`] past the end
    pub fn set(&self, index: usize, value: impl Into<Value>) -> ModelResult<()> {
        let mut items = self.0.write();
        let len = items.len();
        let slot = items
            .get_mut(index)
            .ok_or(ModelError::IndexOutOfBounds { index, len })?;
        *slot = value.into();
        Ok(())
    }

    /// Snapshot of all slots
    #[must_use]
    pub fn items(&self) -> Vec<Value> {
        self.0.read().clone()
    }

    /// Replace every slot at once; the length is fixed
    ///
    /// # Errors
    /// Returns [`ModelError::IndexOutOfBounds`] if the lengths differ
    pub fn replace_items(&self, items: Vec<Value>) -> ModelResult<()> {
        let mut current = self.0.write();
        if items.len() != current.len() {
            return Err(ModelError::IndexOutOfBounds {
                index: items.len(),
                len: current.len(),
            });
        }
        *current = items;
        Ok(())
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArrayRef(@{:#x})", self.identity())
    }
}

/// Storage of a mutable container
#[derive(Debug, Clone)]
pub enum Container {
    /// [`ContainerKind::List`]
    List(Vec<Value>),
    /// [`ContainerKind::Deque`]
    Deque(VecDeque<Value>),
    /// [`ContainerKind::HashSet`]
    HashSet(IndexSet<Value>),
    /// [`ContainerKind::Dictionary`]
    Dictionary(IndexMap<Value, Value>),
    /// [`ContainerKind::ReadOnlyList`]
    ReadOnlyList(Vec<Value>),
}

impl Container {
    /// Empty storage for a concrete, non-persistent kind
    ///
    /// # Errors
    /// Returns [`ModelError::NotConstructible`] for abstract or persistent kinds
    pub fn empty(kind: &ContainerKind) -> ModelResult<Self> {
        match kind {
            ContainerKind::List => Ok(Self::List(Vec::new())),
            ContainerKind::Deque => Ok(Self::Deque(VecDeque::new())),
            ContainerKind::HashSet => Ok(Self::HashSet(IndexSet::new())),
            ContainerKind::Dictionary => Ok(Self::Dictionary(IndexMap::new())),
            ContainerKind::ReadOnlyList => Ok(Self::ReadOnlyList(Vec::new())),
            other if other.is_persistent() => Err(ModelError::not_constructible(
                other.name(),
                "persistent containers are values, not handles",
            )),
            other => Err(ModelError::not_constructible(
                other.name(),
                "abstract container shape",
            )),
        }
    }

    /// Kind of this storage
    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        match self {
            Self::List(_) => ContainerKind::List,
            Self::Deque(_) => ContainerKind::Deque,
            Self::HashSet(_) => ContainerKind::HashSet,
            Self::Dictionary(_) => ContainerKind::Dictionary,
            Self::ReadOnlyList(_) => ContainerKind::ReadOnlyList,
        }
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::List(v) | Self::ReadOnlyList(v) => v.len(),
            Self::Deque(d) => d.len(),
            Self::HashSet(s) => s.len(),
            Self::Dictionary(m) => m.len(),
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
            Self::List(v) | Self::ReadOnlyList(v) => v.iter().cloned().map(Entry::Element).collect(),
            Self::Deque(d) => d.iter().cloned().map(Entry::Element).collect(),
            Self::HashSet(s) => s.iter().cloned().map(Entry::Element).collect(),
            Self::Dictionary(m) => m
                .iter()
                .map(|(k, v)| Entry::Pair(k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Add one entry through the insertion capability
    ///
    /// # Errors
    /// - [`ModelError::MissingCapability`] for read-only storage
    /// - [`ModelError::EntryShape`] for an element/pair mismatch
    pub fn insert(&mut self, entry: Entry) -> ModelResult<()> {
        let kind = self.kind();
        match (self, entry) {
            (Self::List(v), Entry::Element(e)) => v.push(e),
            (Self::Deque(d), Entry::Element(e)) => d.push_back(e),
            (Self::HashSet(s), Entry::Element(e)) => {
                s.insert(e);
            }
            (Self::Dictionary(m), Entry::Pair(k, v)) => {
                m.insert(k, v);
            }
            (Self::ReadOnlyList(_), _) => {
                return Err(ModelError::MissingCapability {
                    container: kind.to_string(),
                    capability: Capability::Insert,
                })
            }
            (Self::Dictionary(_), Entry::Element(_)) => {
                return Err(ModelError::EntryShape {
                    container: kind.to_string(),
                    expected: "key/value",
                })
            }
            (_, Entry::Pair(..)) => {
                return Err(ModelError::EntryShape {
                    container: kind.to_string(),
                    expected: "element",
                })
            }
        }
        Ok(())
    }

    fn into_values(self) -> Vec<Value> {
        match self {
            Self::List(v) | Self::ReadOnlyList(v) => v,
            Self::Deque(d) => d.into_iter().collect(),
            Self::HashSet(s) => s.into_iter().collect(),
            Self::Dictionary(m) => m.into_iter().flat_map(|(k, v)| [k, v]).collect(),
        }
    }
}

struct ContainerCell {
    kind: ContainerKind,
    items: RwLock<Container>,
}

impl ContainerCell {
    fn take_values(&mut self) -> Vec<Value> {
        std::mem::replace(self.items.get_mut(), Container::List(Vec::new())).into_values()
    }
}

impl Drop for ContainerCell {
    fn drop(&mut self) {
        release(self.take_values());
    }
}

/// Handle to a mutable container
#[derive(Clone)]
pub struct ContainerRef(Arc<ContainerCell>);

impl ContainerRef {
    /// Empty container of a concrete, non-persistent kind
    ///
    /// # Errors
    /// Returns [`ModelError::NotConstructible`] for abstract or persistent kinds
    pub fn empty(kind: &ContainerKind) -> ModelResult<Self> {
        Ok(Self::wrap(Container::empty(kind)?))
    }

    /// Container built directly from entries
    ///
    /// Bypasses the insertion capability, so read-only lists can be built.
    ///
    /// # Errors
    /// Returns error for non-constructible kinds or mismatched entry shapes
    pub fn from_entries(kind: &ContainerKind, entries: Vec<Entry>) -> ModelResult<Self> {
        let mut storage = Container::empty(&normalize_read_only(kind))?;
        for entry in entries {
            storage.insert(entry)?;
        }
        if *kind == ContainerKind::ReadOnlyList {
            if let Container::List(items) = storage {
                storage = Container::ReadOnlyList(items);
            }
        }
        Ok(Self::wrap(storage))
    }

    /// `List` of values
    #[must_use]
    pub fn list(values: impl IntoIterator<Item = Value>) -> Self {
        Self::wrap(Container::List(values.into_iter().collect()))
    }

    /// `Deque` of values
    #[must_use]
    pub fn deque(values: impl IntoIterator<Item = Value>) -> Self {
        Self::wrap(Container::Deque(values.into_iter().collect()))
    }

    /// `HashSet` of values
    #[must_use]
    pub fn set(values: impl IntoIterator<Item = Value>) -> Self {
        Self::wrap(Container::HashSet(values.into_iter().collect()))
    }

    /// `Dictionary` of pairs
    #[must_use]
    pub fn dictionary(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::wrap(Container::Dictionary(pairs.into_iter().collect()))
    }

    /// `ReadOnlyList` of values
    #[must_use]
    pub fn read_only(values: impl IntoIterator<Item = Value>) -> Self {
        Self::wrap(Container::ReadOnlyList(values.into_iter().collect()))
    }

    fn wrap(storage: Container) -> Self {
        Self(Arc::new(ContainerCell {
            kind: storage.kind(),
            items: RwLock::new(storage),
        }))
    }

    /// Address-based identity
    #[inline]
    #[must_use]
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Same allocation
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Concrete kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ContainerKind {
        self.0.kind.clone()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.items.read().len()
    }

    /// Has no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of entries in enumeration order
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.0.items.read().entries()
    }

    /// Snapshot of element values; keys and values interleaved for maps
    #[must_use]
    pub fn values(&self) -> Vec<Value> {
        self.0.items.read().clone().into_values()
    }

    /// Add one entry
    ///
    /// # Errors
    /// See [`Container::insert`]
    pub fn insert(&self, entry: Entry) -> ModelResult<()> {
        self.0.items.write().insert(entry)
    }

    /// Add an element
    ///
    /// # Errors
    /// See [`Container::insert`]
    pub fn push(&self, value: impl Into<Value>) -> ModelResult<()> {
        self.insert(Entry::Element(value.into()))
    }

    /// Add entries in order under one lock
    ///
    /// # Errors
    /// See [`Container::insert`]; entries before the failing one are kept
    pub fn insert_all(&self, entries: impl IntoIterator<Item = Entry>) -> ModelResult<()> {
        let mut items = self.0.items.write();
        for entry in entries {
            items.insert(entry)?;
        }
        Ok(())
    }
}

fn normalize_read_only(kind: &ContainerKind) -> ContainerKind {
    match kind {
        ContainerKind::ReadOnlyList => ContainerKind::List,
        other => other.clone(),
    }
}

impl fmt::Debug for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContainerRef({}@{:#x})", self.0.kind, self.identity())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TypeDescriptor;
    use crate::types::TypeRef;

    fn node_descriptor() -> Arc<TypeDescriptor> {
        Arc::new(
            TypeDescriptor::composite("Node")
                .field("value", TypeRef::int())
                .field("next", TypeRef::named("Node"))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn object_defaults_and_assignment() {
        let node = ObjectRef::new(node_descriptor());
        assert_eq!(node.get("value").unwrap(), Value::Int(0));
        assert!(node.get("next").unwrap().is_null());

        node.set("value", 5).unwrap();
        node.set("next", &node).unwrap();
        assert_eq!(node.get("value").unwrap(), Value::Int(5));
        assert!(node.get("next").unwrap().same(&Value::from(&node)));
    }

    #[test]
    fn object_rejects_mismatched_value() {
        let node = ObjectRef::new(node_descriptor());
        let err = node.set("value", "five").unwrap_err();
        assert!(matches!(err, ModelError::TypeMismatch { .. }));
        assert!(matches!(
            node.get("missing"),
            Err(ModelError::UnknownMember { .. })
        ));
    }

    #[test]
    fn debug_does_not_walk_cycles() {
        let node = ObjectRef::new(node_descriptor());
        node.set("next", &node).unwrap();
        let rendered = format!("{node:?}");
        assert!(rendered.starts_with("ObjectRef(Node@"));
    }

    #[test]
    fn long_chain_drops_without_overflow() {
        let desc = node_descriptor();
        let head = ObjectRef::new(Arc::clone(&desc));
        let mut tail = head.clone();
        for _ in 0..200_000 {
            let next = ObjectRef::new(Arc::clone(&desc));
            tail.set("next", &next).unwrap();
            tail = next;
        }
        drop(tail);
        drop(head);
    }

    #[test]
    fn nested_lists_drop_without_overflow() {
        let mut nested = ContainerRef::list([]);
        for _ in 0..200_000 {
            nested = ContainerRef::list([Value::from(nested)]);
        }
        drop(nested);
    }

    #[test]
    fn read_only_list_refuses_insert() {
        let list = ContainerRef::read_only([Value::Int(1)]);
        let err = list.push(2).unwrap_err();
        assert!(matches!(
            err,
            ModelError::MissingCapability {
                capability: Capability::Insert,
                ..
            }
        ));

        let built =
            ContainerRef::from_entries(&ContainerKind::ReadOnlyList, list.entries()).unwrap();
        assert_eq!(built.kind(), ContainerKind::ReadOnlyList);
        assert_eq!(built.len(), 1);
    }

    #[test]
    fn dictionary_requires_pairs() {
        let dict = ContainerRef::empty(&ContainerKind::Dictionary).unwrap();
        assert!(dict.push(1).is_err());
        dict.insert(Entry::Pair(Value::text("a"), Value::Int(1))).unwrap();
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn abstract_kind_is_not_constructible() {
        assert!(ContainerRef::empty(&ContainerKind::Sequence).is_err());
        assert!(ContainerRef::empty(&ContainerKind::PersistentList).is_err());
    }

    #[test]
    fn array_slots() {
        let array = ArrayRef::with_len(3);
        array.set(1, 9).unwrap();
        assert_eq!(array.get(1).unwrap(), Value::Int(9));
        assert!(array.get(3).is_err());
        assert!(array.replace_items(vec![Value::Null]).is_err());
    }
}
