//! Serializer fallback
//!
//! [`StructuralSerializer`] is the seam for the generic round-trip path.
//! [`JsonGraphSerializer`] flattens the graph into a node table: every
//! object, array and mutable container becomes one node and references are
//! node indices, so aliasing and cycles survive the round trip and encoding
//! never recurses along graph edges.
//!
//! Objects carry only members that take part in cloning; the others come
//! back at their defaults.

use crate::error::{CloneError, CloneResult};
use replica_model::{
    ArrayRef, ContainerKind, ContainerRef, Entry, Persistent, TypeKey, TypeRegistry, Value,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Round-trip serializer used by the fallback strategy
#[cfg_attr(test, mockall::automock)]
pub trait StructuralSerializer: Send + Sync {
    /// Encode a graph
    ///
    /// # Errors
    /// [`CloneError::FallbackSerialization`] if the graph cannot be encoded
    fn serialize(&self, value: &Value) -> CloneResult<Vec<u8>>;

    /// Rebuild a graph, instantiating objects through `registry`
    ///
    /// # Errors
    /// [`CloneError::FallbackSerialization`] if the bytes cannot be decoded
    fn deserialize(&self, bytes: &[u8], registry: &TypeRegistry) -> CloneResult<Value>;
}

/// JSON node-table serializer
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGraphSerializer;

impl JsonGraphSerializer {
    /// Create serializer
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl StructuralSerializer for JsonGraphSerializer {
    fn serialize(&self, value: &Value) -> CloneResult<Vec<u8>> {
        let document = Encoder::default().encode(value);
        serde_json::to_vec(&document).map_err(|e| CloneError::fallback(format!("encode: {e}")))
    }

    fn deserialize(&self, bytes: &[u8], registry: &TypeRegistry) -> CloneResult<Value> {
        let document: Document =
            serde_json::from_slice(bytes).map_err(|e| CloneError::fallback(format!("decode: {e}")))?;
        Decoder::new(registry, &document.nodes)?.decode(&document.root)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Document {
    root: Slot,
    nodes: Vec<Node>,
}

#[derive(Debug, Serialize, Deserialize)]
enum Slot {
    Null,
    Bool(bool),
    Int(i64),
    /// Raw IEEE-754 bits
    Float(u64),
    Text(String),
    Ref(usize),
    Persistent {
        kind: String,
        entries: Vec<EntrySlot>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
enum EntrySlot {
    Element(Slot),
    Pair(Slot, Slot),
}

#[derive(Debug, Serialize, Deserialize)]
enum Node {
    Object {
        type_key: String,
        fields: Vec<(String, Slot)>,
    },
    Array(Vec<Slot>),
    Container {
        kind: String,
        entries: Vec<EntrySlot>,
    },
}

#[derive(Default)]
struct Encoder {
    index: HashMap<usize, usize>,
    nodes: Vec<Option<Node>>,
    pending: Vec<(usize, Value)>,
    keep: Vec<Value>,
}

impl Encoder {
    fn encode(mut self, root: &Value) -> Document {
        let root = self.slot(root);
        while let Some((position, handle)) = self.pending.pop() {
            let node = self.node(&handle);
            self.nodes[position] = Some(node);
            self.keep.push(handle);
        }
        Document {
            root,
            nodes: self.nodes.into_iter().flatten().collect(),
        }
    }

    fn slot(&mut self, value: &Value) -> Slot {
        match value {
            Value::Null => Slot::Null,
            Value::Bool(b) => Slot::Bool(*b),
            Value::Int(i) => Slot::Int(*i),
            Value::Float(f) => Slot::Float(f.to_bits()),
            Value::Text(s) => Slot::Text(s.to_string()),
            Value::Persistent(p) => Slot::Persistent {
                kind: p.kind().name().to_string(),
                entries: self.entries(p.entries()),
            },
            Value::Object(_) | Value::Array(_) | Value::Container(_) => {
                let identity = value.identity().unwrap_or_default();
                if let Some(&position) = self.index.get(&identity) {
                    return Slot::Ref(position);
                }
                let position = self.nodes.len();
                self.index.insert(identity, position);
                self.nodes.push(None);
                self.pending.push((position, value.clone()));
                Slot::Ref(position)
            }
        }
    }

    fn entries(&mut self, entries: Vec<Entry>) -> Vec<EntrySlot> {
        entries
            .into_iter()
            .map(|entry| match entry {
                Entry::Element(v) => EntrySlot::Element(self.slot(&v)),
                Entry::Pair(k, v) => EntrySlot::Pair(self.slot(&k), self.slot(&v)),
            })
            .collect()
    }

    fn node(&mut self, handle: &Value) -> Node {
        match handle {
            Value::Object(object) => {
                let values = object.fields();
                let fields = object
                    .descriptor()
                    .participating_members()
                    .map(|(i, member)| (member.name().to_string(), values[i].clone()))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .map(|(name, value)| (name, self.slot(&value)))
                    .collect();
                Node::Object {
                    type_key: object.type_key().to_string(),
                    fields,
                }
            }
            Value::Array(array) => Node::Array(array.items().iter().map(|v| self.slot(v)).collect()),
            Value::Container(container) => Node::Container {
                kind: container.kind().name().to_string(),
                entries: self.entries(container.entries()),
            },
            _ => Node::Array(Vec::new()),
        }
    }
}

struct Decoder<'a> {
    nodes: &'a [Node],
    shells: Vec<Value>,
}

impl<'a> Decoder<'a> {
    fn new(registry: &TypeRegistry, nodes: &'a [Node]) -> CloneResult<Self> {
        let shells = nodes
            .iter()
            .map(|node| shell(registry, node))
            .collect::<CloneResult<Vec<_>>>()?;
        Ok(Self { nodes, shells })
    }

    fn decode(&self, root: &Slot) -> CloneResult<Value> {
        for (node, shell) in self.nodes.iter().zip(&self.shells) {
            self.fill(node, shell)?;
        }
        self.value(root)
    }

    fn fill(&self, node: &Node, shell: &Value) -> CloneResult<()> {
        match (node, shell) {
            (Node::Object { fields, .. }, Value::Object(object)) => {
                for (name, slot) in fields {
                    object.set(name, self.value(slot)?).map_err(fallback)?;
                }
            }
            (Node::Array(items), Value::Array(array)) => {
                let items = items
                    .iter()
                    .map(|slot| self.value(slot))
                    .collect::<CloneResult<Vec<_>>>()?;
                array.replace_items(items).map_err(fallback)?;
            }
            (Node::Container { entries, .. }, Value::Container(container)) => {
                container.insert_all(self.entries(entries)?).map_err(fallback)?;
            }
            _ => return Err(CloneError::fallback("node does not match its shell")),
        }
        Ok(())
    }

    fn value(&self, slot: &Slot) -> CloneResult<Value> {
        Ok(match slot {
            Slot::Null => Value::Null,
            Slot::Bool(b) => Value::Bool(*b),
            Slot::Int(i) => Value::Int(*i),
            Slot::Float(bits) => Value::Float(f64::from_bits(*bits)),
            Slot::Text(s) => Value::text(s),
            Slot::Ref(position) => self
                .shells
                .get(*position)
                .cloned()
                .ok_or_else(|| CloneError::fallback(format!("dangling node reference {position}")))?,
            Slot::Persistent { kind, entries } => {
                let kind = container_kind(kind)?;
                Value::Persistent(Persistent::from_staging(&kind, self.entries(entries)?).map_err(fallback)?)
            }
        })
    }

    fn entries(&self, entries: &[EntrySlot]) -> CloneResult<Vec<Entry>> {
        entries
            .iter()
            .map(|entry| {
                Ok(match entry {
                    EntrySlot::Element(v) => Entry::Element(self.value(v)?),
                    EntrySlot::Pair(k, v) => Entry::Pair(self.value(k)?, self.value(v)?),
                })
            })
            .collect()
    }
}

fn shell(registry: &TypeRegistry, node: &Node) -> CloneResult<Value> {
    match node {
        Node::Object { type_key, .. } => registry
            .instantiate(TypeKey::new(type_key))
            .map(Value::Object)
            .map_err(fallback),
        Node::Array(items) => Ok(Value::Array(ArrayRef::with_len(items.len()))),
        Node::Container { kind, .. } => ContainerRef::empty(&container_kind(kind)?)
            .map(Value::Container)
            .map_err(fallback),
    }
}

fn container_kind(name: &str) -> CloneResult<ContainerKind> {
    ContainerKind::concrete_from_name(name)
        .ok_or_else(|| CloneError::fallback(format!("unknown container kind '{name}'")))
}

fn fallback(err: impl std::fmt::Display) -> CloneError {
    CloneError::fallback(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use replica_model::{deep_eq, TypeDescriptor, TypeRef};

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::new();
        registry
            .register(
                TypeDescriptor::composite("Node")
                    .field("value", TypeRef::int())
                    .field("label", TypeRef::text())
                    .field("next", TypeRef::named("Node"))
                    .excluded("scratch", TypeRef::int())
                    .build()
                    .unwrap(),
            )
            .unwrap();
        registry
    }

    fn round_trip(registry: &TypeRegistry, value: &Value) -> Value {
        let serializer = JsonGraphSerializer::new();
        let bytes = serializer.serialize(value).unwrap();
        serializer.deserialize(&bytes, registry).unwrap()
    }

    #[test]
    fn cycle_survives_round_trip() {
        let registry = registry();
        let node = registry.instantiate("Node").unwrap();
        node.set("value", 7).unwrap();
        node.set("label", "seven").unwrap();
        node.set("next", &node).unwrap();

        let copy = round_trip(&registry, &node.clone().into());
        let copy = copy.as_object().unwrap();
        assert!(!copy.ptr_eq(&node));
        assert!(copy.get("next").unwrap().same(&Value::from(copy)));
        assert_eq!(copy.get("label").unwrap(), Value::text("seven"));
    }

    #[test]
    fn excluded_members_come_back_default() {
        let registry = registry();
        let node = registry.instantiate("Node").unwrap();
        node.set("scratch", 42).unwrap();

        let copy = round_trip(&registry, &node.into());
        assert_eq!(copy.as_object().unwrap().get("scratch").unwrap(), Value::Int(0));
    }

    #[test]
    fn shared_container_stays_shared() {
        let registry = registry();
        let shared = ContainerRef::list([Value::Int(1), Value::Int(2)]);
        let outer = ArrayRef::new(vec![shared.clone().into(), shared.into()]);

        let copy = round_trip(&registry, &outer.clone().into());
        let items = copy.as_array().unwrap().items();
        assert!(items[0].same(&items[1]));
        assert!(deep_eq(&copy, &outer.into()));
    }

    #[test]
    fn persistent_and_dictionary_values() {
        let registry = registry();
        let persistent = Persistent::List((1..=3).map(Value::Int).collect());
        let dict = ContainerRef::dictionary([(Value::text("k"), Value::Persistent(persistent))]);

        let copy = round_trip(&registry, &dict.clone().into());
        assert!(deep_eq(&copy, &dict.into()));
    }

    #[test]
    fn non_finite_floats_survive_round_trip() {
        let registry = registry();
        let floats = ArrayRef::new(
            [f64::NAN, f64::INFINITY, f64::NEG_INFINITY, -0.0, 1.5]
                .map(Value::Float)
                .to_vec(),
        );

        let copy = round_trip(&registry, &floats.clone().into());
        let items = copy.as_array().unwrap().items();
        assert!(matches!(items[0], Value::Float(f) if f.is_nan()));
        assert_eq!(items[1], Value::Float(f64::INFINITY));
        assert_eq!(items[2], Value::Float(f64::NEG_INFINITY));
        assert!(deep_eq(&copy, &floats.into()));
    }

    #[test]
    fn unknown_type_is_a_fallback_error() {
        let serializer = JsonGraphSerializer::new();
        let bytes = serializer
            .serialize(&registry().instantiate("Node").unwrap().into())
            .unwrap();
        let err = serializer.deserialize(&bytes, &TypeRegistry::new()).unwrap_err();
        assert!(matches!(err, CloneError::FallbackSerialization(_)));
    }

    #[test]
    fn garbage_is_a_fallback_error() {
        let err = JsonGraphSerializer::new()
            .deserialize(b"not json", &TypeRegistry::new())
            .unwrap_err();
        assert!(matches!(err, CloneError::FallbackSerialization(_)));
    }
}
