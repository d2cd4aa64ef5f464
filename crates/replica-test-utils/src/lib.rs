//! Testing utilities for Replica workspace
//!
//! Shared fixture types, graph builders and tracing setup.

#![allow(missing_docs)]

use replica_model::{
    ArrayRef, CloneStrategy, ContainerKind, ContainerRef, ObjectRef, Persistent, TypeDescriptor,
    TypeKey, TypeRef, TypeRegistry, Value,
};
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;

/// Install a test-friendly fmt subscriber once per process
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub fn priority_queue() -> ContainerKind {
    ContainerKind::Abstract(TypeKey::new("PriorityQueue"))
}

/// Registry with every fixture type
pub fn fixture_registry() -> Arc<TypeRegistry> {
    let registry = TypeRegistry::new();
    for descriptor in fixture_types() {
        registry.register(descriptor).unwrap();
    }
    Arc::new(registry)
}

fn fixture_types() -> Vec<TypeDescriptor> {
    let wide = (0..11)
        .fold(TypeDescriptor::composite("Wide"), |builder, i| {
            builder.field(format!("f{i}"), TypeRef::int())
        })
        .field("peer", TypeRef::named("Wide"));

    vec![
        TypeDescriptor::composite("Point")
            .field("x", TypeRef::int())
            .field("y", TypeRef::int()),
        TypeDescriptor::composite("Container").field("items", TypeRef::list(TypeRef::int())),
        TypeDescriptor::composite("Child")
            .field("name", TypeRef::text())
            .field("value", TypeRef::int()),
        TypeDescriptor::composite("Tree")
            .field("left", TypeRef::named("Child"))
            .field("right", TypeRef::named("Child")),
        TypeDescriptor::composite("Node")
            .field("value", TypeRef::int())
            .field("next", TypeRef::named("Node")),
        TypeDescriptor::composite("Gadget")
            .field("name", TypeRef::text())
            .excluded("cache", TypeRef::list(TypeRef::int()))
            .read_only("serial", TypeRef::int()),
        TypeDescriptor::opaque("Socket"),
        TypeDescriptor::composite("Connection")
            .field("host", TypeRef::text())
            .excluded("socket", TypeRef::named("Socket")),
        TypeDescriptor::composite("RawConnection")
            .field("host", TypeRef::text())
            .field("socket", TypeRef::named("Socket")),
        wide,
        TypeDescriptor::composite("Money")
            .read_only("amount", TypeRef::int())
            .read_only("currency", TypeRef::text()),
        TypeDescriptor::abstract_type("Shape"),
        TypeDescriptor::composite("Circle").field("radius", TypeRef::float()),
        TypeDescriptor::composite("Square").field("side", TypeRef::float()),
        TypeDescriptor::composite("Drawing")
            .field("main", TypeRef::named("Shape"))
            .field("shapes", TypeRef::list(TypeRef::named("Shape"))),
        TypeDescriptor::composite("Scheduler")
            .field("jobs", TypeRef::container(priority_queue(), TypeRef::int())),
        TypeDescriptor::composite("Catalog").field(
            "titles",
            TypeRef::container(ContainerKind::ReadOnlyList, TypeRef::text()),
        ),
        TypeDescriptor::composite("Inventory")
            .field("tags", TypeRef::container(ContainerKind::HashSet, TypeRef::text()))
            .field(
                "by_name",
                TypeRef::dictionary(TypeRef::text(), TypeRef::named("Point")),
            )
            .field(
                "history",
                TypeRef::container(ContainerKind::PersistentList, TypeRef::named("Point")),
            )
            .field(
                "labels",
                TypeRef::container(ContainerKind::PersistentSet, TypeRef::text()),
            )
            .field("grid", TypeRef::array(TypeRef::named("Point")))
            .field("queue", TypeRef::container(ContainerKind::Deque, TypeRef::int()))
            .field("extra", TypeRef::Any),
        TypeDescriptor::composite("Ledger")
            .field(
                "totals",
                TypeRef::keyed(ContainerKind::Map, TypeRef::text(), TypeRef::int()),
            )
            .field(
                "entries",
                TypeRef::container(ContainerKind::Sequence, TypeRef::named("Point")),
            )
            .field("flags", TypeRef::container(ContainerKind::Set, TypeRef::int())),
        TypeDescriptor::composite("Holder")
            .field(
                "wallets",
                TypeRef::container(ContainerKind::PersistentList, TypeRef::named("Money")),
            )
            .field(
                "names",
                TypeRef::container(ContainerKind::PersistentList, TypeRef::text()),
            ),
        TypeDescriptor::composite("Snapshot")
            .field("label", TypeRef::text())
            .field("points", TypeRef::list(TypeRef::named("Point")))
            .strategy(CloneStrategy::Serializer),
    ]
    .into_iter()
    .map(|builder| builder.build().unwrap())
    .collect()
}

pub fn point(registry: &TypeRegistry, x: i64, y: i64) -> ObjectRef {
    let point = registry.instantiate("Point").unwrap();
    point.set("x", x).unwrap();
    point.set("y", y).unwrap();
    point
}

pub fn container_of(registry: &TypeRegistry, items: &[i64]) -> ObjectRef {
    let container = registry.instantiate("Container").unwrap();
    container
        .set("items", ContainerRef::list(items.iter().copied().map(Value::Int)))
        .unwrap();
    container
}

pub fn child(registry: &TypeRegistry, name: &str, value: i64) -> ObjectRef {
    let child = registry.instantiate("Child").unwrap();
    child.set("name", name).unwrap();
    child.set("value", value).unwrap();
    child
}

/// Tree whose left and right are the same child
pub fn shared_tree(registry: &TypeRegistry) -> (ObjectRef, ObjectRef) {
    let shared = child(registry, "c", 7);
    let tree = registry.instantiate("Tree").unwrap();
    tree.set("left", &shared).unwrap();
    tree.set("right", &shared).unwrap();
    (tree, shared)
}

/// Node whose `next` is itself
pub fn self_loop(registry: &TypeRegistry) -> ObjectRef {
    let node = registry.instantiate("Node").unwrap();
    node.set("value", 1).unwrap();
    node.set("next", &node).unwrap();
    node
}

/// Acyclic chain of `len` nodes, values `0..len`
pub fn chain(registry: &TypeRegistry, len: usize) -> ObjectRef {
    let mut head = registry.instantiate("Node").unwrap();
    head.set("value", i64::try_from(len - 1).unwrap()).unwrap();
    for value in (0..len - 1).rev() {
        let node = registry.instantiate("Node").unwrap();
        node.set("value", i64::try_from(value).unwrap()).unwrap();
        node.set("next", head).unwrap();
        head = node;
    }
    head
}

/// Ring of `len` nodes, the last pointing back at the first
pub fn ring(registry: &TypeRegistry, len: usize) -> ObjectRef {
    let head = chain(registry, len);
    let mut tail = head.clone();
    while let Some(next) = tail.get("next").unwrap().as_object().cloned() {
        tail = next;
    }
    tail.set("next", &head).unwrap();
    head
}

pub fn wide(registry: &TypeRegistry) -> ObjectRef {
    let wide = registry.instantiate("Wide").unwrap();
    for i in 0..11_i64 {
        wide.set(&format!("f{i}"), i * 10).unwrap();
    }
    wide
}

pub fn inventory(registry: &TypeRegistry) -> ObjectRef {
    let origin = point(registry, 0, 0);
    let far = point(registry, 9, 9);

    let inventory = registry.instantiate("Inventory").unwrap();
    inventory
        .set("tags", ContainerRef::set([Value::text("red"), Value::text("blue")]))
        .unwrap();
    inventory
        .set(
            "by_name",
            ContainerRef::dictionary([
                (Value::text("origin"), Value::from(&origin)),
                (Value::text("far"), Value::from(&far)),
            ]),
        )
        .unwrap();
    inventory
        .set(
            "history",
            Persistent::List([Value::from(&origin), Value::from(&far)].into_iter().collect()),
        )
        .unwrap();
    inventory
        .set(
            "labels",
            Persistent::Set([Value::text("a"), Value::text("b")].into_iter().collect()),
        )
        .unwrap();
    inventory
        .set("grid", ArrayRef::new(vec![Value::from(&origin), Value::Null]))
        .unwrap();
    inventory
        .set("queue", ContainerRef::deque([Value::Int(3), Value::Int(1)]))
        .unwrap();
    inventory
        .set("extra", ContainerRef::list([Value::from(&far), Value::text("x")]))
        .unwrap();
    inventory
}
