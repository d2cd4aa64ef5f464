//! Collection Tests
//!
//! Containers, arrays, persistent values and abstract declarations.

use pretty_assertions::assert_eq;
use replica_engine::prelude::*;
use replica_engine::{CloneErrorKind, Cloner};
use replica_model::{Capability, ContainerKind, Entry};
use replica_test_utils::{fixture_registry, init_tracing, inventory, point, priority_queue};
use std::sync::Arc;

fn setup() -> (Arc<TypeRegistry>, Cloner) {
    init_tracing();
    let registry = fixture_registry();
    let cloner = Cloner::new(Arc::clone(&registry));
    (registry, cloner)
}

fn member(object: &ObjectRef, name: &str) -> Value {
    object.get(name).unwrap()
}

#[test]
fn test_inventory_clone_is_deep_equal() {
    let (registry, cloner) = setup();
    let original = inventory(&registry);

    let copy = cloner.deep_clone(&original).unwrap();
    assert!(deep_eq(&Value::from(&copy), &Value::from(&original)));

    for name in ["tags", "by_name", "grid", "queue", "extra"] {
        assert!(
            !member(&copy, name).same(&member(&original, name)),
            "member {name} was not copied"
        );
    }
}

#[test]
fn test_inventory_aliasing_across_members() {
    let (registry, cloner) = setup();
    let copy = cloner.deep_clone(&inventory(&registry)).unwrap();

    let by_name = member(&copy, "by_name");
    let entries = by_name.as_container().unwrap().entries();
    let Entry::Pair(_, origin) = &entries[0] else {
        panic!("dictionary entry expected");
    };
    let Entry::Pair(_, far) = &entries[1] else {
        panic!("dictionary entry expected");
    };

    let grid = member(&copy, "grid").as_array().unwrap().items();
    assert!(grid[0].same(origin));
    assert!(grid[1].is_null());

    let Value::Persistent(history) = member(&copy, "history") else {
        panic!("persistent list expected");
    };
    let history = history.entries();
    assert!(matches!(&history[0], Entry::Element(v) if v.same(origin)));
    assert!(matches!(&history[1], Entry::Element(v) if v.same(far)));

    let extra = member(&copy, "extra").as_container().unwrap().values();
    assert!(extra[0].same(far));
    assert_eq!(extra[1], Value::text("x"));
}

#[test]
fn test_immutable_persistent_member_is_aliased() {
    let (registry, cloner) = setup();
    let original = inventory(&registry);

    let copy = cloner.deep_clone(&original).unwrap();
    assert!(member(&copy, "labels").same(&member(&original, "labels")));
    assert!(!member(&copy, "history").same(&member(&original, "history")));
}

#[test]
fn test_container_kinds_preserved() {
    let (registry, cloner) = setup();
    let copy = cloner.deep_clone(&inventory(&registry)).unwrap();

    let kind = |name: &str| member(&copy, name).as_container().unwrap().kind();
    assert_eq!(kind("tags"), ContainerKind::HashSet);
    assert_eq!(kind("by_name"), ContainerKind::Dictionary);
    assert_eq!(kind("queue"), ContainerKind::Deque);
    assert_eq!(kind("extra"), ContainerKind::List);
    assert_eq!(
        member(&copy, "queue").as_container().unwrap().values(),
        vec![Value::Int(3), Value::Int(1)]
    );
}

#[test]
fn test_abstract_shapes_keep_source_kind() {
    let (registry, cloner) = setup();
    let ledger = registry.instantiate("Ledger").unwrap();
    ledger
        .set(
            "totals",
            ContainerRef::dictionary([(Value::text("eur"), Value::Int(12))]),
        )
        .unwrap();
    ledger
        .set(
            "entries",
            ContainerRef::deque([Value::from(point(&registry, 1, 1))]),
        )
        .unwrap();
    ledger
        .set("flags", ContainerRef::set([1, 2].map(Value::Int)))
        .unwrap();

    let copy = cloner.deep_clone(&ledger).unwrap();
    let kind = |name: &str| member(&copy, name).as_container().unwrap().kind();

    assert_eq!(kind("totals"), ContainerKind::Dictionary);
    assert_eq!(kind("entries"), ContainerKind::Deque);
    assert_eq!(kind("flags"), ContainerKind::HashSet);
    assert!(deep_eq(&Value::from(&copy), &Value::from(&ledger)));
}

#[test]
fn test_abstract_shape_rejects_other_kinds() {
    let (registry, _) = setup();
    let ledger = registry.instantiate("Ledger").unwrap();

    let err = ledger
        .set("flags", ContainerRef::list([1, 1, 2].map(Value::Int)))
        .unwrap_err();
    assert!(matches!(err, ModelError::TypeMismatch { .. }));
    let err = ledger
        .set("entries", ContainerRef::read_only([Value::Null]))
        .unwrap_err();
    assert!(matches!(err, ModelError::TypeMismatch { .. }));
}

#[test]
fn test_persistent_member_with_mutable_entry_is_copied() {
    let (registry, cloner) = setup();
    let holder = registry.instantiate("Holder").unwrap();
    let inner = point(&registry, 1, 2);
    holder
        .set(
            "wallets",
            Persistent::List([Value::from(&inner)].into_iter().collect()),
        )
        .unwrap();

    let copy = cloner.deep_clone(&holder).unwrap();
    let Value::Persistent(wallets) = member(&copy, "wallets") else {
        panic!("persistent list expected");
    };
    let entries = wallets.entries();
    let Entry::Element(copied) = &entries[0] else {
        panic!("element expected");
    };
    let copied = copied.as_object().unwrap();
    assert!(!copied.ptr_eq(&inner));

    copied.set("x", 99).unwrap();
    assert_eq!(inner.get("x").unwrap(), Value::Int(1));
}

#[test]
fn test_persistent_member_of_immutables_is_aliased() {
    let (registry, cloner) = setup();
    let holder = registry.instantiate("Holder").unwrap();
    let money = registry.instantiate("Money").unwrap();
    holder
        .set(
            "wallets",
            Persistent::List([Value::from(&money)].into_iter().collect()),
        )
        .unwrap();
    holder
        .set(
            "names",
            Persistent::List([Value::text("a")].into_iter().collect()),
        )
        .unwrap();

    let copy = cloner.deep_clone(&holder).unwrap();
    assert!(member(&copy, "wallets").same(&member(&holder, "wallets")));
    assert!(member(&copy, "names").same(&member(&holder, "names")));
}

#[test]
fn test_persistent_member_checks_entries() {
    let (registry, _) = setup();
    let holder = registry.instantiate("Holder").unwrap();

    let err = holder
        .set(
            "names",
            Persistent::List([Value::from(point(&registry, 1, 1))].into_iter().collect()),
        )
        .unwrap_err();
    assert!(matches!(err, ModelError::TypeMismatch { .. }));
}

#[test]
fn test_read_only_container_member_rejected() {
    let (registry, cloner) = setup();
    let catalog = registry.instantiate("Catalog").unwrap();

    let err = cloner.deep_clone(&catalog).unwrap_err();
    assert_eq!(
        err,
        CloneError::missing_capability("ReadOnlyList<Text>", Capability::Insert)
    );
}

#[test]
fn test_read_only_container_value_rejected() {
    let (_, cloner) = setup();
    let titles = ContainerRef::read_only([Value::text("a")]);

    let err = cloner.deep_clone(&titles).unwrap_err();
    assert_eq!(err.kind(), CloneErrorKind::MissingContainerCapability);
}

#[test]
fn test_custom_container_mapping() {
    init_tracing();
    let registry = fixture_registry();
    let cloner = Cloner::builder(Arc::clone(&registry))
        .map_container(priority_queue(), ContainerKind::List)
        .build();

    let scheduler = registry.instantiate("Scheduler").unwrap();
    scheduler
        .set("jobs", ContainerRef::list([3, 1, 2].map(Value::Int)))
        .unwrap();

    let copy = cloner.deep_clone(&scheduler).unwrap();
    let jobs = member(&copy, "jobs");
    assert!(!jobs.same(&member(&scheduler, "jobs")));
    assert_eq!(
        jobs.as_container().unwrap().values(),
        vec![Value::Int(3), Value::Int(1), Value::Int(2)]
    );
}

#[test]
fn test_unmapped_abstract_object_type() {
    let (registry, cloner) = setup();
    let drawing = registry.instantiate("Drawing").unwrap();

    let err = cloner.deep_clone(&drawing).unwrap_err();
    assert_eq!(err, CloneError::unmapped("Shape"));
}

#[test]
fn test_abstract_members_dispatch_on_runtime_type() {
    init_tracing();
    let registry = fixture_registry();
    let cloner = Cloner::builder(Arc::clone(&registry))
        .map_type("Shape", "Circle")
        .build();

    let circle = registry.instantiate("Circle").unwrap();
    circle.set("radius", 1.5).unwrap();
    let square = registry.instantiate("Square").unwrap();
    square.set("side", 2.0).unwrap();

    let drawing = registry.instantiate("Drawing").unwrap();
    drawing.set("main", &square).unwrap();
    drawing
        .set(
            "shapes",
            ContainerRef::list([
                Value::from(&circle),
                Value::from(&square),
                Value::from(&circle),
            ]),
        )
        .unwrap();

    let copy = cloner.deep_clone(&drawing).unwrap();
    let main = member(&copy, "main");
    assert_eq!(main.as_object().unwrap().type_key().as_str(), "Square");

    let shapes = member(&copy, "shapes").as_container().unwrap().values();
    assert!(shapes[1].same(&main));
    assert!(shapes[0].same(&shapes[2]));
    assert!(deep_eq(&copy.into(), &drawing.into()));
}

#[test]
fn test_top_level_collections() {
    let (registry, cloner) = setup();
    let shared = point(&registry, 4, 5);

    let list = ContainerRef::list([Value::from(&shared), Value::from(&shared)]);
    let copy = cloner.deep_clone(&list).unwrap();
    let values = copy.values();
    assert!(!copy.ptr_eq(&list));
    assert!(values[0].same(&values[1]));
    assert!(!values[0].same(&Value::from(&shared)));

    let array = ArrayRef::new(vec![Value::Int(1), Value::from(&shared)]);
    let copy = cloner.deep_clone(&array).unwrap();
    assert!(!copy.ptr_eq(&array));
    assert!(deep_eq(&copy.into(), &array.into()));

    let persistent = Persistent::List([Value::from(&shared)].into_iter().collect());
    let entries = cloner.deep_clone(&persistent).unwrap().entries();
    let Entry::Element(item) = &entries[0] else {
        panic!("element expected");
    };
    assert!(!item.same(&Value::from(&shared)));
}

#[test]
fn test_float_member_kept() {
    let (registry, cloner) = setup();
    let circle = registry.instantiate("Circle").unwrap();
    circle.set("radius", 0.25).unwrap();

    let copy = cloner.deep_clone(&circle).unwrap();
    assert_eq!(copy.get("radius").unwrap(), Value::Float(0.25));
}
