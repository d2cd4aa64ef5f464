//! Worklist execution of clone procedures
//!
//! Materialising a handle allocates its clone, registers the pair with the
//! [`ReferenceTracker`] and queues a fill task; the fill task later clones
//! the children. Registration always precedes the visit of any child, so a
//! self-reference resolves to the clone in progress. Stack depth does not
//! grow with graph depth; only nested persistent values recurse.

use crate::classifier::TypeClassifier;
use crate::compiler::{CloneProcedure, Step};
use crate::error::{CloneError, CloneResult};
use crate::tracker::ReferenceTracker;
use replica_model::{
    ArrayRef, Capability, ContainerKind, ContainerRef, Entry, ObjectRef, Persistent, TypeKey, Value,
};
use std::sync::Arc;

/// Supplies compiled procedures by runtime type
pub trait ProcedureSource {
    /// Procedure for `key`
    ///
    /// # Errors
    /// The compilation failure for `key`
    fn procedure(&self, key: &TypeKey) -> CloneResult<CloneProcedure>;
}

enum Task {
    Object {
        source: ObjectRef,
        target: ObjectRef,
        procedure: CloneProcedure,
    },
    Array {
        source: ArrayRef,
        target: ArrayRef,
        element: Arc<Step>,
    },
    Container {
        source: ContainerRef,
        target: ContainerRef,
        element: Arc<Step>,
        value: Option<Arc<Step>>,
    },
}

/// Runs clone steps over one graph with one tracker
pub struct Executor<'a> {
    procedures: &'a dyn ProcedureSource,
    tracker: &'a mut ReferenceTracker,
    tasks: Vec<Task>,
}

impl<'a> Executor<'a> {
    /// Executor over `procedures`, recording into `tracker`
    #[must_use]
    pub fn new(procedures: &'a dyn ProcedureSource, tracker: &'a mut ReferenceTracker) -> Self {
        Self {
            procedures,
            tracker,
            tasks: Vec::new(),
        }
    }

    /// Clone `source` as described by `step`
    ///
    /// # Errors
    /// Compilation failures of reached types, and execution failures
    pub fn run(mut self, source: &Value, step: &Step) -> CloneResult<Value> {
        let clone = self.materialize(source, step)?;
        self.drain()?;
        Ok(clone)
    }

    /// Clone the object `source` with a given procedure
    ///
    /// # Errors
    /// Returns [`CloneError::Unknown`] if the procedure was compiled for a
    /// different type, plus any failure reached while cloning
    pub fn run_procedure(mut self, procedure: &CloneProcedure, source: &Value) -> CloneResult<Value> {
        let object = match source {
            Value::Null => return Ok(Value::Null),
            Value::Object(object) => object,
            other => {
                return Err(CloneError::unknown(format!(
                    "procedure for '{}' cannot clone a {} value",
                    procedure.type_key(),
                    other.kind_name()
                )))
            }
        };

        let procedure = match procedure.redirect_target() {
            Some(_) => self.procedures.procedure(object.type_key())?,
            None if procedure.type_key() == object.type_key() => procedure.clone(),
            None => {
                return Err(CloneError::unknown(format!(
                    "procedure for '{}' cannot clone an instance of '{}'",
                    procedure.type_key(),
                    object.type_key()
                )))
            }
        };

        let clone = self.object_with(object, procedure)?;
        self.drain()?;
        Ok(clone)
    }

    fn drain(&mut self) -> CloneResult<()> {
        while let Some(task) = self.tasks.pop() {
            self.fill(task)?;
        }
        Ok(())
    }

    fn materialize(&mut self, value: &Value, step: &Step) -> CloneResult<Value> {
        match (step, value) {
            (_, Value::Null) => Ok(Value::Null),
            (Step::Copy, _) if TypeClassifier::is_immutable_value(value) => Ok(value.clone()),
            (Step::Copy | Step::Dynamic, _) => self.dynamic(value),
            (Step::Object, Value::Object(object)) => self.object(object),
            (Step::Array(element), Value::Array(array)) => self.array(array, element),
            (
                Step::Collection {
                    element,
                    value: value_step,
                    ..
                },
                Value::Container(container),
            ) => self.container(container, element, value_step.as_ref()),
            (
                Step::Persistent {
                    kind,
                    element,
                    value: value_step,
                },
                Value::Persistent(persistent),
            ) => self.persistent(persistent, kind, element, value_step.as_ref()),
            (step, value) => Err(CloneError::unknown(format!(
                "{} value does not match {} step",
                value.kind_name(),
                step.name()
            ))),
        }
    }

    fn dynamic(&mut self, value: &Value) -> CloneResult<Value> {
        let dynamic = Arc::new(Step::Dynamic);
        match value {
            Value::Object(object) => self.object(object),
            Value::Array(array) => self.array(array, &dynamic),
            Value::Container(container) => {
                let value_step = container.kind().is_keyed().then(|| Arc::clone(&dynamic));
                self.container(container, &dynamic, value_step.as_ref())
            }
            Value::Persistent(persistent) => {
                let kind = persistent.kind();
                let value_step = kind.is_keyed().then(|| Arc::clone(&dynamic));
                self.persistent(persistent, &kind, &dynamic, value_step.as_ref())
            }
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_) => {
                Ok(value.clone())
            }
        }
    }

    fn object(&mut self, source: &ObjectRef) -> CloneResult<Value> {
        if let Some(existing) = self.tracker.lookup(&Value::from(source)) {
            return Ok(existing);
        }
        let procedure = self.procedures.procedure(source.type_key())?;
        self.object_with(source, procedure)
    }

    fn object_with(&mut self, source: &ObjectRef, procedure: CloneProcedure) -> CloneResult<Value> {
        let source_value = Value::from(source);
        if let Some(existing) = self.tracker.lookup(&source_value) {
            return Ok(existing);
        }
        if procedure.is_identity() {
            return Ok(source_value);
        }
        if procedure.redirect_target().is_some() {
            return Err(CloneError::construction(
                source.type_key(),
                "instances of abstract types cannot be cloned",
            ));
        }

        let target = ObjectRef::new(Arc::clone(procedure.descriptor()));
        let target_value = Value::from(&target);
        self.tracker.register(&source_value, &target_value);
        self.tasks.push(Task::Object {
            source: source.clone(),
            target,
            procedure,
        });
        Ok(target_value)
    }

    fn array(&mut self, source: &ArrayRef, element: &Arc<Step>) -> CloneResult<Value> {
        let source_value = Value::from(source);
        if let Some(existing) = self.tracker.lookup(&source_value) {
            return Ok(existing);
        }

        let target = ArrayRef::with_len(source.len());
        let target_value = Value::from(&target);
        self.tracker.register(&source_value, &target_value);
        self.tasks.push(Task::Array {
            source: source.clone(),
            target,
            element: Arc::clone(element),
        });
        Ok(target_value)
    }

    /// The clone keeps the source's concrete kind; the declared shape only
    /// decided the element steps.
    fn container(
        &mut self,
        source: &ContainerRef,
        element: &Arc<Step>,
        value: Option<&Arc<Step>>,
    ) -> CloneResult<Value> {
        let source_value = Value::from(source);
        if let Some(existing) = self.tracker.lookup(&source_value) {
            return Ok(existing);
        }

        let kind = source.kind();
        if !kind.capabilities().has(Capability::Insert) {
            return Err(CloneError::missing_capability(&kind, Capability::Insert));
        }
        let target = ContainerRef::empty(&kind)?;
        let target_value = Value::from(&target);
        self.tracker.register(&source_value, &target_value);
        self.tasks.push(Task::Container {
            source: source.clone(),
            target,
            element: Arc::clone(element),
            value: value.cloned(),
        });
        Ok(target_value)
    }

    fn persistent(
        &mut self,
        source: &Persistent,
        kind: &ContainerKind,
        element: &Arc<Step>,
        value: Option<&Arc<Step>>,
    ) -> CloneResult<Value> {
        let staging = self.clone_entries(source.entries(), element, value)?;
        Ok(Value::Persistent(Persistent::from_staging(kind, staging)?))
    }

    fn clone_entries(
        &mut self,
        entries: Vec<Entry>,
        element: &Step,
        value: Option<&Arc<Step>>,
    ) -> CloneResult<Vec<Entry>> {
        let mut cloned = Vec::with_capacity(entries.len());
        for entry in entries {
            cloned.push(match (entry, value) {
                (Entry::Element(item), _) => Entry::Element(self.materialize(&item, element)?),
                (Entry::Pair(key, item), Some(value)) => Entry::Pair(
                    self.materialize(&key, element)?,
                    self.materialize(&item, value)?,
                ),
                (Entry::Pair(..), None) => {
                    return Err(CloneError::unknown(
                        "key/value entry met a single-argument container step",
                    ))
                }
            });
        }
        Ok(cloned)
    }

    fn fill(&mut self, task: Task) -> CloneResult<()> {
        match task {
            Task::Object {
                source,
                target,
                procedure,
            } => {
                let fields = source.fields();
                let mut updates = Vec::with_capacity(procedure.members().len());
                for member in procedure.members() {
                    let current = fields.get(member.index()).cloned().unwrap_or_default();
                    updates.push((member.index(), self.materialize(&current, member.step())?));
                }
                target.write_fields(updates)?;
            }
            Task::Array {
                source,
                target,
                element,
            } => {
                let items = source.items();
                let mut cloned = Vec::with_capacity(items.len());
                for item in &items {
                    cloned.push(self.materialize(item, &element)?);
                }
                target.replace_items(cloned)?;
            }
            Task::Container {
                source,
                target,
                element,
                value,
            } => {
                let cloned = self.clone_entries(source.entries(), &element, value.as_ref())?;
                target.insert_all(cloned)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ProcedureCache;
    use crate::compiler::CompileSession;
    use crate::resolver::ConcreteResolver;
    use replica_model::{deep_eq, TypeDescriptor, TypeRef, TypeRegistry};

    struct Procedures {
        registry: TypeRegistry,
        resolver: ConcreteResolver,
        cache: ProcedureCache,
    }

    impl Procedures {
        fn new() -> Self {
            let registry = TypeRegistry::new();
            registry
                .register(
                    TypeDescriptor::composite("Node")
                        .field("value", TypeRef::int())
                        .field("next", TypeRef::named("Node"))
                        .build()
                        .unwrap(),
                )
                .unwrap();
            Self {
                registry,
                resolver: ConcreteResolver::new(),
                cache: ProcedureCache::new(),
            }
        }
    }

    impl ProcedureSource for Procedures {
        fn procedure(&self, key: &TypeKey) -> CloneResult<CloneProcedure> {
            self.cache.get_or_build(key, || {
                CompileSession::new(&self.registry, &self.resolver, &self.cache).run(key)
            })
        }
    }

    #[test]
    fn executor_clones_cycle_through_tracker() {
        let procedures = Procedures::new();
        let node = procedures.registry.instantiate("Node").unwrap();
        node.set("next", &node).unwrap();

        let mut tracker = ReferenceTracker::new();
        let clone = Executor::new(&procedures, &mut tracker)
            .run(&Value::from(&node), &Step::Dynamic)
            .unwrap();
        let clone = clone.as_object().unwrap();

        assert!(clone.get("next").unwrap().same(&Value::from(clone)));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn executor_keeps_array_aliasing() {
        let procedures = Procedures::new();
        let inner = ArrayRef::new(vec![Value::Int(1)]);
        let outer = ArrayRef::new(vec![Value::from(&inner), Value::from(&inner)]);

        let mut tracker = ReferenceTracker::new();
        let clone = Executor::new(&procedures, &mut tracker)
            .run(&Value::from(&outer), &Step::Dynamic)
            .unwrap();

        let items = clone.as_array().unwrap().items();
        assert!(items[0].same(&items[1]));
        assert!(!items[0].same(&Value::from(&inner)));
        assert!(deep_eq(&clone, &outer.into()));
    }

    #[test]
    fn executor_rejects_mismatched_step() {
        let procedures = Procedures::new();
        let mut tracker = ReferenceTracker::new();
        let err = Executor::new(&procedures, &mut tracker)
            .run(&Value::from(ArrayRef::with_len(1)), &Step::Object)
            .unwrap_err();
        assert!(matches!(err, CloneError::Unknown(_)));
    }

    #[test]
    fn executor_copy_step_shares_immutable_values() {
        let procedures = Procedures::new();
        let mut tracker = ReferenceTracker::new();
        let labels = Value::Persistent(Persistent::Set(
            [Value::text("a"), Value::text("b")].into_iter().collect(),
        ));
        let clone = Executor::new(&procedures, &mut tracker)
            .run(&labels, &Step::Copy)
            .unwrap();
        assert!(clone.same(&labels));
        assert!(tracker.is_empty());
    }

    #[test]
    fn executor_copy_step_copies_mutable_values() {
        let procedures = Procedures::new();
        let node = procedures.registry.instantiate("Node").unwrap();
        let list = Value::from(ContainerRef::list([Value::from(&node)]));

        let mut tracker = ReferenceTracker::new();
        let clone = Executor::new(&procedures, &mut tracker)
            .run(&list, &Step::Copy)
            .unwrap();
        assert!(!clone.same(&list));
        let items = clone.as_container().unwrap().values();
        assert!(!items[0].same(&Value::from(&node)));
        assert!(deep_eq(&clone, &list));
    }

    #[test]
    fn executor_keeps_source_container_kind() {
        let procedures = Procedures::new();
        let queue = Value::from(ContainerRef::deque([Value::Int(2), Value::Int(1)]));
        let step = Step::Collection {
            kind: ContainerKind::List,
            element: Arc::new(Step::Copy),
            value: None,
        };

        let mut tracker = ReferenceTracker::new();
        let clone = Executor::new(&procedures, &mut tracker)
            .run(&queue, &step)
            .unwrap();
        assert_eq!(clone.as_container().unwrap().kind(), ContainerKind::Deque);
        assert!(deep_eq(&clone, &queue));
    }
}
