//! Clone-Plan Compiler
//!
//! Compiles a registered type into a [`CloneProcedure`]: an immutable plan
//! of per-member [`Step`]s that the executor walks. A [`CompileSession`]
//! compiles the requested type together with every not-yet-cached type its
//! members name, so declaration problems surface before any value is copied.
//!
//! # Recursive types
//!
//! A type already being compiled higher up the session stack is not entered
//! again. The member that names it gets a runtime-dispatched [`Step::Object`]
//! and the dependency is remembered; if the type later fails, everything
//! that depended on it is discarded instead of published.

use crate::cache::ProcedureCache;
use crate::classifier::TypeClassifier;
use crate::collections::CollectionBuilder;
use crate::error::{unregistered, CloneError, CloneResult};
use crate::resolver::ConcreteResolver;
use replica_model::{ContainerKind, TypeDescriptor, TypeKey, TypeKind, TypeRef, TypeRegistry};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// How one value is cloned
#[derive(Debug, Clone)]
pub enum Step {
    /// Pass immutable values through; mutable ones are handled by their
    /// runtime shape
    Copy,
    /// Clone an object with the procedure of its runtime type
    Object,
    /// Derive handling from the runtime value
    Dynamic,
    /// New array of the same length, elements cloned
    Array(Arc<Step>),
    /// New insertion container of the source's kind, entries cloned in order
    Collection {
        /// Resolved kind of the declared shape
        kind: ContainerKind,
        /// Element step, or key step for keyed kinds
        element: Arc<Step>,
        /// Value step for keyed kinds
        value: Option<Arc<Step>>,
    },
    /// Persistent container rebuilt through a staging list
    Persistent {
        /// Persistent kind of the clone
        kind: ContainerKind,
        /// Element step, or key step for keyed kinds
        element: Arc<Step>,
        /// Value step for keyed kinds
        value: Option<Arc<Step>>,
    },
}

impl Step {
    /// Short name for diagnostics
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Object => "object",
            Self::Dynamic => "dynamic",
            Self::Array(_) => "array",
            Self::Collection { .. } => "collection",
            Self::Persistent { .. } => "persistent",
        }
    }
}

/// Step for one participating member
#[derive(Debug, Clone)]
pub struct MemberStep {
    index: usize,
    name: Arc<str>,
    step: Step,
}

impl MemberStep {
    /// Position in the descriptor's member list
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Member name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clone step
    #[inline]
    #[must_use]
    pub fn step(&self) -> &Step {
        &self.step
    }
}

#[derive(Debug)]
enum Plan {
    Identity,
    Redirect(TypeKey),
    Construct(Vec<MemberStep>),
}

#[derive(Debug)]
struct ProcedureInner {
    descriptor: Arc<TypeDescriptor>,
    plan: Plan,
}

/// Compiled clone plan for one type
///
/// Immutable and cheap to clone; safe to run from many threads at once.
#[derive(Debug, Clone)]
pub struct CloneProcedure(Arc<ProcedureInner>);

impl CloneProcedure {
    pub(crate) fn identity(descriptor: Arc<TypeDescriptor>) -> Self {
        Self::with_plan(descriptor, Plan::Identity)
    }

    pub(crate) fn redirect(descriptor: Arc<TypeDescriptor>, concrete: TypeKey) -> Self {
        Self::with_plan(descriptor, Plan::Redirect(concrete))
    }

    pub(crate) fn construct(descriptor: Arc<TypeDescriptor>, members: Vec<MemberStep>) -> Self {
        Self::with_plan(descriptor, Plan::Construct(members))
    }

    fn with_plan(descriptor: Arc<TypeDescriptor>, plan: Plan) -> Self {
        Self(Arc::new(ProcedureInner { descriptor, plan }))
    }

    /// Type this procedure was compiled for
    #[inline]
    #[must_use]
    pub fn type_key(&self) -> &TypeKey {
        self.0.descriptor.key()
    }

    /// Descriptor of that type
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.0.descriptor
    }

    /// Returns the source unchanged
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        matches!(self.0.plan, Plan::Identity)
    }

    /// Concrete type an abstract type's procedure delegates to
    #[must_use]
    pub fn redirect_target(&self) -> Option<&TypeKey> {
        match &self.0.plan {
            Plan::Redirect(key) => Some(key),
            _ => None,
        }
    }

    /// Member steps, in declaration order; empty unless constructing
    #[must_use]
    pub fn members(&self) -> &[MemberStep] {
        match &self.0.plan {
            Plan::Construct(members) => members,
            _ => &[],
        }
    }

    /// Same compiled procedure
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Outcome of compiling one type
pub type Compiled = (TypeKey, CloneResult<CloneProcedure>);

struct Frame {
    key: TypeKey,
    waits_on: HashSet<TypeKey>,
}

/// One compilation pass
///
/// Reads published entries from the cache but never writes to it; the
/// cache publishes [`CompileSession::finish`] output.
pub struct CompileSession<'a> {
    registry: &'a TypeRegistry,
    resolver: &'a ConcreteResolver,
    cache: &'a ProcedureCache,
    frames: Vec<Frame>,
    finished: HashMap<TypeKey, CloneResult<CloneProcedure>>,
    waits: HashMap<TypeKey, HashSet<TypeKey>>,
}

impl<'a> CompileSession<'a> {
    /// Create session
    #[must_use]
    pub fn new(
        registry: &'a TypeRegistry,
        resolver: &'a ConcreteResolver,
        cache: &'a ProcedureCache,
    ) -> Self {
        Self {
            registry,
            resolver,
            cache,
            frames: Vec::new(),
            finished: HashMap::new(),
            waits: HashMap::new(),
        }
    }

    /// Compile `root` and return every outcome safe to publish
    #[must_use]
    pub fn run(mut self, root: &TypeKey) -> Vec<Compiled> {
        // The root's outcome is recorded in `finished` either way.
        let _ = self.compile(root);
        self.finish()
    }

    /// Compile one type, reusing published and session results
    ///
    /// # Errors
    /// The type's compilation failure, or that of a member type it needs
    pub fn compile(&mut self, key: &TypeKey) -> CloneResult<CloneProcedure> {
        self.require(key)?;
        self.lookup(key).unwrap_or_else(|| {
            Err(CloneError::unknown(format!(
                "procedure for '{key}' is still being compiled"
            )))
        })
    }

    /// Outcomes to publish
    ///
    /// Failures are always kept. A success that relied on a type still being
    /// compiled at the time, or on another success that did, is dropped if
    /// that type failed.
    #[must_use]
    pub fn finish(self) -> Vec<Compiled> {
        let mut discarded: HashSet<TypeKey> = self
            .finished
            .iter()
            .filter(|(_, outcome)| outcome.is_err())
            .map(|(key, _)| key.clone())
            .collect();

        loop {
            let tainted: Vec<TypeKey> = self
                .waits
                .iter()
                .filter(|(key, deps)| {
                    !discarded.contains(*key) && deps.iter().any(|dep| discarded.contains(dep))
                })
                .map(|(key, _)| key.clone())
                .collect();
            if tainted.is_empty() {
                break;
            }
            discarded.extend(tainted);
        }

        self.finished
            .into_iter()
            .filter(|(key, outcome)| outcome.is_err() || !discarded.contains(key))
            .collect()
    }

    pub(crate) fn resolver(&self) -> &ConcreteResolver {
        self.resolver
    }

    pub(crate) fn classifier(&self) -> TypeClassifier<'a> {
        TypeClassifier::new(self.registry)
    }

    /// Step for a member of declared type `ty`
    pub(crate) fn step_for(&mut self, ty: &TypeRef) -> CloneResult<Step> {
        match ty {
            TypeRef::Primitive(_) | TypeRef::Text => Ok(Step::Copy),
            TypeRef::Any => Ok(Step::Dynamic),
            TypeRef::Named(key) => {
                self.require(key)?;
                Ok(Step::Object)
            }
            TypeRef::Array(_) | TypeRef::Container(..) => CollectionBuilder::build(ty, self),
        }
    }

    fn lookup(&self, key: &TypeKey) -> Option<CloneResult<CloneProcedure>> {
        self.cache
            .peek(key)
            .or_else(|| self.finished.get(key).cloned())
    }

    fn require(&mut self, key: &TypeKey) -> CloneResult<()> {
        if let Some(outcome) = self.lookup(key) {
            // A session result that relied on an unfinished type may still be
            // discarded; whoever uses it shares that fate.
            if outcome.is_ok() && self.waits.contains_key(key) {
                for frame in &mut self.frames {
                    frame.waits_on.insert(key.clone());
                }
            }
            return outcome.map(|_| ());
        }

        if let Some(pos) = self.frames.iter().position(|frame| &frame.key == key) {
            for frame in &mut self.frames[pos + 1..] {
                frame.waits_on.insert(key.clone());
            }
            return Ok(());
        }

        tracing::debug!("Compiling clone procedure for {}", key);
        self.frames.push(Frame {
            key: key.clone(),
            waits_on: HashSet::new(),
        });
        let outcome = self.build(key);
        if let Some(frame) = self.frames.pop() {
            if !frame.waits_on.is_empty() {
                self.waits.insert(key.clone(), frame.waits_on);
            }
        }

        if let Err(err) = &outcome {
            tracing::debug!("Compilation of {} failed: {}", key, err);
        }
        self.finished.insert(key.clone(), outcome.clone());
        outcome.map(|_| ())
    }

    fn build(&mut self, key: &TypeKey) -> CloneResult<CloneProcedure> {
        let descriptor = self.registry.get(key).ok_or_else(|| unregistered(key))?;

        match descriptor.kind() {
            TypeKind::Opaque => Err(CloneError::construction(
                key,
                "opaque native resource; exclude members of this type from cloning",
            )),
            TypeKind::Abstract => {
                let concrete = self.resolver.resolve_type(key)?;
                self.require(&concrete)?;
                Ok(CloneProcedure::redirect(descriptor, concrete))
            }
            TypeKind::Composite if descriptor.is_immutable() => {
                Ok(CloneProcedure::identity(descriptor))
            }
            TypeKind::Composite => {
                let mut members = Vec::new();
                for (index, member) in descriptor.participating_members() {
                    let step = self.step_for(member.ty())?;
                    members.push(MemberStep {
                        index,
                        name: Arc::from(member.name()),
                        step,
                    });
                }
                Ok(CloneProcedure::construct(descriptor, members))
            }
        }
    }
}
