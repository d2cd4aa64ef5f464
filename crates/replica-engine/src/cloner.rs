//! Cloner façade
//!
//! Public entry point of the engine. Chooses a strategy per value, runs the
//! compiled procedure or the serializer round trip, and turns every failure
//! (panics included) into a [`CloneError`].

use crate::cache::{CacheStats, ProcedureCache};
use crate::compiler::{CloneProcedure, CompileSession, Step};
use crate::config::ClonerConfig;
use crate::error::{unregistered, CloneError, CloneResult};
use crate::executor::{Executor, ProcedureSource};
use crate::resolver::ConcreteResolver;
use crate::selector::{Selection, Strategy, StrategySelector};
use crate::serializer::{JsonGraphSerializer, StructuralSerializer};
use crate::tracker::ReferenceTracker;
use once_cell::sync::Lazy;
use replica_model::{ContainerKind, GraphValue, TypeKey, TypeRegistry, Value};
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

static SHARED: Lazy<Cloner> = Lazy::new(|| Cloner::new(TypeRegistry::global()));

/// Deep-clone engine over one type registry
///
/// Cheap to clone; clones share the procedure cache.
#[derive(Clone)]
pub struct Cloner {
    inner: Arc<ClonerInner>,
}

struct ClonerInner {
    registry: Arc<TypeRegistry>,
    resolver: ConcreteResolver,
    cache: ProcedureCache,
    selector: StrategySelector,
    config: ClonerConfig,
    serializer: Arc<dyn StructuralSerializer>,
}

impl Cloner {
    /// Create cloner with default configuration
    #[must_use]
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::builder(registry).build()
    }

    /// Start building a customised cloner
    #[must_use]
    pub fn builder(registry: Arc<TypeRegistry>) -> ClonerBuilder {
        ClonerBuilder::new(registry)
    }

    /// Process-wide cloner over [`TypeRegistry::global`]
    #[must_use]
    pub fn shared() -> &'static Cloner {
        &SHARED
    }

    /// Registry this cloner compiles against
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.inner.registry
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClonerConfig {
        &self.inner.config
    }

    /// Procedure cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Deep-clone a typed value
    ///
    /// # Errors
    /// Any [`CloneError`]; nothing panics out of this call
    pub fn deep_clone<T: GraphValue>(&self, source: &T) -> CloneResult<T> {
        let clone = self.clone_value(&source.to_value())?;
        T::from_value(clone).map_err(CloneError::from)
    }

    /// Deep-clone a value
    ///
    /// # Errors
    /// Any [`CloneError`]; nothing panics out of this call
    pub fn clone_value(&self, source: &Value) -> CloneResult<Value> {
        self.guard(|| self.inner.clone_value(source))
    }

    /// Deep-clone on the blocking pool and await the result
    ///
    /// # Errors
    /// Any [`CloneError`]; a failed worker, or a call made outside a Tokio
    /// runtime, becomes [`CloneError::Unknown`]
    pub async fn clone_async<T: GraphValue>(&self, source: T) -> CloneResult<T> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| CloneError::unknown(format!("no async runtime: {e}")))?;
        let cloner = self.clone();
        runtime
            .spawn_blocking(move || cloner.deep_clone(&source))
            .await
            .map_err(|e| CloneError::unknown(format!("clone worker failed: {e}")))?
    }

    /// Strategy the façade would use for instances of `key`
    ///
    /// # Errors
    /// [`CloneError::Construction`] if `key` is not registered
    pub fn strategy_for(&self, key: &TypeKey) -> CloneResult<Selection> {
        let descriptor = self
            .inner
            .registry
            .get(key)
            .ok_or_else(|| unregistered(key))?;
        Ok(self.inner.selector.select(&descriptor))
    }

    /// Compiled procedure for `key`, compiling it on first use
    ///
    /// # Errors
    /// The cached compilation failure for `key`
    pub fn procedure(&self, key: &TypeKey) -> CloneResult<CloneProcedure> {
        self.guard(|| self.inner.procedure(key))
    }

    /// Run `procedure` on `source`, recording into a caller-owned tracker
    ///
    /// Sharing one tracker across calls keeps aliasing between several
    /// roots of the same snapshot. The strategy selector is bypassed.
    ///
    /// # Errors
    /// Any [`CloneError`]; nothing panics out of this call
    pub fn invoke(
        &self,
        procedure: &CloneProcedure,
        source: &Value,
        tracker: &mut ReferenceTracker,
    ) -> CloneResult<Value> {
        self.guard(|| Executor::new(&*self.inner, tracker).run_procedure(procedure, source))
    }

    fn guard<R>(&self, op: impl FnOnce() -> CloneResult<R>) -> CloneResult<R> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(op))
            .unwrap_or_else(|payload| Err(CloneError::from_panic(payload.as_ref())));
        if let Err(err) = &outcome {
            tracing::warn!("Clone failed: {}", err);
        }
        outcome
    }
}

impl std::fmt::Debug for Cloner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cloner")
            .field("config", &self.inner.config)
            .field("registered_types", &self.inner.registry.len())
            .field("cache", &self.inner.cache.stats())
            .finish()
    }
}

impl ClonerInner {
    fn clone_value(&self, source: &Value) -> CloneResult<Value> {
        let selection = self.selector.select_value(source);
        tracing::debug!(
            "Cloning {} with {:?} strategy ({:?})",
            describe(source),
            selection.strategy,
            selection.reason
        );

        match selection.strategy {
            Strategy::Identity => Ok(source.clone()),
            Strategy::Structural => {
                let mut tracker = ReferenceTracker::new();
                Executor::new(self, &mut tracker).run(source, &Step::Dynamic)
            }
            Strategy::Serializer => self.round_trip(source),
        }
    }

    fn round_trip(&self, source: &Value) -> CloneResult<Value> {
        let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
            let bytes = self.serializer.serialize(source)?;
            self.serializer.deserialize(&bytes, &self.registry)
        }));
        match attempt {
            Ok(Ok(clone)) => Ok(clone),
            Ok(Err(err @ CloneError::FallbackSerialization(_))) => Err(err),
            Ok(Err(err)) => Err(CloneError::fallback(err.to_string())),
            Err(payload) => Err(CloneError::fallback(
                CloneError::from_panic(payload.as_ref()).to_string(),
            )),
        }
    }
}

impl ProcedureSource for ClonerInner {
    fn procedure(&self, key: &TypeKey) -> CloneResult<CloneProcedure> {
        self.cache.get_or_build(key, || {
            CompileSession::new(&self.registry, &self.resolver, &self.cache).run(key)
        })
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Object(object) => object.type_key().to_string(),
        other => other.kind_name().to_string(),
    }
}

/// Builder for [`Cloner`]
pub struct ClonerBuilder {
    registry: Arc<TypeRegistry>,
    config: ClonerConfig,
    resolver: ConcreteResolver,
    serializer: Option<Arc<dyn StructuralSerializer>>,
}

impl ClonerBuilder {
    fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            config: ClonerConfig::default(),
            resolver: ConcreteResolver::default(),
            serializer: None,
        }
    }

    /// With configuration
    #[must_use]
    pub fn config(mut self, config: ClonerConfig) -> Self {
        self.config = config;
        self
    }

    /// Map an abstract container shape to a concrete kind
    #[must_use]
    pub fn map_container(mut self, shape: ContainerKind, concrete: ContainerKind) -> Self {
        self.resolver.map_container(shape, concrete);
        self
    }

    /// Map an abstract object type to a concrete registered type
    #[must_use]
    pub fn map_type(mut self, abstract_type: impl Into<TypeKey>, concrete: impl Into<TypeKey>) -> Self {
        self.resolver.map_type(abstract_type, concrete);
        self
    }

    /// Replace the fallback serializer
    #[must_use]
    pub fn serializer(mut self, serializer: impl StructuralSerializer + 'static) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> Cloner {
        let serializer = self
            .serializer
            .unwrap_or_else(|| Arc::new(JsonGraphSerializer::new()));
        Cloner {
            inner: Arc::new(ClonerInner {
                registry: self.registry,
                resolver: self.resolver,
                cache: ProcedureCache::new(),
                selector: StrategySelector::new(&self.config),
                config: self.config,
                serializer,
            }),
        }
    }
}

impl std::fmt::Debug for ClonerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClonerBuilder")
            .field("config", &self.config)
            .field("resolver", &self.resolver)
            .field("custom_serializer", &self.serializer.is_some())
            .finish()
    }
}

/// Deep cloning as a method on any graph value
pub trait DeepCloneExt: GraphValue {
    /// Clone with [`Cloner::shared`]
    ///
    /// # Errors
    /// Any [`CloneError`]
    fn deep_clone(&self) -> CloneResult<Self> {
        Cloner::shared().deep_clone(self)
    }

    /// Clone with a specific cloner
    ///
    /// # Errors
    /// Any [`CloneError`]
    fn deep_clone_with(&self, cloner: &Cloner) -> CloneResult<Self> {
        cloner.deep_clone(self)
    }

    /// Clone with [`Cloner::shared`] on the blocking pool
    fn deep_clone_async(self) -> impl Future<Output = CloneResult<Self>> + Send {
        async move { Cloner::shared().clone_async(self).await }
    }
}

impl<T: GraphValue> DeepCloneExt for T {}
