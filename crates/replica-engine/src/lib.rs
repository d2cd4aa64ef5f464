//! Replica Clone Engine
//!
//! Deep cloning for object graphs built on `replica-model`. For each type the
//! engine compiles a reusable clone procedure once, caches it for the life of
//! the process, and runs it with a per-call reference tracker so aliasing and
//! cycles in the source reappear in the copy.
//!
//! # Core Concepts
//!
//! - **`TypeClassifier`**: decides whether a declared type is immutable and
//!   can be shared instead of copied
//! - **`ConcreteResolver`**: maps abstract container shapes and abstract
//!   object types to concrete ones
//! - **`CompileSession`**: compiles a type and the types it reaches into
//!   [`CloneProcedure`]s
//! - **`ProcedureCache`**: build-once, lock-free-read store of procedures
//! - **`ReferenceTracker`**: per-invocation source-to-clone identity map
//! - **`StrategySelector`**: structural copy, identity or serializer fallback
//! - **`Cloner`**: the façade; every failure comes back as a [`CloneError`]
//!
//! # Architecture
//!
//! ```text
//! Cloner ─ StrategySelector ─┬─ identity
//!                            ├─ Executor ── ProcedureCache ── CompileSession
//!                            │      └─ ReferenceTracker          ├─ TypeClassifier
//!                            │                                   ├─ ConcreteResolver
//!                            │                                   └─ CollectionBuilder
//!                            └─ StructuralSerializer
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use replica_engine::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(TypeRegistry::new());
//! registry.register(
//!     TypeDescriptor::composite("Node")
//!         .field("value", TypeRef::int())
//!         .field("next", TypeRef::named("Node"))
//!         .build()?,
//! )?;
//!
//! let node = registry.instantiate("Node")?;
//! node.set("next", &node)?;
//!
//! let cloner = Cloner::new(registry);
//! let copy = cloner.deep_clone(&node)?;
//! assert!(copy.get("next")?.same(&copy.clone().into()));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod classifier;
pub mod cloner;
pub mod collections;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod resolver;
pub mod selector;
pub mod serializer;
pub mod tracker;

pub use cache::{CacheStats, ProcedureCache};
pub use classifier::TypeClassifier;
pub use cloner::{Cloner, ClonerBuilder, DeepCloneExt};
pub use collections::CollectionBuilder;
pub use compiler::{CloneProcedure, Compiled, CompileSession, MemberStep, Step};
pub use config::ClonerConfig;
pub use error::{CloneError, CloneErrorKind, CloneResult, ConfigError};
pub use executor::{Executor, ProcedureSource};
pub use resolver::ConcreteResolver;
pub use selector::{Selection, SelectionReason, Strategy, StrategySelector};
pub use serializer::{JsonGraphSerializer, StructuralSerializer};
pub use tracker::ReferenceTracker;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for cloning object graphs
    pub use crate::cloner::{Cloner, DeepCloneExt};
    pub use crate::config::ClonerConfig;
    pub use crate::error::{CloneError, CloneErrorKind, CloneResult};
    pub use crate::selector::{Selection, Strategy};
    pub use crate::tracker::ReferenceTracker;
    pub use replica_model::prelude::*;
}
