//! Replica Object Model
//!
//! The runtime object model the clone engine operates on: registered types,
//! their member metadata and the values that make up an object graph.
//!
//! # Core Concepts
//!
//! - **`TypeDescriptor`**: per-type metadata with members, access and
//!   cloning directives, built once at registration
//! - **`TypeRegistry`**: concurrent map from type key to descriptor
//! - **`Value`**: scalars, text, shared handles (`ObjectRef`, `ArrayRef`,
//!   `ContainerRef`) and persistent containers
//! - **`deep_eq`**: structural, cycle-aware graph comparison
//!
//! Handles have reference identity. Two handles to the same allocation are
//! the same object; equal contents in different allocations are not.
//!
//! # Example
//!
//! ```rust,ignore
//! use replica_model::prelude::*;
//!
//! let registry = TypeRegistry::new();
//! registry.register(
//!     TypeDescriptor::composite("Point")
//!         .field("x", TypeRef::int())
//!         .field("y", TypeRef::int())
//!         .build()?,
//! )?;
//!
//! let point = registry.instantiate("Point")?;
//! point.set("x", 1)?;
//! point.set("y", 2)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod descriptor;
pub mod equality;
pub mod error;
pub mod handle;
pub mod registry;
pub mod types;
pub mod value;

pub use descriptor::{
    Access, CloneStrategy, Inclusion, MemberDescriptor, TypeDescriptor, TypeDescriptorBuilder,
    TypeKind,
};
pub use equality::deep_eq;
pub use error::{ModelError, ModelResult};
pub use handle::{ArrayRef, Container, ContainerRef, ObjectRef};
pub use registry::TypeRegistry;
pub use types::{Capabilities, Capability, ContainerKind, Primitive, TypeKey, TypeRef};
pub use value::{Entry, GraphValue, Persistent, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building and inspecting object graphs
    pub use crate::descriptor::{CloneStrategy, TypeDescriptor};
    pub use crate::equality::deep_eq;
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::handle::{ArrayRef, ContainerRef, ObjectRef};
    pub use crate::registry::TypeRegistry;
    pub use crate::types::{ContainerKind, TypeKey, TypeRef};
    pub use crate::value::{Entry, GraphValue, Persistent, Value};
}
