//! Collection Strategy Builder
//!
//! Turns array and container member types into clone steps. Capability and
//! mapping problems are reported here, while the owning type compiles, never
//! at clone time.

use crate::compiler::{CompileSession, Step};
use crate::error::{CloneError, CloneResult};
use replica_model::{Capability, ContainerKind, TypeRef};
use std::sync::Arc;

/// Builds [`Step`]s for arrays and containers
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionBuilder;

impl CollectionBuilder {
    /// Clone step for an array or container type
    ///
    /// - arrays copy element-wise into a new array of the same length
    /// - insertion containers resolve abstract shapes, then re-insert
    ///   cloned elements in enumeration order into a container of the
    ///   source's own kind
    /// - persistent containers with immutable arguments get a copy step,
    ///   which aliases them once their entries check out immutable at run
    ///   time; the rest are rebuilt through a staging list
    ///
    /// # Errors
    /// - [`CloneError::UnmappedAbstractType`] for shapes without a mapping
    /// - [`CloneError::MissingContainerCapability`] if the concrete kind
    ///   cannot be counted or inserted into
    /// - [`CloneError::Construction`] for wrong type-argument counts or
    ///   non-collection types
    pub fn build(ty: &TypeRef, session: &mut CompileSession<'_>) -> CloneResult<Step> {
        match ty {
            TypeRef::Array(element) => Ok(Step::Array(Arc::new(session.step_for(element)?))),
            TypeRef::Container(kind, args) => Self::container(ty, kind, args, session),
            other => Err(CloneError::construction(other, "not a collection type")),
        }
    }

    fn container(
        ty: &TypeRef,
        kind: &ContainerKind,
        args: &[TypeRef],
        session: &mut CompileSession<'_>,
    ) -> CloneResult<Step> {
        let target = session.resolver().resolve_container(kind)?;
        let arity = target.arity().unwrap_or(1);
        if args.len() != arity {
            return Err(CloneError::construction(
                ty,
                format!("{target} takes {arity} type argument(s), got {}", args.len()),
            ));
        }

        if target.is_persistent() {
            if args.iter().all(|arg| session.classifier().is_immutable(arg)) {
                return Ok(Step::Copy);
            }
        } else {
            let capabilities = target.capabilities();
            for capability in [Capability::Count, Capability::Insert] {
                if !capabilities.has(capability) {
                    return Err(CloneError::missing_capability(ty, capability));
                }
            }
        }

        let element = Arc::new(session.step_for(&args[0])?);
        let value = match args.get(1) {
            Some(value) => Some(Arc::new(session.step_for(value)?)),
            None => None,
        };

        Ok(if target.is_persistent() {
            Step::Persistent {
                kind: target,
                element,
                value,
            }
        } else {
            Step::Collection {
                kind: target,
                element,
                value,
            }
        })
    }
}
