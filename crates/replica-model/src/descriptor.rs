//! Type descriptors and cloning directives
//!
//! A [`TypeDescriptor`] is built once per type at registration and never
//! changes afterwards. It carries the member list, the per-member inclusion
//! directives and the optional per-type strategy directive.

use crate::error::{ModelError, ModelResult};
use crate::types::{TypeKey, TypeRef};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// What a registered type is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Constructible type with members
    Composite,
    /// Interface; instances always have a concrete runtime type
    Abstract,
    /// Wraps a native resource; cannot be introspected or constructed
    Opaque,
}

/// Member read/write eligibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    /// Readable and writable
    #[default]
    ReadWrite,
    /// Set at construction only
    ReadOnly,
}

/// Per-member cloning directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Inclusion {
    /// Member is cloned
    #[default]
    Include,
    /// Member is skipped and left at its default in the clone
    Exclude,
}

/// Per-type strategy directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CloneStrategy {
    /// Walk and rebuild the graph with a compiled procedure
    Structural,
    /// Round-trip through the structural serializer
    Serializer,
}

/// One declared member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescriptor {
    name: Arc<str>,
    ty: TypeRef,
    access: Access,
    inclusion: Inclusion,
}

impl MemberDescriptor {
    /// Create a read/write, included member
    #[must_use]
    pub fn new(name: impl AsRef<str>, ty: TypeRef) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            ty,
            access: Access::ReadWrite,
            inclusion: Inclusion::Include,
        }
    }

    /// Set access
    #[inline]
    #[must_use]
    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    /// Set inclusion directive
    #[inline]
    #[must_use]
    pub fn with_inclusion(mut self, inclusion: Inclusion) -> Self {
        self.inclusion = inclusion;
        self
    }

    /// Member name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared type
    #[inline]
    #[must_use]
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Access
    #[inline]
    #[must_use]
    pub fn access(&self) -> Access {
        self.access
    }

    /// Inclusion directive
    #[inline]
    #[must_use]
    pub fn inclusion(&self) -> Inclusion {
        self.inclusion
    }

    /// Writable after construction
    #[inline]
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.access == Access::ReadWrite
    }

    /// Included and writable: visited by clone procedures
    #[inline]
    #[must_use]
    pub fn participates(&self) -> bool {
        self.inclusion == Inclusion::Include && self.is_writable()
    }

    /// Value a fresh instance holds for this member
    #[inline]
    #[must_use]
    pub fn default_value(&self) -> Value {
        self.ty.default_value()
    }
}

/// Cached per-type metadata
#[derive(Debug)]
pub struct TypeDescriptor {
    key: TypeKey,
    kind: TypeKind,
    members: Vec<MemberDescriptor>,
    index: HashMap<Arc<str>, usize>,
    strategy: Option<CloneStrategy>,
    immutable: bool,
}

impl TypeDescriptor {
    /// Start a composite type
    #[must_use]
    pub fn composite(key: impl Into<TypeKey>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(key.into(), TypeKind::Composite)
    }

    /// Start an abstract (interface) type
    #[must_use]
    pub fn abstract_type(key: impl Into<TypeKey>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(key.into(), TypeKind::Abstract)
    }

    /// Start an opaque native-resource type
    #[must_use]
    pub fn opaque(key: impl Into<TypeKey>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(key.into(), TypeKind::Opaque)
    }

    /// Type key
    #[inline]
    #[must_use]
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// Type kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Members in declaration order
    #[inline]
    #[must_use]
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Number of declared members
    #[inline]
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Position of a member
    #[must_use]
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Member by name
    #[must_use]
    pub fn member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.member_index(name).map(|i| &self.members[i])
    }

    /// Members visited by clone procedures, with their positions
    pub fn participating_members(&self) -> impl Iterator<Item = (usize, &MemberDescriptor)> {
        self.members
            .iter()
            .enumerate()
            .filter(|(_, member)| member.participates())
    }

    /// Strategy directive, if declared
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> Option<CloneStrategy> {
        self.strategy
    }

    /// Classified immutable at registration
    #[inline]
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    /// Has a constructor path
    #[inline]
    #[must_use]
    pub fn is_constructible(&self) -> bool {
        self.kind == TypeKind::Composite
    }

    /// Default member values of a fresh instance
    #[must_use]
    pub fn default_fields(&self) -> Vec<Value> {
        self.members.iter().map(MemberDescriptor::default_value).collect()
    }
}

/// Builder for [`TypeDescriptor`]
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    key: TypeKey,
    kind: TypeKind,
    members: Vec<MemberDescriptor>,
    strategy: Option<CloneStrategy>,
    designated_immutable: bool,
}

impl TypeDescriptorBuilder {
    fn new(key: TypeKey, kind: TypeKind) -> Self {
        Self {
            key,
            kind,
            members: Vec::new(),
            strategy: None,
            designated_immutable: false,
        }
    }

    /// Add a member
    #[must_use]
    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// Add a read/write, included member
    #[must_use]
    pub fn field(self, name: impl AsRef<str>, ty: TypeRef) -> Self {
        self.member(MemberDescriptor::new(name, ty))
    }

    /// Add a read-only member
    #[must_use]
    pub fn read_only(self, name: impl AsRef<str>, ty: TypeRef) -> Self {
        self.member(MemberDescriptor::new(name, ty).with_access(Access::ReadOnly))
    }

    /// Add a member excluded from cloning
    #[must_use]
    pub fn excluded(self, name: impl AsRef<str>, ty: TypeRef) -> Self {
        self.member(MemberDescriptor::new(name, ty).with_inclusion(Inclusion::Exclude))
    }

    /// Declare the cloning strategy
    #[must_use]
    pub fn strategy(mut self, strategy: CloneStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Designate the type immutable regardless of member access
    #[must_use]
    pub fn immutable(mut self) -> Self {
        self.designated_immutable = true;
        self
    }

    /// Finish the descriptor
    ///
    /// # Errors
    /// Returns [`ModelError::DuplicateMember`] if a member name repeats
    pub fn build(self) -> ModelResult<TypeDescriptor> {
        let mut index = HashMap::with_capacity(self.members.len());
        for (i, member) in self.members.iter().enumerate() {
            if index.insert(Arc::clone(&member.name), i).is_some() {
                return Err(ModelError::DuplicateMember {
                    type_key: self.key,
                    member: member.name().to_string(),
                });
            }
        }

        let immutable = match self.kind {
            TypeKind::Composite => {
                self.designated_immutable || !self.members.iter().any(MemberDescriptor::is_writable)
            }
            TypeKind::Abstract | TypeKind::Opaque => false,
        };

        Ok(TypeDescriptor {
            key: self.key,
            kind: self.kind,
            members: self.members,
            index,
            strategy: self.strategy,
            immutable,
        })
    }
}
