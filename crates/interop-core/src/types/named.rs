//! Named type references.
//!
//! A [`NamedType`] is how a declaration refers to another one before the real
//! definition is known. The reference is a tagged state, never a hidden lookup:
//! it starts [`TypeRef::Unresolved`] and the linking pass moves it to
//! [`TypeRef::Resolved`].

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use super::BuiltinType;
use crate::DeclKey;

bitflags! {
    /// cv-qualifiers written on a named reference.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TypeQualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
    }
}

/// What a resolved reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedTarget {
    /// A typedef or defined type in the store.
    Decl(DeclKey),
    /// A builtin spelled by name (`char`, `unsigned long`).
    Builtin(BuiltinType),
}

/// Resolution state of a named reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum TypeRef {
    #[default]
    Unresolved,
    Resolved(ResolvedTarget),
}

impl TypeRef {
    pub fn is_resolved(&self) -> bool {
        matches!(self, TypeRef::Resolved(_))
    }

    pub fn target(&self) -> Option<&ResolvedTarget> {
        match self {
            TypeRef::Resolved(target) => Some(target),
            TypeRef::Unresolved => None,
        }
    }
}

/// A by-name reference to another type.
///
/// The target is not persisted: a reloaded store keeps the name and relinks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedType {
    pub name: String,
    #[serde(skip)]
    pub target: TypeRef,
    #[serde(default, skip_serializing_if = "TypeQualifiers::is_empty")]
    pub qualifiers: TypeQualifiers,
}

impl NamedType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: TypeRef::Unresolved,
            qualifiers: TypeQualifiers::empty(),
        }
    }

    /// A `const`-qualified reference.
    pub fn constant(name: impl Into<String>) -> Self {
        Self::new(name).with_qualifiers(TypeQualifiers::CONST)
    }

    /// A reference whose target is already known.
    pub fn resolved(name: impl Into<String>, target: ResolvedTarget) -> Self {
        Self {
            target: TypeRef::Resolved(target),
            ..Self::new(name)
        }
    }

    pub fn with_qualifiers(mut self, qualifiers: TypeQualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    pub fn is_const(&self) -> bool {
        self.qualifiers.contains(TypeQualifiers::CONST)
    }

    pub fn is_resolved(&self) -> bool {
        self.target.is_resolved()
    }
}

/// References compare by name and qualifiers; the resolution state is not part
/// of a declaration's content.
impl PartialEq for NamedType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.qualifiers == other.qualifiers
    }
}
