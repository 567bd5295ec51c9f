//! The native type graph.
//!
//! [`NativeType`] is a tree. The only edges that can close a cycle are
//! [`NamedType`] references, which point at other declarations by name and are
//! followed through a [`DeclarationLookup`](crate::DeclarationLookup) with a
//! visited set (see [`crate::graph`]). Structural helpers here never follow
//! references, so they always terminate.

mod builtin;
mod composite;
mod named;

pub use builtin::{BuiltinKind, BuiltinType};
pub use composite::{
    ArrayLength, EnumMember, NativeEnum, NativeFunctionPointer, NativeMember, NativeRecord,
};
pub use named::{NamedType, ResolvedTarget, TypeQualifiers, TypeRef};

use serde::{Deserialize, Serialize};

use crate::NativeTypeDef;

fn default_rank() -> u32 {
    1
}

/// A node in the native type graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum NativeType {
    Builtin(BuiltinType),
    Pointer {
        pointee: Box<NativeType>,
    },
    Array {
        element: Box<NativeType>,
        #[serde(default = "default_rank")]
        rank: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        length: Option<ArrayLength>,
    },
    /// An inline alias; its target may itself be an alias.
    TypeDef(Box<NativeTypeDef>),
    Named(NamedType),
    Struct(NativeRecord),
    Union(NativeRecord),
    Enum(NativeEnum),
    FunctionPointer(NativeFunctionPointer),
}

impl NativeType {
    pub fn builtin(kind: BuiltinKind) -> Self {
        NativeType::Builtin(BuiltinType::new(kind))
    }

    pub fn unsigned(kind: BuiltinKind) -> Self {
        NativeType::Builtin(BuiltinType::unsigned(kind))
    }

    pub fn void() -> Self {
        NativeType::Builtin(BuiltinType::VOID)
    }

    pub fn pointer(pointee: impl Into<NativeType>) -> Self {
        NativeType::Pointer {
            pointee: Box::new(pointee.into()),
        }
    }

    pub fn array(element: impl Into<NativeType>, length: Option<ArrayLength>) -> Self {
        NativeType::Array {
            element: Box::new(element.into()),
            rank: 1,
            length,
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        NativeType::Named(NamedType::new(name))
    }

    pub fn structure(record: NativeRecord) -> Self {
        NativeType::Struct(record)
    }

    pub fn union(record: NativeRecord) -> Self {
        NativeType::Union(record)
    }

    /// The declared name of a naming node (typedef, reference, struct, union,
    /// enum, function pointer). Anonymous bodies return `None`.
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            NativeType::TypeDef(td) => td.name.as_str(),
            NativeType::Named(n) => n.name.as_str(),
            NativeType::Struct(r) | NativeType::Union(r) => r.name.as_str(),
            NativeType::Enum(e) => e.name.as_str(),
            NativeType::FunctionPointer(fp) => fp.name.as_str(),
            NativeType::Builtin(_) | NativeType::Pointer { .. } | NativeType::Array { .. } => {
                return None;
            }
        };
        (!name.is_empty()).then_some(name)
    }

    /// Human-readable C-like spelling, used in diagnostics and printers.
    pub fn display_name(&self) -> String {
        match self {
            NativeType::Builtin(b) => b.c_name().to_string(),
            NativeType::Pointer { pointee } => format!("{}*", pointee.display_name()),
            NativeType::Array {
                element, length, ..
            } => match length {
                Some(ArrayLength::Fixed(n)) => format!("{}[{n}]", element.display_name()),
                Some(ArrayLength::Constant(c)) => format!("{}[{c}]", element.display_name()),
                None => format!("{}[]", element.display_name()),
            },
            NativeType::Named(n) if n.is_const() => format!("const {}", n.name),
            NativeType::Struct(r) if r.is_anonymous() => "<anonymous struct>".to_string(),
            NativeType::Union(r) if r.is_anonymous() => "<anonymous union>".to_string(),
            NativeType::Enum(e) if e.name.is_empty() => "<anonymous enum>".to_string(),
            NativeType::FunctionPointer(fp) if fp.name.is_empty() => "<function pointer>".to_string(),
            other => other.name().unwrap_or_default().to_string(),
        }
    }

    /// Direct structural children. Named references are leaves.
    pub fn children(&self) -> Vec<&NativeType> {
        match self {
            NativeType::Pointer { pointee } => vec![pointee.as_ref()],
            NativeType::Array { element, .. } => vec![element.as_ref()],
            NativeType::TypeDef(td) => vec![&td.target],
            NativeType::Struct(r) | NativeType::Union(r) => {
                r.members.iter().map(|m| &m.ty).collect()
            }
            NativeType::FunctionPointer(fp) => std::iter::once(fp.return_type.as_ref())
                .chain(fp.params.iter().map(|p| &p.ty))
                .collect(),
            NativeType::Builtin(_) | NativeType::Named(_) | NativeType::Enum(_) => Vec::new(),
        }
    }

    /// Pre-order walk over this tree, not following named references.
    pub fn visit(&self, f: &mut dyn FnMut(&NativeType)) {
        f(self);
        for child in self.children() {
            child.visit(f);
        }
    }

    /// Mutable pre-order walk over this tree, not following named references.
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut NativeType)) {
        f(self);
        match self {
            NativeType::Pointer { pointee } => pointee.visit_mut(f),
            NativeType::Array { element, .. } => element.visit_mut(f),
            NativeType::TypeDef(td) => td.target.visit_mut(f),
            NativeType::Struct(r) | NativeType::Union(r) => {
                for member in &mut r.members {
                    member.ty.visit_mut(f);
                }
            }
            NativeType::FunctionPointer(fp) => {
                fp.return_type.visit_mut(f);
                for param in &mut fp.params {
                    param.ty.visit_mut(f);
                }
            }
            NativeType::Builtin(_) | NativeType::Named(_) | NativeType::Enum(_) => {}
        }
    }

    /// Every named reference in this tree.
    pub fn named_references(&self) -> Vec<&NamedType> {
        let mut out = Vec::new();
        self.collect_named(&mut out);
        out
    }

    fn collect_named<'a>(&'a self, out: &mut Vec<&'a NamedType>) {
        if let NativeType::Named(n) = self {
            out.push(n);
        }
        for child in self.children() {
            child.collect_named(out);
        }
    }

    /// Apply `f` to every named reference in this tree.
    pub fn for_each_named_mut(&mut self, f: &mut dyn FnMut(&mut NamedType)) {
        self.visit_mut(&mut |node| {
            if let NativeType::Named(n) = node {
                f(n);
            }
        });
    }

    /// Apply `f` to every inline enum in this tree.
    pub fn for_each_enum_mut(&mut self, f: &mut dyn FnMut(&mut NativeEnum)) {
        self.visit_mut(&mut |node| {
            if let NativeType::Enum(e) = node {
                f(e);
            }
        });
    }

    /// The same type with every named inline typedef, struct, union and enum
    /// replaced by a bare reference to its name, and every reference unlinked.
    /// Function pointer signatures are kept inline.
    ///
    /// Two graphs are equal "by name-based reference" when their shapes are.
    pub fn reference_shape(&self) -> NativeType {
        match self {
            NativeType::TypeDef(_)
            | NativeType::Struct(_)
            | NativeType::Union(_)
            | NativeType::Enum(_)
                if self.name().is_some() =>
            {
                NativeType::named(self.name().unwrap_or_default())
            }
            NativeType::Named(n) => {
                NativeType::Named(NamedType::new(n.name.clone()).with_qualifiers(n.qualifiers))
            }
            other => other.map_children(&|child| child.reference_shape()),
        }
    }

    /// Rebuild this node with `f` applied to each structural child.
    pub fn map_children(&self, f: &dyn Fn(&NativeType) -> NativeType) -> NativeType {
        match self {
            NativeType::Pointer { pointee } => NativeType::Pointer {
                pointee: Box::new(f(pointee)),
            },
            NativeType::Array {
                element,
                rank,
                length,
            } => NativeType::Array {
                element: Box::new(f(element)),
                rank: *rank,
                length: length.clone(),
            },
            NativeType::TypeDef(td) => NativeType::TypeDef(Box::new(NativeTypeDef {
                name: td.name.clone(),
                target: f(&td.target),
            })),
            NativeType::Struct(r) => NativeType::Struct(map_record(r, f)),
            NativeType::Union(r) => NativeType::Union(map_record(r, f)),
            NativeType::FunctionPointer(fp) => {
                let mut mapped = fp.clone();
                mapped.return_type = Box::new(f(&fp.return_type));
                for (param, original) in mapped.params.iter_mut().zip(&fp.params) {
                    param.ty = f(&original.ty);
                }
                NativeType::FunctionPointer(mapped)
            }
            NativeType::Builtin(_) | NativeType::Named(_) | NativeType::Enum(_) => self.clone(),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, NativeType::Builtin(b) if b.is_void())
    }
}

fn map_record(record: &NativeRecord, f: &dyn Fn(&NativeType) -> NativeType) -> NativeRecord {
    NativeRecord {
        name: record.name.clone(),
        members: record
            .members
            .iter()
            .map(|m| NativeMember::new(m.name.clone(), f(&m.ty)))
            .collect(),
    }
}

impl From<BuiltinType> for NativeType {
    fn from(builtin: BuiltinType) -> Self {
        NativeType::Builtin(builtin)
    }
}

impl From<BuiltinKind> for NativeType {
    fn from(kind: BuiltinKind) -> Self {
        NativeType::builtin(kind)
    }
}

impl From<NamedType> for NativeType {
    fn from(named: NamedType) -> Self {
        NativeType::Named(named)
    }
}

impl From<NativeTypeDef> for NativeType {
    fn from(td: NativeTypeDef) -> Self {
        NativeType::TypeDef(Box::new(td))
    }
}

impl From<NativeEnum> for NativeType {
    fn from(e: NativeEnum) -> Self {
        NativeType::Enum(e)
    }
}

impl From<NativeFunctionPointer> for NativeType {
    fn from(fp: NativeFunctionPointer) -> Self {
        NativeType::FunctionPointer(fp)
    }
}
