//! Top-level native declarations.
//!
//! These are the four kinds of entry a declaration store holds: typedefs,
//! defined types (struct/union/enum), constants and procedures. All of them
//! implement [`Declaration`], which gives the store a uniform way to key,
//! compare and walk them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{DeclCategory, DeclKey, EvaluatedValue, NamedType, NativeEnum, NativeRecord, NativeType};

// ============================================================================
// Declaration trait
// ============================================================================

/// Common surface of every store entry.
pub trait Declaration: Clone + fmt::Debug {
    /// Namespace this declaration lives in.
    const CATEGORY: DeclCategory;

    fn name(&self) -> &str;

    fn key(&self) -> DeclKey {
        DeclKey::new(Self::CATEGORY, self.name())
    }

    /// Equality by name-based reference: inline named definitions compare as
    /// references to their names and link state is ignored.
    fn same_content(&self, other: &Self) -> bool;

    /// Visit every root type this declaration carries (typedef target, member
    /// types, parameter and return types).
    fn for_each_type_mut(&mut self, f: &mut dyn FnMut(&mut NativeType));

    /// Visit every named reference anywhere in this declaration.
    fn for_each_named_mut(&mut self, f: &mut dyn FnMut(&mut NamedType)) {
        self.for_each_type_mut(&mut |ty| ty.for_each_named_mut(f));
    }
}

// ============================================================================
// Calling conventions and parameters
// ============================================================================

/// Native calling conventions a procedure or function pointer may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallingConvention {
    /// The platform default.
    #[default]
    Winapi,
    Cdecl,
    StdCall,
    ThisCall,
    FastCall,
}

impl CallingConvention {
    /// Member name on the managed `CallingConvention` enumeration.
    pub const fn managed_name(self) -> &'static str {
        match self {
            CallingConvention::Winapi => "Winapi",
            CallingConvention::Cdecl => "Cdecl",
            CallingConvention::StdCall => "StdCall",
            CallingConvention::ThisCall => "ThisCall",
            CallingConvention::FastCall => "FastCall",
        }
    }
}

impl fmt::Display for CallingConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.managed_name())
    }
}

/// Direction of data flow through a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamDirection {
    #[default]
    In,
    Out,
    Ref,
}

impl ParamDirection {
    pub const fn as_str(self) -> &'static str {
        match self {
            ParamDirection::In => "In",
            ParamDirection::Out => "Out",
            ParamDirection::Ref => "Ref",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeParameter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: NativeType,
    #[serde(default)]
    pub direction: ParamDirection,
}

impl NativeParameter {
    pub fn new(name: impl Into<String>, ty: impl Into<NativeType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
            direction: ParamDirection::In,
        }
    }

    pub fn with_direction(mut self, direction: ParamDirection) -> Self {
        self.direction = direction;
        self
    }

    fn reference_shape(&self) -> Self {
        Self {
            name: self.name.clone(),
            ty: self.ty.reference_shape(),
            direction: self.direction,
        }
    }
}

// ============================================================================
// Typedefs
// ============================================================================

/// `typedef <target> <name>;`. The target may itself be a typedef.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeTypeDef {
    pub name: String,
    pub target: NativeType,
}

impl NativeTypeDef {
    pub fn new(name: impl Into<String>, target: impl Into<NativeType>) -> Self {
        Self {
            name: name.into(),
            target: target.into(),
        }
    }
}

impl Declaration for NativeTypeDef {
    const CATEGORY: DeclCategory = DeclCategory::Typedef;

    fn name(&self) -> &str {
        &self.name
    }

    fn same_content(&self, other: &Self) -> bool {
        self.name == other.name && self.target.reference_shape() == other.target.reference_shape()
    }

    fn for_each_type_mut(&mut self, f: &mut dyn FnMut(&mut NativeType)) {
        f(&mut self.target);
    }
}

// ============================================================================
// Defined types
// ============================================================================

/// A struct, union or enum introduced by its own declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefinedType {
    Struct(NativeRecord),
    Union(NativeRecord),
    Enum(NativeEnum),
}

impl DefinedType {
    pub fn kind_name(&self) -> &'static str {
        match self {
            DefinedType::Struct(_) => "struct",
            DefinedType::Union(_) => "union",
            DefinedType::Enum(_) => "enum",
        }
    }

    pub fn record(&self) -> Option<&NativeRecord> {
        match self {
            DefinedType::Struct(r) | DefinedType::Union(r) => Some(r),
            DefinedType::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&NativeEnum> {
        match self {
            DefinedType::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Member types in declaration order; empty for enums.
    pub fn member_types(&self) -> Vec<&NativeType> {
        self.record()
            .map(|r| r.members.iter().map(|m| &m.ty).collect())
            .unwrap_or_default()
    }

    /// The same definition as an inline type node.
    pub fn to_type(&self) -> NativeType {
        match self {
            DefinedType::Struct(r) => NativeType::Struct(r.clone()),
            DefinedType::Union(r) => NativeType::Union(r.clone()),
            DefinedType::Enum(e) => NativeType::Enum(e.clone()),
        }
    }

    /// Enums declared by this definition, including inline ones in member types.
    pub fn for_each_enum_mut(&mut self, f: &mut dyn FnMut(&mut NativeEnum)) {
        match self {
            DefinedType::Enum(e) => f(e),
            DefinedType::Struct(r) | DefinedType::Union(r) => {
                for member in &mut r.members {
                    member.ty.for_each_enum_mut(f);
                }
            }
        }
    }

    fn reference_shape(&self) -> Self {
        match self {
            DefinedType::Struct(_) | DefinedType::Union(_) => {
                match self.to_type().map_children(&|child| child.reference_shape()) {
                    NativeType::Struct(r) => DefinedType::Struct(r),
                    NativeType::Union(r) => DefinedType::Union(r),
                    _ => self.clone(),
                }
            }
            DefinedType::Enum(_) => self.clone(),
        }
    }
}

impl Declaration for DefinedType {
    const CATEGORY: DeclCategory = DeclCategory::DefinedType;

    fn name(&self) -> &str {
        match self {
            DefinedType::Struct(r) | DefinedType::Union(r) => &r.name,
            DefinedType::Enum(e) => &e.name,
        }
    }

    fn same_content(&self, other: &Self) -> bool {
        self.reference_shape() == other.reference_shape()
    }

    fn for_each_type_mut(&mut self, f: &mut dyn FnMut(&mut NativeType)) {
        if let DefinedType::Struct(r) | DefinedType::Union(r) = self {
            for member in &mut r.members {
                f(&mut member.ty);
            }
        }
    }
}

impl From<DefinedType> for NativeType {
    fn from(defined: DefinedType) -> Self {
        match defined {
            DefinedType::Struct(r) => NativeType::Struct(r),
            DefinedType::Union(r) => NativeType::Union(r),
            DefinedType::Enum(e) => NativeType::Enum(e),
        }
    }
}

// ============================================================================
// Constants
// ============================================================================

/// Where a constant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantKind {
    /// Translated from a `#define`.
    Macro,
    /// An explicit `const` declaration.
    #[default]
    Declared,
}

/// A named constant and its expression as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeConstant {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub kind: ConstantKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<EvaluatedValue>,
}

impl NativeConstant {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: ConstantKind::Declared,
            resolved: None,
        }
    }

    /// A constant translated from a preprocessor macro body.
    pub fn from_macro(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: ConstantKind::Macro,
            ..Self::new(name, body.into().trim())
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

impl Declaration for NativeConstant {
    const CATEGORY: DeclCategory = DeclCategory::Constant;

    fn name(&self) -> &str {
        &self.name
    }

    fn same_content(&self, other: &Self) -> bool {
        self == other
    }

    fn for_each_type_mut(&mut self, _f: &mut dyn FnMut(&mut NativeType)) {}
}

// ============================================================================
// Procedures
// ============================================================================

/// A function prototype.
///
/// `calling_convention` is `None` until a declaration or override names one;
/// `None` means the platform default. `source_module` is what the export
/// lookup learns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeProcedure {
    pub name: String,
    pub return_type: NativeType,
    #[serde(default)]
    pub params: Vec<NativeParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calling_convention: Option<CallingConvention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_module: Option<String>,
}

impl NativeProcedure {
    pub fn new(name: impl Into<String>, return_type: impl Into<NativeType>) -> Self {
        Self {
            name: name.into(),
            return_type: return_type.into(),
            params: Vec::new(),
            calling_convention: None,
            source_module: None,
        }
    }

    pub fn with_param(mut self, param: NativeParameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_calling_convention(mut self, convention: CallingConvention) -> Self {
        self.calling_convention = Some(convention);
        self
    }

    pub fn with_source_module(mut self, module: impl Into<String>) -> Self {
        self.source_module = Some(module.into());
        self
    }

    /// The convention in effect, given the platform default.
    pub fn effective_convention(&self, default: CallingConvention) -> CallingConvention {
        self.calling_convention.unwrap_or(default)
    }

    fn reference_shape(&self) -> Self {
        Self {
            name: self.name.clone(),
            return_type: self.return_type.reference_shape(),
            params: self.params.iter().map(NativeParameter::reference_shape).collect(),
            calling_convention: self.calling_convention,
            source_module: self.source_module.clone(),
        }
    }
}

impl Declaration for NativeProcedure {
    const CATEGORY: DeclCategory = DeclCategory::Procedure;

    fn name(&self) -> &str {
        &self.name
    }

    fn same_content(&self, other: &Self) -> bool {
        self.reference_shape() == other.reference_shape()
    }

    fn for_each_type_mut(&mut self, f: &mut dyn FnMut(&mut NativeType)) {
        f(&mut self.return_type);
        for param in &mut self.params {
            f(&mut param.ty);
        }
    }
}
