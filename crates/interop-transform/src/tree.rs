//! The managed declaration tree.
//!
//! This is the emission contract: a renderer for a concrete managed language
//! walks a [`CodeUnit`] and writes source text. The transform itself never
//! produces text; the `Display` impls here are compact debugging spellings.

use std::fmt;

use interop_core::{EvaluatedValue, ParamDirection};

use crate::ManagedPrimitive;

// ============================================================================
// Type references and expressions
// ============================================================================

/// A managed type as used by a field, parameter or return.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodeTypeRef {
    Primitive(ManagedPrimitive),
    /// A type declared in the same unit.
    Named(String),
    /// A typed pointer, used for self-referential members.
    Pointer(Box<CodeTypeRef>),
    Array(Box<CodeTypeRef>),
    String,
    /// A mutable string buffer the callee writes into.
    StringBuilder,
}

impl CodeTypeRef {
    pub const INT_PTR: CodeTypeRef = CodeTypeRef::Primitive(ManagedPrimitive::IntPtr);
    pub const VOID: CodeTypeRef = CodeTypeRef::Primitive(ManagedPrimitive::Void);

    pub fn named(name: impl Into<String>) -> Self {
        CodeTypeRef::Named(name.into())
    }

    pub fn pointer(pointee: CodeTypeRef) -> Self {
        CodeTypeRef::Pointer(Box::new(pointee))
    }

    pub fn array(element: CodeTypeRef) -> Self {
        CodeTypeRef::Array(Box::new(element))
    }

    pub fn is_int_ptr(&self) -> bool {
        *self == Self::INT_PTR
    }
}

impl fmt::Display for CodeTypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeTypeRef::Primitive(p) => f.write_str(p.name()),
            CodeTypeRef::Named(name) => f.write_str(name),
            CodeTypeRef::Pointer(inner) => write!(f, "{inner}*"),
            CodeTypeRef::Array(inner) => write!(f, "{inner}[]"),
            CodeTypeRef::String => f.write_str("String"),
            CodeTypeRef::StringBuilder => f.write_str("StringBuilder"),
        }
    }
}

/// An initializer or attribute argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CodeExpr {
    Literal(EvaluatedValue),
    /// `LayoutKind.Sequential`
    EnumValue { ty: String, member: String },
    /// `NativeConstants.MAX_PATH`
    ConstantRef { class: String, name: String },
}

impl CodeExpr {
    pub fn enum_value(ty: impl Into<String>, member: impl Into<String>) -> Self {
        CodeExpr::EnumValue {
            ty: ty.into(),
            member: member.into(),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        CodeExpr::Literal(EvaluatedValue::string(value))
    }

    pub fn literal(&self) -> Option<&EvaluatedValue> {
        match self {
            CodeExpr::Literal(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for CodeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeExpr::Literal(v) => write!(f, "{}", v.literal),
            CodeExpr::EnumValue { ty, member } => write!(f, "{ty}.{member}"),
            CodeExpr::ConstantRef { class, name } => write!(f, "{class}.{name}"),
        }
    }
}

// ============================================================================
// Attributes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeArg {
    /// `None` for positional arguments.
    pub name: Option<String>,
    pub value: CodeExpr,
}

/// A metadata attribute: `StructLayout(LayoutKind.Sequential)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CodeAttribute {
    pub name: String,
    pub args: Vec<AttributeArg>,
}

impl CodeAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, value: CodeExpr) -> Self {
        self.args.push(AttributeArg { name: None, value });
        self
    }

    pub fn with_named(mut self, name: impl Into<String>, value: CodeExpr) -> Self {
        self.args.push(AttributeArg {
            name: Some(name.into()),
            value,
        });
        self
    }

    /// First positional argument.
    pub fn positional(&self) -> Option<&CodeExpr> {
        self.args.iter().find(|a| a.name.is_none()).map(|a| &a.value)
    }

    pub fn named_arg(&self, name: &str) -> Option<&CodeExpr> {
        self.args
            .iter()
            .find(|a| a.name.as_deref() == Some(name))
            .map(|a| &a.value)
    }
}

impl fmt::Display for CodeAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if self.args.is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match &arg.name {
                Some(name) => write!(f, "{name} = {}", arg.value)?,
                None => write!(f, "{}", arg.value)?,
            }
        }
        f.write_str(")")
    }
}

/// Find an attribute by name.
pub fn find_attribute<'a>(attributes: &'a [CodeAttribute], name: &str) -> Option<&'a CodeAttribute> {
    attributes.iter().find(|a| a.name == name)
}

// ============================================================================
// Members
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: CodeTypeRef,
    pub attributes: Vec<CodeAttribute>,
    pub initializer: Option<CodeExpr>,
    /// A compile-time constant field.
    pub is_const: bool,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: CodeTypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            attributes: Vec::new(),
            initializer: None,
            is_const: false,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&CodeAttribute> {
        find_attribute(&self.attributes, name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: CodeTypeRef,
    pub direction: ParamDirection,
    pub attributes: Vec<CodeAttribute>,
}

impl ParamDecl {
    pub fn attribute(&self, name: &str) -> Option<&CodeAttribute> {
        find_attribute(&self.attributes, name)
    }
}

/// An external method, or a delegate's invoke signature.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub return_type: CodeTypeRef,
    pub return_attributes: Vec<CodeAttribute>,
    pub params: Vec<ParamDecl>,
    pub attributes: Vec<CodeAttribute>,
}

impl MethodDecl {
    pub fn attribute(&self, name: &str) -> Option<&CodeAttribute> {
        find_attribute(&self.attributes, name)
    }

    pub fn param(&self, name: &str) -> Option<&ParamDecl> {
        self.params.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMemberDecl {
    pub name: String,
    pub value: EvaluatedValue,
}

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TypeBody {
    /// A value type with laid-out fields. Unions are structs with explicit
    /// layout.
    Struct { fields: Vec<FieldDecl> },
    Enum {
        /// `None` means the default 32-bit signed underlying type.
        underlying: Option<ManagedPrimitive>,
        members: Vec<EnumMemberDecl>,
    },
    Delegate(MethodDecl),
    /// A static container for constants or external methods.
    Class {
        fields: Vec<FieldDecl>,
        methods: Vec<MethodDecl>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub attributes: Vec<CodeAttribute>,
    pub body: TypeBody,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, body: TypeBody) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            body,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.body {
            TypeBody::Struct { .. } => "struct",
            TypeBody::Enum { .. } => "enum",
            TypeBody::Delegate(_) => "delegate",
            TypeBody::Class { .. } => "class",
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&CodeAttribute> {
        find_attribute(&self.attributes, name)
    }

    pub fn fields(&self) -> &[FieldDecl] {
        match &self.body {
            TypeBody::Struct { fields } | TypeBody::Class { fields, .. } => fields,
            TypeBody::Enum { .. } | TypeBody::Delegate(_) => &[],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields().iter().find(|f| f.name == name)
    }

    pub fn methods(&self) -> &[MethodDecl] {
        match &self.body {
            TypeBody::Class { methods, .. } => methods,
            _ => &[],
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods().iter().find(|m| m.name == name)
    }

    pub fn enum_members(&self) -> &[EnumMemberDecl] {
        match &self.body {
            TypeBody::Enum { members, .. } => members,
            _ => &[],
        }
    }

    pub fn signature(&self) -> Option<&MethodDecl> {
        match &self.body {
            TypeBody::Delegate(sig) => Some(sig),
            _ => None,
        }
    }
}

/// Everything one transform produced, in emission order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CodeUnit {
    pub types: Vec<TypeDecl>,
}

impl CodeUnit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ty: TypeDecl) {
        self.types.push(ty);
    }

    pub fn find_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TypeDecl> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_display() {
        let attr = CodeAttribute::new("StructLayout")
            .with_arg(CodeExpr::enum_value("LayoutKind", "Sequential"))
            .with_named("CharSet", CodeExpr::enum_value("CharSet", "Unicode"));
        assert_eq!(
            attr.to_string(),
            "StructLayout(LayoutKind.Sequential, CharSet = CharSet.Unicode)"
        );
        assert_eq!(CodeAttribute::new("Flags").to_string(), "Flags");

        let dll = CodeAttribute::new("DllImport")
            .with_arg(CodeExpr::string("kernel32.dll"))
            .with_named("EntryPoint", CodeExpr::string("GetTickCount"));
        assert_eq!(
            dll.to_string(),
            "DllImport(\"kernel32.dll\", EntryPoint = \"GetTickCount\")"
        );
    }

    #[test]
    fn attribute_arguments() {
        let attr = CodeAttribute::new("MarshalAs")
            .with_arg(CodeExpr::enum_value("UnmanagedType", "ByValTStr"))
            .with_named(
                "SizeConst",
                CodeExpr::ConstantRef {
                    class: "NativeConstants".into(),
                    name: "MAX_PATH".into(),
                },
            );
        assert_eq!(
            attr.positional(),
            Some(&CodeExpr::enum_value("UnmanagedType", "ByValTStr"))
        );
        assert_eq!(
            attr.named_arg("SizeConst").map(ToString::to_string).as_deref(),
            Some("NativeConstants.MAX_PATH")
        );
        assert!(attr.named_arg("CharSet").is_none());
    }

    #[test]
    fn type_ref_display() {
        let ty = CodeTypeRef::pointer(CodeTypeRef::named("RecursiveStruct"));
        assert_eq!(ty.to_string(), "RecursiveStruct*");
        assert_eq!(
            CodeTypeRef::array(CodeTypeRef::Primitive(ManagedPrimitive::UInt16)).to_string(),
            "UInt16[]"
        );
        assert!(CodeTypeRef::INT_PTR.is_int_ptr());
    }

    #[test]
    fn accessors_by_body() {
        let s = TypeDecl::new(
            "tagPOINT",
            TypeBody::Struct {
                fields: vec![FieldDecl::new("x", CodeTypeRef::Primitive(ManagedPrimitive::Int32))],
            },
        );
        assert_eq!(s.kind_name(), "struct");
        assert!(s.field("x").is_some());
        assert!(s.methods().is_empty());
        assert!(s.signature().is_none());

        let mut unit = CodeUnit::new();
        unit.push(s);
        assert_eq!(unit.len(), 1);
        assert!(unit.find_type("tagPOINT").is_some());
        assert!(unit.find_type("POINT").is_none());
    }
}
