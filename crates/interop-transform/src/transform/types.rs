//! Records, enums, delegates and method signatures.

use tracing::trace;

use interop_core::{
    DeclKey, EvaluatedValue, LiteralType, NativeEnum, NativeFunctionPointer, NativeParameter,
    NativeRecord, NativeType,
};

use super::marshal::Position;
use super::{int32, Body, Claim, Emitter, SkippedItem};
use crate::{
    CodeAttribute, CodeExpr, CodeTypeRef, EnumMemberDecl, FieldDecl, ManagedPrimitive, MethodDecl,
    ParamDecl, TypeBody, TypeDecl,
};

impl<'a> Emitter<'a> {
    /// Emit a struct or union once. The name is claimed before members are
    /// visited, so a member that leads back here sees it already declared.
    pub(crate) fn ensure_record(
        &mut self,
        name: &str,
        record: &'a NativeRecord,
        is_union: bool,
    ) -> CodeTypeRef {
        match self.claim(name, Body::Record { record, is_union }) {
            Claim::Fresh(name) => {
                let decl = self.record_decl(&name, record, is_union);
                self.unit.push(decl);
                CodeTypeRef::named(name)
            }
            Claim::Emitted(name) => CodeTypeRef::named(name),
        }
    }

    fn record_decl(&mut self, name: &str, record: &'a NativeRecord, is_union: bool) -> TypeDecl {
        let outer = self.subject.replace(DeclKey::defined(name));
        let mut fields = Vec::with_capacity(record.members.len());
        let mut wide = false;

        for (index, member) in record.members.iter().enumerate() {
            let field_name = if member.name.is_empty() {
                format!("Anonymous{}", index + 1)
            } else {
                member.name.clone()
            };
            let hint = format!("{name}_{field_name}");
            let marshalled = self.marshal(&member.ty, Position::Field, &hint);
            wide |= marshalled.wide_string;

            let mut field = FieldDecl::new(field_name, marshalled.ty);
            if is_union {
                field
                    .attributes
                    .push(CodeAttribute::new("FieldOffset").with_arg(int32(0)));
            }
            field.attributes.extend(marshalled.attributes);
            fields.push(field);
        }
        self.subject = outer;

        let mut layout = CodeAttribute::new("StructLayout").with_arg(CodeExpr::enum_value(
            "LayoutKind",
            if is_union { "Explicit" } else { "Sequential" },
        ));
        if wide {
            layout = layout.with_named("CharSet", CodeExpr::enum_value("CharSet", "Unicode"));
        }

        trace!(name, fields = fields.len(), is_union, "emitted record");
        TypeDecl {
            name: name.to_string(),
            attributes: vec![layout],
            body: TypeBody::Struct { fields },
        }
    }

    /// Emit an enum once. Members whose value never resolved are left out and
    /// listed as skipped.
    pub(crate) fn ensure_enum(&mut self, name: &str, native: &'a NativeEnum) -> CodeTypeRef {
        let name = match self.claim(name, Body::Enum(native)) {
            Claim::Fresh(name) => name,
            Claim::Emitted(name) => return CodeTypeRef::named(name),
        };
        let name = name.as_str();

        let mut values = Vec::with_capacity(native.members.len());
        for member in &native.members {
            match &member.resolved {
                Some(value) => values.push((member.name.as_str(), value)),
                None => self.skipped.push(SkippedItem {
                    subject: DeclKey::defined(name),
                    member: Some(member.name.clone()),
                    reason: "value never resolved".to_string(),
                }),
            }
        }

        let underlying = underlying_type(values.iter().map(|(_, v)| *v));
        let declared_as = underlying.unwrap_or(LiteralType::Int32);
        let members = values
            .into_iter()
            .map(|(member, value)| EnumMemberDecl {
                name: member.to_string(),
                value: value.narrowed_to(declared_as).unwrap_or_else(|| value.clone()),
            })
            .collect();

        self.unit.push(TypeDecl::new(
            name,
            TypeBody::Enum {
                underlying: underlying.and_then(ManagedPrimitive::from_literal),
                members,
            },
        ));
        CodeTypeRef::named(name)
    }

    /// Emit a delegate for a function pointer once.
    pub(crate) fn ensure_delegate(
        &mut self,
        name: &str,
        pointer: &'a NativeFunctionPointer,
    ) -> CodeTypeRef {
        let name = match self.claim(name, Body::Delegate(pointer)) {
            Claim::Fresh(name) => name,
            Claim::Emitted(name) => return CodeTypeRef::named(name),
        };
        let name = name.as_str();

        let signature = self.method(name, &pointer.return_type, &pointer.params);
        let mut decl = TypeDecl::new(name, TypeBody::Delegate(signature));
        if let Some(convention) = pointer
            .calling_convention
            .filter(|c| *c != self.options.default_convention)
        {
            decl.attributes.push(
                CodeAttribute::new("UnmanagedFunctionPointer").with_arg(CodeExpr::enum_value(
                    "CallingConvention",
                    convention.managed_name(),
                )),
            );
        }
        self.unit.push(decl);
        CodeTypeRef::named(name)
    }

    /// A method signature with every parameter and the return marshalled.
    pub(crate) fn method(
        &mut self,
        name: &str,
        return_type: &'a NativeType,
        params: &'a [NativeParameter],
    ) -> MethodDecl {
        let ret = self.marshal(return_type, Position::Return, &format!("{name}_return"));

        let mut decls = Vec::with_capacity(params.len());
        for (index, param) in params.iter().enumerate() {
            let param_name = if param.name.is_empty() {
                format!("param{}", index + 1)
            } else {
                param.name.clone()
            };
            let hint = format!("{name}_{param_name}");
            let marshalled = self.marshal(&param.ty, Position::Parameter(param.direction), &hint);
            decls.push(ParamDecl {
                name: param_name,
                ty: marshalled.ty,
                direction: marshalled.direction.unwrap_or(param.direction),
                attributes: marshalled.attributes,
            });
        }

        MethodDecl {
            name: name.to_string(),
            return_type: ret.ty,
            return_attributes: ret.attributes,
            params: decls,
            attributes: Vec::new(),
        }
    }
}

/// The narrowest of `Int32`, `UInt32`, `Int64`, `UInt64` holding every
/// member; `None` when `Int32` does, since that is the default.
fn underlying_type<'v>(values: impl Iterator<Item = &'v EvaluatedValue>) -> Option<LiteralType> {
    let integers: Vec<i128> = values.filter_map(EvaluatedValue::as_i128).collect();
    let fits = |ty: LiteralType| integers.iter().all(|v| ty.can_hold(*v));

    [
        LiteralType::Int32,
        LiteralType::UInt32,
        LiteralType::Int64,
        LiteralType::UInt64,
    ]
    .into_iter()
    .find(|ty| fits(*ty))
    .or(Some(LiteralType::Int64))
    .filter(|ty| *ty != LiteralType::Int32)
}
