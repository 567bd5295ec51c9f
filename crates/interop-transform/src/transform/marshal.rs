//! Marshaling decisions.
//!
//! Every use of a native type (a field, a parameter, a return) is mapped on
//! its own: the same `WCHAR*` is a `String` field, a `StringBuilder` buffer
//! parameter, or an opaque `IntPtr` return. Decisions are made on the
//! canonical form, so typedef chains never change the outcome.
//!
//! | Pointee | Parameter | Field | Return |
//! |---|---|---|---|
//! | `void` | `IntPtr` | `IntPtr` | `IntPtr` |
//! | const character | `String` | `String` | `IntPtr` |
//! | character | `StringBuilder` | `String` | `IntPtr` |
//! | struct/union | `Ref` record | typed pointer | `IntPtr` |
//! | anything else | `Ref` element | `IntPtr` | `IntPtr` |

use tracing::debug;

use interop_core::{
    canonical, ArrayLength, BuiltinKind, BuiltinType, CanonicalKind, DefinedType, DiagnosticKind,
    LiteralType, NativeType, ParamDirection,
};

use super::{inline_name, int32, Emitter};
use crate::{CodeAttribute, CodeExpr, CodeTypeRef, ManagedPrimitive};

/// Where a type is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Position {
    /// A parameter with its declared direction.
    Parameter(ParamDirection),
    Field,
    Return,
}

/// The decision for one use of a type.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Marshalled {
    pub ty: CodeTypeRef,
    pub attributes: Vec<CodeAttribute>,
    /// Set when the decision overrides the declared parameter direction.
    pub direction: Option<ParamDirection>,
    /// The value is a wide string, so the owning struct needs a Unicode
    /// character set.
    pub wide_string: bool,
}

impl Marshalled {
    fn plain(ty: CodeTypeRef) -> Self {
        Self {
            ty,
            attributes: Vec::new(),
            direction: None,
            wide_string: false,
        }
    }

    fn opaque() -> Self {
        Self::plain(CodeTypeRef::INT_PTR)
    }

    fn with_attribute(mut self, attribute: CodeAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    fn string(ty: CodeTypeRef, builtin: BuiltinType) -> Self {
        let wide = builtin.kind == BuiltinKind::WChar;
        let mut out = Self::plain(ty).with_attribute(marshal_as(if wide { "LPWStr" } else { "LPStr" }));
        out.wide_string = wide;
        out
    }

    /// Passed by reference; a declared `Out` stays `Out`.
    fn by_reference(mut self, declared: ParamDirection) -> Self {
        self.direction = Some(match declared {
            ParamDirection::Out => ParamDirection::Out,
            ParamDirection::In | ParamDirection::Ref => ParamDirection::Ref,
        });
        self
    }
}

fn marshal_as(unmanaged: &str) -> CodeAttribute {
    CodeAttribute::new("MarshalAs").with_arg(CodeExpr::enum_value("UnmanagedType", unmanaged))
}

impl<'a> Emitter<'a> {
    /// Decide how `ty` is declared at `position`. Inline bodies reached here are
    /// emitted on first use, named after their tag, their typedef, or `hint`.
    pub(crate) fn marshal(&mut self, ty: &'a NativeType, position: Position, hint: &str) -> Marshalled {
        let store = self.store;
        let c = canonical(ty, store);

        match c.kind {
            CanonicalKind::Builtin(b) => self.builtin(b),
            CanonicalKind::Defined(defined) => Marshalled::plain(self.ensure_defined(defined)),
            CanonicalKind::Type(NativeType::Pointer { pointee }) => {
                self.pointer_to(pointee, position, hint)
            }
            CanonicalKind::Type(NativeType::Array {
                element, length, ..
            }) => match position {
                Position::Field => self.fixed_array(element, length.as_ref(), hint),
                // arrays decay to pointers everywhere else
                Position::Parameter(_) => self.pointer_to(element, position, hint),
                Position::Return => Marshalled::opaque(),
            },
            CanonicalKind::Type(NativeType::Struct(r)) => {
                let name = inline_name(&r.name, c.owner, hint);
                Marshalled::plain(self.ensure_record(&name, r, false))
            }
            CanonicalKind::Type(NativeType::Union(r)) => {
                let name = inline_name(&r.name, c.owner, hint);
                Marshalled::plain(self.ensure_record(&name, r, true))
            }
            CanonicalKind::Type(NativeType::Enum(e)) => {
                let name = inline_name(&e.name, c.owner, hint);
                Marshalled::plain(self.ensure_enum(&name, e))
            }
            CanonicalKind::Type(NativeType::FunctionPointer(fp)) => {
                let name = inline_name(&fp.name, c.owner, hint);
                Marshalled::plain(self.ensure_delegate(&name, fp))
            }
            CanonicalKind::Type(_) => Marshalled::opaque(),
            CanonicalKind::Unresolved(name) | CanonicalKind::Cycle(name) => {
                debug!(name, hint, "unresolved type marshalled as IntPtr");
                Marshalled::opaque()
            }
        }
    }

    fn builtin(&self, builtin: BuiltinType) -> Marshalled {
        let primitive = self
            .options
            .primitives
            .get(builtin)
            .unwrap_or(ManagedPrimitive::IntPtr);
        let out = Marshalled::plain(CodeTypeRef::Primitive(primitive));
        // a native bool is one byte; the managed default is four
        if builtin.kind == BuiltinKind::Boolean {
            out.with_attribute(marshal_as("I1"))
        } else {
            out
        }
    }

    fn ensure_defined(&mut self, defined: &'a DefinedType) -> CodeTypeRef {
        match defined {
            DefinedType::Struct(r) => self.ensure_record(&r.name, r, false),
            DefinedType::Union(r) => self.ensure_record(&r.name, r, true),
            DefinedType::Enum(e) => self.ensure_enum(&e.name, e),
        }
    }

    fn pointer_to(&mut self, pointee: &'a NativeType, position: Position, hint: &str) -> Marshalled {
        let store = self.store;
        let pc = canonical(pointee, store);

        match pc.kind {
            CanonicalKind::Builtin(b) if b.is_void() => return Marshalled::opaque(),
            CanonicalKind::Builtin(b) if b.is_character() => {
                return match position {
                    Position::Parameter(_) if pc.is_const => Marshalled::string(CodeTypeRef::String, b),
                    Position::Parameter(_) => Marshalled::string(CodeTypeRef::StringBuilder, b),
                    Position::Field => Marshalled::string(CodeTypeRef::String, b),
                    Position::Return => Marshalled::opaque(),
                };
            }
            CanonicalKind::Unresolved(_) | CanonicalKind::Cycle(_) => return Marshalled::opaque(),
            _ => {}
        }

        if pc.is_record() {
            return match position {
                Position::Parameter(declared) => {
                    let record = self.marshal(pointee, Position::Field, hint);
                    Marshalled::plain(record.ty).by_reference(declared)
                }
                // never inlined, so self-referential members stay finite
                Position::Field => {
                    let record = self.marshal(pointee, Position::Field, hint);
                    Marshalled::plain(CodeTypeRef::pointer(record.ty))
                }
                Position::Return => Marshalled::opaque(),
            };
        }

        match position {
            Position::Parameter(declared) => {
                let element = self.marshal(pointee, Position::Field, hint);
                let by_ref = match element.ty {
                    CodeTypeRef::Primitive(ManagedPrimitive::Void) => Marshalled::opaque(),
                    CodeTypeRef::Primitive(_) => Marshalled {
                        direction: None,
                        wide_string: false,
                        ..element
                    },
                    CodeTypeRef::Named(_) => Marshalled::plain(element.ty),
                    _ => Marshalled::opaque(),
                };
                by_ref.by_reference(declared)
            }
            Position::Field | Position::Return => Marshalled::opaque(),
        }
    }

    /// An in-place array member. Character arrays are fixed strings; the
    /// rest are fixed arrays. Both need a size the runtime can read.
    fn fixed_array(
        &mut self,
        element: &'a NativeType,
        length: Option<&'a ArrayLength>,
        hint: &str,
    ) -> Marshalled {
        let Some(size) = self.size_const(length) else {
            return Marshalled::opaque();
        };

        let store = self.store;
        match canonical(element, store).builtin() {
            Some(b) if b.is_character() => {
                let mut out = Marshalled::plain(CodeTypeRef::String)
                    .with_attribute(marshal_as("ByValTStr").with_named("SizeConst", size));
                out.wide_string = b.kind == BuiltinKind::WChar;
                out
            }
            _ => {
                let element = self.marshal(element, Position::Field, hint);
                Marshalled::plain(CodeTypeRef::array(element.ty))
                    .with_attribute(marshal_as("ByValArray").with_named("SizeConst", size))
            }
        }
    }

    /// `SizeConst` for an array bound: a literal, or a reference to the
    /// constants class. A referenced constant is declared `Int32`.
    fn size_const(&mut self, length: Option<&'a ArrayLength>) -> Option<CodeExpr> {
        match length? {
            ArrayLength::Fixed(n) => i32::try_from(*n).ok().map(int32),
            ArrayLength::Constant(name) => {
                let usable = self
                    .store
                    .find_constant(name)
                    .and_then(|c| c.resolved.as_ref())
                    .and_then(|v| v.narrowed_to(LiteralType::Int32))
                    .is_some();

                if usable {
                    self.array_bounds.insert(name.clone());
                    Some(CodeExpr::ConstantRef {
                        class: self.options.constants_class.clone(),
                        name: name.clone(),
                    })
                } else {
                    self.diagnostics.report(
                        DiagnosticKind::UnresolvedConstant,
                        self.subject.clone(),
                        format!("array bound '{name}' has no usable size; member left as IntPtr"),
                    );
                    None
                }
            }
        }
    }
}
