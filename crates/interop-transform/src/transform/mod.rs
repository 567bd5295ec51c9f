//! The declaration transform.
//!
//! Walks a committed store and builds a [`CodeUnit`]:
//!
//! - every struct and union becomes a value type with one field per member
//! - every enum becomes an enum with its evaluated member values
//! - every named function pointer becomes a delegate
//! - resolved constants become fields of the constants class
//! - procedures become external methods of the methods class
//!
//! Types are emitted once, by name. A type's name is claimed before its
//! members are marshalled, so cycles through pointers end at a by-name
//! reference. Typedefs and defined types live in separate namespaces, so two
//! different bodies can want the same name; the later one gets a numbered
//! suffix (`X_2`) and a [`DiagnosticKind::RenamedType`] warning.

mod marshal;
mod types;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, warn};

use interop_core::{
    canonical, CanonicalKind, DeclKey, Declaration, DefinedType, DiagnosticKind, Diagnostics,
    EvaluatedValue, Literal, LiteralType, NativeEnum, NativeFunctionPointer, NativeProcedure,
    NativeRecord, NativeType,
};
use interop_store::DeclarationStore;

use crate::{
    CodeAttribute, CodeExpr, CodeTypeRef, CodeUnit, FieldDecl, ManagedPrimitive, TypeBody,
    TypeDecl, TransformOptions,
};

/// Something present in the store that has no counterpart in the output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    pub subject: DeclKey,
    /// Enum member name, when only one member was left out.
    pub member: Option<String>,
    pub reason: String,
}

/// Result of one transform.
#[derive(Debug, Default)]
pub struct TransformOutput {
    pub unit: CodeUnit,
    pub diagnostics: Diagnostics,
    pub skipped: Vec<SkippedItem>,
}

/// Builds the managed declaration tree from a resolved store.
///
/// A partially resolved store is fine: unresolved references become `IntPtr`
/// and unevaluated constants are skipped.
///
/// ```
/// use interop_core::{BuiltinKind, NativeParameter, NativeProcedure, NativeType};
/// use interop_store::DeclarationStore;
/// use interop_transform::{printer, DeclarationTransform};
///
/// let mut store = DeclarationStore::new();
/// store.add_procedure(
///     NativeProcedure::new("Beep", BuiltinKind::Int32)
///         .with_param(NativeParameter::new("freq", NativeType::unsigned(BuiltinKind::Int32)))
///         .with_source_module("kernel32.dll"),
/// );
/// store.commit();
///
/// let output = DeclarationTransform::default().transform(&store);
/// let methods = output.unit.find_type("NativeMethods").unwrap();
/// assert_eq!(
///     printer::signature(&methods.methods()[0]),
///     "Beep(In UInt32) As Int32"
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct DeclarationTransform {
    options: TransformOptions,
}

impl DeclarationTransform {
    pub fn new(options: TransformOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn transform(&self, store: &DeclarationStore) -> TransformOutput {
        if store.has_pending() {
            warn!(
                pending = store.pending_count(),
                "transforming with uncommitted declarations; they are not visible"
            );
        }

        let mut emitter = Emitter::new(store, &self.options);
        emitter.defined_types();
        emitter.typedefs();
        let methods = emitter.methods_class();
        let constants = emitter.constants_class();
        emitter.unit.types.extend(constants);
        emitter.unit.types.extend(methods);

        debug!(
            types = emitter.unit.len(),
            skipped = emitter.skipped.len(),
            warnings = emitter.diagnostics.warning_count(),
            "transform complete"
        );

        TransformOutput {
            unit: emitter.unit,
            diagnostics: emitter.diagnostics,
            skipped: emitter.skipped,
        }
    }
}

/// The body a managed type name was claimed for.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Body<'a> {
    Record { record: &'a NativeRecord, is_union: bool },
    Enum(&'a NativeEnum),
    Delegate(&'a NativeFunctionPointer),
}

impl Body<'_> {
    /// Same declaration, or an identical copy of it.
    fn same_as(&self, other: &Body<'_>) -> bool {
        match (self, other) {
            (
                Body::Record { record: a, is_union: ua },
                Body::Record { record: b, is_union: ub },
            ) => ua == ub && (std::ptr::eq(*a, *b) || a == b),
            (Body::Enum(a), Body::Enum(b)) => std::ptr::eq(*a, *b) || a == b,
            (Body::Delegate(a), Body::Delegate(b)) => std::ptr::eq(*a, *b) || a == b,
            _ => false,
        }
    }
}

/// Outcome of claiming a type name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Claim {
    /// Newly reserved; the caller emits the declaration.
    Fresh(String),
    /// This body already owns the name.
    Emitted(String),
}

/// State for one transform run.
pub(crate) struct Emitter<'a> {
    store: &'a DeclarationStore,
    options: &'a TransformOptions,
    unit: CodeUnit,
    claimed: FxHashMap<String, Body<'a>>,
    /// Constants used as array bounds; they are declared `Int32`.
    array_bounds: FxHashSet<String>,
    /// The record being emitted, for diagnostics.
    subject: Option<DeclKey>,
    diagnostics: Diagnostics,
    skipped: Vec<SkippedItem>,
}

impl<'a> Emitter<'a> {
    fn new(store: &'a DeclarationStore, options: &'a TransformOptions) -> Self {
        Self {
            store,
            options,
            unit: CodeUnit::new(),
            claimed: FxHashMap::default(),
            array_bounds: FxHashSet::default(),
            subject: None,
            diagnostics: Diagnostics::new(),
            skipped: Vec::new(),
        }
    }

    /// Reserve a type name for `body`. A name held by a different body moves
    /// the claim on to `name_2`, `name_3`, ... until a free name or one this
    /// body already holds is found, so every use of a body lands on one name.
    fn claim(&mut self, name: &str, body: Body<'a>) -> Claim {
        let mut candidate = name.to_string();
        let mut suffix = 1;
        loop {
            match self.claimed.get(&candidate) {
                Some(held) if held.same_as(&body) => return Claim::Emitted(candidate),
                Some(_) => {
                    suffix += 1;
                    candidate = format!("{name}_{suffix}");
                }
                None => break,
            }
        }

        if suffix > 1 {
            warn!(name, renamed = %candidate, "type name already taken by a different body");
            self.diagnostics.report(
                DiagnosticKind::RenamedType,
                Some(DeclKey::defined(name)),
                format!("'{name}' already names a different type; emitted as '{candidate}'"),
            );
        }
        self.claimed.insert(candidate.clone(), body);
        Claim::Fresh(candidate)
    }

    fn defined_types(&mut self) {
        let store = self.store;
        for defined in store.defined_types() {
            match defined {
                DefinedType::Struct(r) => self.ensure_record(&r.name, r, false),
                DefinedType::Union(r) => self.ensure_record(&r.name, r, true),
                DefinedType::Enum(e) => self.ensure_enum(&e.name, e),
            };
        }
    }

    /// Typedefs whose target is a body (struct, union, enum, function
    /// pointer). Plain aliases emit nothing: uses see the aliased type.
    fn typedefs(&mut self) {
        let store = self.store;
        for typedef in store.typedefs() {
            let c = canonical(&typedef.target, store);
            let CanonicalKind::Type(body) = c.kind else {
                continue;
            };
            let name = |tag: &str| inline_name(tag, c.owner, &typedef.name);
            match body {
                NativeType::Struct(r) => {
                    self.ensure_record(&name(&r.name), r, false);
                }
                NativeType::Union(r) => {
                    self.ensure_record(&name(&r.name), r, true);
                }
                NativeType::Enum(e) => {
                    self.ensure_enum(&name(&e.name), e);
                }
                NativeType::FunctionPointer(fp) => {
                    self.ensure_delegate(&name(&fp.name), fp);
                }
                _ => {}
            }
        }
    }

    fn methods_class(&mut self) -> Option<TypeDecl> {
        let store = self.store;
        let mut methods = Vec::with_capacity(store.procedure_count());
        for procedure in store.procedures() {
            let mut method = self.method(&procedure.name, &procedure.return_type, &procedure.params);
            method.attributes.push(self.dll_import(procedure));
            methods.push(method);
        }

        (!methods.is_empty()).then(|| {
            TypeDecl::new(
                self.options.methods_class.as_str(),
                TypeBody::Class {
                    fields: Vec::new(),
                    methods,
                },
            )
        })
    }

    /// `DllImport`, with a calling convention only when it is not the default.
    fn dll_import(&self, procedure: &NativeProcedure) -> CodeAttribute {
        let module = procedure
            .source_module
            .as_deref()
            .unwrap_or(self.options.unknown_module.as_str());
        let attribute = CodeAttribute::new("DllImport")
            .with_arg(CodeExpr::string(module))
            .with_named("EntryPoint", CodeExpr::string(procedure.name.as_str()));

        let convention = procedure.effective_convention(self.options.default_convention);
        if convention == self.options.default_convention {
            attribute
        } else {
            attribute.with_named(
                "CallingConvention",
                CodeExpr::enum_value("CallingConvention", convention.managed_name()),
            )
        }
    }

    /// Runs last: array bounds found while emitting types decide which
    /// constants are declared `Int32`.
    fn constants_class(&mut self) -> Option<TypeDecl> {
        let store = self.store;
        let mut fields = Vec::with_capacity(store.constant_count());

        for constant in store.constants() {
            let Some(value) = &constant.resolved else {
                self.skipped.push(SkippedItem {
                    subject: constant.key(),
                    member: None,
                    reason: "value never resolved".to_string(),
                });
                continue;
            };

            let value = if self.array_bounds.contains(&constant.name) {
                value
                    .narrowed_to(LiteralType::Int32)
                    .unwrap_or_else(|| value.clone())
            } else {
                value.clone()
            };
            let ty = ManagedPrimitive::from_literal(value.ty)
                .map(CodeTypeRef::Primitive)
                .unwrap_or(CodeTypeRef::String);

            fields.push(FieldDecl {
                name: constant.name.clone(),
                ty,
                attributes: Vec::new(),
                initializer: Some(CodeExpr::Literal(value)),
                is_const: true,
            });
        }

        (!fields.is_empty()).then(|| {
            TypeDecl::new(
                self.options.constants_class.as_str(),
                TypeBody::Class {
                    fields,
                    methods: Vec::new(),
                },
            )
        })
    }
}

/// Name for a body: its own tag, else the typedef that owns it, else a name
/// derived from where it is used.
pub(crate) fn inline_name(tag: &str, owner: Option<&str>, hint: &str) -> String {
    if !tag.is_empty() {
        tag.to_string()
    } else {
        owner.unwrap_or(hint).to_string()
    }
}

pub(crate) fn int32(value: i32) -> CodeExpr {
    CodeExpr::Literal(EvaluatedValue::new(
        Literal::Int(value as i64),
        LiteralType::Int32,
    ))
}
