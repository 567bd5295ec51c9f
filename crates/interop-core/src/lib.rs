//! Core declaration model for the native interop generator.
//!
//! This crate holds everything the other crates agree on:
//!
//! - [`types`]: the native type graph (builtins, pointers, arrays, typedefs,
//!   named references, structs, unions, enums, function pointers)
//! - [`decls`]: top-level declarations (typedefs, defined types, constants,
//!   procedures)
//! - [`literal`]: typed literal values produced by constant evaluation
//! - [`decl_key`]: declaration identity (`DeclKey`, `DeclHash`)
//! - [`graph`]: cycle-safe traversal and canonicalization over a declaration lookup
//! - [`diagnostics`]: accumulated, non-fatal domain conditions
//! - [`error`]: hard failures for each phase

pub mod decl_key;
pub mod decls;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod literal;
pub mod types;

pub use decl_key::{DeclCategory, DeclHash, DeclKey};
pub use decls::{
    CallingConvention, ConstantKind, Declaration, DefinedType, NativeConstant, NativeParameter,
    NativeProcedure, NativeTypeDef, ParamDirection,
};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{EvalError, ExportError, InteropError, StoreError};
pub use graph::{canonical, Canonical, CanonicalKind, DeclarationLookup, GraphWalker, NodeRef, SymbolPrinter};
pub use literal::{EvaluatedValue, Literal, LiteralType};
pub use types::{
    ArrayLength, BuiltinKind, BuiltinType, EnumMember, NamedType, NativeEnum,
    NativeFunctionPointer, NativeMember, NativeRecord, NativeType, ResolvedTarget, TypeQualifiers,
    TypeRef,
};
