//! Native header declarations to managed interop declarations.
//!
//! The pipeline, end to end:
//!
//! 1. a parser hands over a [`DeclarationSet`]
//! 2. the set is staged and committed to a
//!    [`DeclarationStore`](interop_store::DeclarationStore)
//! 3. [`SymbolResolver`](interop_resolver::SymbolResolver) links references,
//!    evaluates constants and binds procedures to exporting modules
//! 4. [`DeclarationTransform`](interop_transform::DeclarationTransform)
//!    produces the managed declaration tree
//!
//! [`Converter`] runs all four with one [`ConverterConfig`]. Callers that drive
//! the phases themselves use the member crates directly.

mod config;
mod converter;
mod error;
mod input;

pub use config::ConverterConfig;
pub use converter::{Conversion, ConversionOutput, ConversionStats, Converter};
pub use error::{ConvertError, ConvertResult};
pub use input::DeclarationSet;

pub mod prelude {
    pub use crate::{Conversion, ConversionOutput, Converter, ConverterConfig, DeclarationSet};
    pub use interop_core::{
        BuiltinKind, CallingConvention, DeclKey, DefinedType, Diagnostic, DiagnosticKind,
        Diagnostics, EnumMember, NativeConstant, NativeEnum, NativeFunctionPointer,
        NativeParameter, NativeProcedure, NativeRecord, NativeType, NativeTypeDef, ParamDirection,
    };
    pub use interop_exports::{ExportSource, FileExportSource, MemoryExportSource, ModuleList};
    pub use interop_store::DeclarationStore;
    pub use interop_transform::{CodeTypeRef, CodeUnit, TypeBody, TypeDecl, printer};
}
