//! Symbol resolution for native declarations.
//!
//! [`SymbolResolver`] runs three passes over a committed
//! [`DeclarationStore`](interop_store::DeclarationStore):
//!
//! 1. [`LinkingPass`](passes::LinkingPass) attaches named references
//! 2. [`ValuePass`](passes::ValuePass) evaluates constants and enum members
//!    with the [`eval`] module
//! 3. [`CallingConventionPass`](passes::CallingConventionPass) binds
//!    procedures to the module that exports them
//!
//! Problems with individual declarations are collected as diagnostics; the
//! run always completes.

pub mod eval;
pub mod passes;
mod resolver;

pub use resolver::{ResolveOutput, ResolverOptions, SymbolResolver};
