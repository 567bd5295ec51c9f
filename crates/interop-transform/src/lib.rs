//! Managed declaration generation.
//!
//! [`DeclarationTransform`] turns a resolved
//! [`DeclarationStore`](interop_store::DeclarationStore) into a [`CodeUnit`]:
//! an abstract tree of value types, enums, delegates, a constants class and an
//! external-methods class. Rendering the tree as source text is left to a
//! target-language printer; [`printer`] only has debugging views.
//!
//! - [`primitives`]: the builtin to managed primitive table
//! - [`tree`]: the declaration tree
//! - [`TransformOptions`]: class names, default calling convention, primitives

pub mod primitives;
pub mod printer;
pub mod tree;

mod options;
mod transform;

pub use options::TransformOptions;
pub use primitives::{ManagedPrimitive, PrimitiveTable};
pub use transform::{DeclarationTransform, SkippedItem, TransformOutput};
pub use tree::{
    AttributeArg, CodeAttribute, CodeExpr, CodeTypeRef, CodeUnit, EnumMemberDecl, FieldDecl,
    MethodDecl, ParamDecl, TypeBody, TypeDecl, find_attribute,
};
