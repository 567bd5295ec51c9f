//! Transform configuration.

use serde::{Deserialize, Serialize};

use interop_core::CallingConvention;

use crate::PrimitiveTable;

/// Options for [`DeclarationTransform`](crate::DeclarationTransform).
///
/// Every field has a default, so a partial JSON object is a valid
/// configuration. The primitive table is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Static class holding constant fields.
    pub constants_class: String,
    /// Static class holding external methods.
    pub methods_class: String,
    /// The convention that needs no attribute.
    pub default_convention: CallingConvention,
    /// Module named on procedures no export table claimed.
    pub unknown_module: String,
    #[serde(skip)]
    pub primitives: PrimitiveTable,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            constants_class: "NativeConstants".to_string(),
            methods_class: "NativeMethods".to_string(),
            default_convention: CallingConvention::Winapi,
            unknown_module: "<unknown>".to_string(),
            primitives: PrimitiveTable::default(),
        }
    }
}
