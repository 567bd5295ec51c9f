//! Builtin to managed primitive mapping.
//!
//! The table is a value carried in [`TransformOptions`](crate::TransformOptions),
//! so two transforms with different mappings never observe each other.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use interop_core::{BuiltinKind, BuiltinType, LiteralType};

/// Primitive types of the managed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManagedPrimitive {
    Void,
    Boolean,
    Byte,
    SByte,
    Char,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    /// A pointer-sized opaque handle.
    IntPtr,
}

impl ManagedPrimitive {
    pub const fn name(self) -> &'static str {
        match self {
            ManagedPrimitive::Void => "Void",
            ManagedPrimitive::Boolean => "Boolean",
            ManagedPrimitive::Byte => "Byte",
            ManagedPrimitive::SByte => "SByte",
            ManagedPrimitive::Char => "Char",
            ManagedPrimitive::Int16 => "Int16",
            ManagedPrimitive::UInt16 => "UInt16",
            ManagedPrimitive::Int32 => "Int32",
            ManagedPrimitive::UInt32 => "UInt32",
            ManagedPrimitive::Int64 => "Int64",
            ManagedPrimitive::UInt64 => "UInt64",
            ManagedPrimitive::Single => "Single",
            ManagedPrimitive::Double => "Double",
            ManagedPrimitive::IntPtr => "IntPtr",
        }
    }

    /// The primitive a literal of type `ty` is declared as. Strings are not
    /// primitives.
    pub const fn from_literal(ty: LiteralType) -> Option<Self> {
        let primitive = match ty {
            LiteralType::SByte => ManagedPrimitive::SByte,
            LiteralType::Byte => ManagedPrimitive::Byte,
            LiteralType::Int16 => ManagedPrimitive::Int16,
            LiteralType::UInt16 => ManagedPrimitive::UInt16,
            LiteralType::Int32 => ManagedPrimitive::Int32,
            LiteralType::UInt32 => ManagedPrimitive::UInt32,
            LiteralType::Int64 => ManagedPrimitive::Int64,
            LiteralType::UInt64 => ManagedPrimitive::UInt64,
            LiteralType::Single => ManagedPrimitive::Single,
            LiteralType::Double => ManagedPrimitive::Double,
            LiteralType::Char => ManagedPrimitive::Char,
            LiteralType::Boolean => ManagedPrimitive::Boolean,
            LiteralType::String => return None,
        };
        Some(primitive)
    }
}

impl fmt::Display for ManagedPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fixed signed/unsigned/width table from native builtins to managed primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveTable {
    map: FxHashMap<BuiltinType, ManagedPrimitive>,
}

impl PrimitiveTable {
    /// A table with no entries. Every builtin falls back to `IntPtr`.
    pub fn empty() -> Self {
        Self {
            map: FxHashMap::default(),
        }
    }

    pub fn get(&self, builtin: BuiltinType) -> Option<ManagedPrimitive> {
        self.map.get(&builtin).copied()
    }

    pub fn insert(&mut self, builtin: BuiltinType, primitive: ManagedPrimitive) {
        self.map.insert(builtin, primitive);
    }

    /// The same table with one mapping replaced.
    pub fn with_override(mut self, builtin: BuiltinType, primitive: ManagedPrimitive) -> Self {
        self.insert(builtin, primitive);
        self
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for PrimitiveTable {
    fn default() -> Self {
        use BuiltinKind::*;

        let entries = [
            (Void, ManagedPrimitive::Void, ManagedPrimitive::Void),
            (Boolean, ManagedPrimitive::Boolean, ManagedPrimitive::Boolean),
            (Char, ManagedPrimitive::SByte, ManagedPrimitive::Byte),
            (WChar, ManagedPrimitive::Char, ManagedPrimitive::Char),
            (Byte, ManagedPrimitive::Byte, ManagedPrimitive::Byte),
            (Int16, ManagedPrimitive::Int16, ManagedPrimitive::UInt16),
            (Int32, ManagedPrimitive::Int32, ManagedPrimitive::UInt32),
            (Int64, ManagedPrimitive::Int64, ManagedPrimitive::UInt64),
            (Float, ManagedPrimitive::Single, ManagedPrimitive::Single),
            (Double, ManagedPrimitive::Double, ManagedPrimitive::Double),
        ];

        let mut table = Self::empty();
        for (kind, signed, unsigned) in entries {
            table.insert(BuiltinType::new(kind), signed);
            table.insert(BuiltinType::unsigned(kind), unsigned);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_follows_sign_and_width() {
        let table = PrimitiveTable::default();
        let get = |name| table.get(BuiltinType::from_c_name(name).unwrap());

        assert_eq!(get("char"), Some(ManagedPrimitive::SByte));
        assert_eq!(get("unsigned char"), Some(ManagedPrimitive::Byte));
        assert_eq!(get("wchar_t"), Some(ManagedPrimitive::Char));
        assert_eq!(get("short"), Some(ManagedPrimitive::Int16));
        assert_eq!(get("unsigned long"), Some(ManagedPrimitive::UInt32));
        assert_eq!(get("__int64"), Some(ManagedPrimitive::Int64));
        assert_eq!(get("unsigned long long"), Some(ManagedPrimitive::UInt64));
        assert_eq!(get("float"), Some(ManagedPrimitive::Single));
        assert_eq!(get("void"), Some(ManagedPrimitive::Void));
    }

    #[test]
    fn overrides_replace_one_entry() {
        let table = PrimitiveTable::default()
            .with_override(BuiltinType::new(BuiltinKind::Char), ManagedPrimitive::Byte);
        assert_eq!(
            table.get(BuiltinType::new(BuiltinKind::Char)),
            Some(ManagedPrimitive::Byte)
        );
        assert_eq!(table.len(), PrimitiveTable::default().len());
        assert!(PrimitiveTable::empty().get(BuiltinType::VOID).is_none());
    }

    #[test]
    fn literal_types_map_except_strings() {
        assert_eq!(
            ManagedPrimitive::from_literal(LiteralType::UInt32),
            Some(ManagedPrimitive::UInt32)
        );
        assert_eq!(ManagedPrimitive::from_literal(LiteralType::String), None);
    }
}
