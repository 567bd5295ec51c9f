//! Builtin native types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Builtin C/C++ type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinKind {
    Void,
    Boolean,
    Char,
    WChar,
    Byte,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
}

impl BuiltinKind {
    /// Width in bytes; `void` has none.
    pub const fn size(self) -> Option<u32> {
        match self {
            BuiltinKind::Void => None,
            BuiltinKind::Boolean | BuiltinKind::Char | BuiltinKind::Byte => Some(1),
            BuiltinKind::WChar | BuiltinKind::Int16 => Some(2),
            BuiltinKind::Int32 | BuiltinKind::Float => Some(4),
            BuiltinKind::Int64 | BuiltinKind::Double => Some(8),
        }
    }
}

/// A builtin type with its signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuiltinType {
    pub kind: BuiltinKind,
    #[serde(default)]
    pub is_unsigned: bool,
}

impl BuiltinType {
    pub const VOID: BuiltinType = BuiltinType::new(BuiltinKind::Void);

    pub const fn new(kind: BuiltinKind) -> Self {
        Self {
            kind,
            is_unsigned: false,
        }
    }

    pub const fn unsigned(kind: BuiltinKind) -> Self {
        Self {
            kind,
            is_unsigned: true,
        }
    }

    pub const fn with_unsigned(kind: BuiltinKind, is_unsigned: bool) -> Self {
        Self { kind, is_unsigned }
    }

    pub fn is_void(&self) -> bool {
        self.kind == BuiltinKind::Void
    }

    /// Narrow or wide character types, the ones whose pointers marshal as strings.
    pub fn is_character(&self) -> bool {
        matches!(self.kind, BuiltinKind::Char | BuiltinKind::WChar)
    }

    pub fn is_integral(&self) -> bool {
        matches!(
            self.kind,
            BuiltinKind::Char
                | BuiltinKind::WChar
                | BuiltinKind::Byte
                | BuiltinKind::Int16
                | BuiltinKind::Int32
                | BuiltinKind::Int64
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self.kind, BuiltinKind::Float | BuiltinKind::Double)
    }

    /// Recognize a builtin from its C spelling (`unsigned long`, `__int64`, `wchar_t`).
    ///
    /// Whitespace between keywords is normalized; keyword order is not.
    pub fn from_c_name(name: &str) -> Option<Self> {
        let words: Vec<&str> = name.split_whitespace().collect();
        let (is_unsigned, rest) = match words.first() {
            Some(&"unsigned") => (true, &words[1..]),
            Some(&"signed") => (false, &words[1..]),
            _ => (false, &words[..]),
        };

        let kind = match rest {
            [] if words.len() == 1 => BuiltinKind::Int32,
            ["void"] => BuiltinKind::Void,
            ["bool"] | ["_Bool"] | ["boolean"] => BuiltinKind::Boolean,
            ["char"] | ["__int8"] => BuiltinKind::Char,
            ["wchar_t"] | ["__wchar_t"] => BuiltinKind::WChar,
            ["byte"] => BuiltinKind::Byte,
            ["short"] | ["short", "int"] | ["__int16"] => BuiltinKind::Int16,
            ["int"] | ["long"] | ["long", "int"] | ["__int32"] => BuiltinKind::Int32,
            ["long", "long"] | ["long", "long", "int"] | ["__int64"] => BuiltinKind::Int64,
            ["float"] => BuiltinKind::Float,
            ["double"] | ["long", "double"] => BuiltinKind::Double,
            _ => return None,
        };

        // `unsigned` only makes sense on the integral kinds
        if is_unsigned && !matches!(
            kind,
            BuiltinKind::Char | BuiltinKind::Byte | BuiltinKind::Int16 | BuiltinKind::Int32 | BuiltinKind::Int64
        ) {
            return None;
        }

        Some(Self::with_unsigned(kind, is_unsigned))
    }

    /// Canonical C spelling.
    pub fn c_name(&self) -> &'static str {
        match (self.kind, self.is_unsigned) {
            (BuiltinKind::Void, _) => "void",
            (BuiltinKind::Boolean, _) => "bool",
            (BuiltinKind::Char, false) => "char",
            (BuiltinKind::Char, true) => "unsigned char",
            (BuiltinKind::WChar, _) => "wchar_t",
            (BuiltinKind::Byte, _) => "byte",
            (BuiltinKind::Int16, false) => "short",
            (BuiltinKind::Int16, true) => "unsigned short",
            (BuiltinKind::Int32, false) => "int",
            (BuiltinKind::Int32, true) => "unsigned int",
            (BuiltinKind::Int64, false) => "__int64",
            (BuiltinKind::Int64, true) => "unsigned __int64",
            (BuiltinKind::Float, _) => "float",
            (BuiltinKind::Double, _) => "double",
        }
    }
}

impl From<BuiltinKind> for BuiltinType {
    fn from(kind: BuiltinKind) -> Self {
        BuiltinType::new(kind)
    }
}

impl fmt::Display for BuiltinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.c_name())
    }
}
