//! Typed literal values.
//!
//! The evaluator produces an [`EvaluatedValue`]: a [`Literal`] plus the
//! [`LiteralType`] the managed side should declare it as. Integer literals are
//! typed with the narrowest of `Int32`, `UInt32`, `Int64`, `UInt64` that can
//! hold the value.
//!
//! ```
//! use interop_core::{EvaluatedValue, Literal, LiteralType};
//!
//! let v = EvaluatedValue::integer(0xFFFF_FFFF).unwrap();
//! assert_eq!(v.ty, LiteralType::UInt32);
//! assert_eq!(v.literal, Literal::UInt(0xFFFF_FFFF));
//! ```

use std::fmt;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Managed numeric and scalar types a literal can be declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiteralType {
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Char,
    String,
    Boolean,
}

impl LiteralType {
    /// The managed type name (`Int32`, `UInt64`, `String`, ...).
    pub const fn managed_name(self) -> &'static str {
        match self {
            LiteralType::SByte => "SByte",
            LiteralType::Byte => "Byte",
            LiteralType::Int16 => "Int16",
            LiteralType::UInt16 => "UInt16",
            LiteralType::Int32 => "Int32",
            LiteralType::UInt32 => "UInt32",
            LiteralType::Int64 => "Int64",
            LiteralType::UInt64 => "UInt64",
            LiteralType::Single => "Single",
            LiteralType::Double => "Double",
            LiteralType::Char => "Char",
            LiteralType::String => "String",
            LiteralType::Boolean => "Boolean",
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            LiteralType::SByte
                | LiteralType::Byte
                | LiteralType::Int16
                | LiteralType::UInt16
                | LiteralType::Int32
                | LiteralType::UInt32
                | LiteralType::Int64
                | LiteralType::UInt64
        )
    }

    pub const fn is_unsigned(self) -> bool {
        matches!(
            self,
            LiteralType::Byte | LiteralType::UInt16 | LiteralType::UInt32 | LiteralType::UInt64
        )
    }

    /// Inclusive value range of an integer type.
    pub const fn integer_range(self) -> Option<(i128, i128)> {
        let range = match self {
            LiteralType::SByte => (i8::MIN as i128, i8::MAX as i128),
            LiteralType::Byte => (0, u8::MAX as i128),
            LiteralType::Int16 => (i16::MIN as i128, i16::MAX as i128),
            LiteralType::UInt16 => (0, u16::MAX as i128),
            LiteralType::Int32 => (i32::MIN as i128, i32::MAX as i128),
            LiteralType::UInt32 => (0, u32::MAX as i128),
            LiteralType::Int64 => (i64::MIN as i128, i64::MAX as i128),
            LiteralType::UInt64 => (0, u64::MAX as i128),
            _ => return None,
        };
        Some(range)
    }

    pub fn can_hold(self, value: i128) -> bool {
        self.integer_range()
            .is_some_and(|(lo, hi)| (lo..=hi).contains(&value))
    }

    /// Narrowest of `Int32`, `UInt32`, `Int64`, `UInt64` holding `value`.
    pub fn narrowest_integer(value: i128) -> Option<LiteralType> {
        [
            LiteralType::Int32,
            LiteralType::UInt32,
            LiteralType::Int64,
            LiteralType::UInt64,
        ]
        .into_iter()
        .find(|ty| ty.can_hold(value))
    }
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.managed_name())
    }
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Int(i64),
    UInt(u64),
    Single(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    Char(char),
    String(String),
    Bool(bool),
}

impl Literal {
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Literal::Int(v) => Some(*v as i128),
            Literal::UInt(v) => Some(*v as i128),
            Literal::Char(c) => Some(*c as i128),
            Literal::Bool(b) => Some(*b as i128),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Single(v) => Some(v.0 as f64),
            Literal::Double(v) => Some(v.0),
            other => other.as_i128().map(|v| v as f64),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::UInt(v) => write!(f, "{v}"),
            Literal::Single(v) => write!(f, "{}", v.0),
            Literal::Double(v) => write!(f, "{}", v.0),
            Literal::Char(c) => write!(f, "{c:?}"),
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// A literal together with its declared managed type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluatedValue {
    pub literal: Literal,
    #[serde(rename = "type")]
    pub ty: LiteralType,
}

impl EvaluatedValue {
    pub fn new(literal: Literal, ty: LiteralType) -> Self {
        Self { literal, ty }
    }

    /// An integer typed with the narrowest type that holds it; `None` when the
    /// value does not fit in 64 bits either way.
    pub fn integer(value: i128) -> Option<Self> {
        let ty = LiteralType::narrowest_integer(value)?;
        Self::integer_as(value, ty)
    }

    /// An integer declared as `ty`; `None` when `ty` cannot hold it.
    pub fn integer_as(value: i128, ty: LiteralType) -> Option<Self> {
        if !ty.can_hold(value) {
            return None;
        }
        let literal = if ty.is_unsigned() {
            Literal::UInt(u64::try_from(value).ok()?)
        } else {
            Literal::Int(i64::try_from(value).ok()?)
        };
        Some(Self { literal, ty })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::new(Literal::String(value.into()), LiteralType::String)
    }

    pub fn character(c: char) -> Self {
        Self::new(Literal::Char(c), LiteralType::Char)
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(Literal::Bool(b), LiteralType::Boolean)
    }

    pub fn double(v: f64) -> Self {
        Self::new(Literal::Double(OrderedFloat(v)), LiteralType::Double)
    }

    pub fn single(v: f32) -> Self {
        Self::new(Literal::Single(OrderedFloat(v)), LiteralType::Single)
    }

    pub fn as_i128(&self) -> Option<i128> {
        self.literal.as_i128()
    }

    /// Re-declare an integer value as `ty` (e.g. `Int32` for an array bound).
    pub fn narrowed_to(&self, ty: LiteralType) -> Option<Self> {
        Self::integer_as(self.as_i128()?, ty)
    }
}

impl fmt::Display for EvaluatedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.literal, self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowest_integer_order() {
        assert_eq!(LiteralType::narrowest_integer(1), Some(LiteralType::Int32));
        assert_eq!(LiteralType::narrowest_integer(-1), Some(LiteralType::Int32));
        assert_eq!(LiteralType::narrowest_integer(0x8000_0000), Some(LiteralType::UInt32));
        assert_eq!(LiteralType::narrowest_integer(0x1_0000_0000), Some(LiteralType::Int64));
        assert_eq!(
            LiteralType::narrowest_integer(-0x1_0000_0000),
            Some(LiteralType::Int64)
        );
        assert_eq!(
            LiteralType::narrowest_integer(u64::MAX as i128),
            Some(LiteralType::UInt64)
        );
        assert_eq!(LiteralType::narrowest_integer(u64::MAX as i128 + 1), None);
    }

    #[test]
    fn unsigned_types_use_unsigned_literal() {
        let v = EvaluatedValue::integer_as(5, LiteralType::UInt32).unwrap();
        assert_eq!(v.literal, Literal::UInt(5));
        assert!(EvaluatedValue::integer_as(-1, LiteralType::UInt32).is_none());
    }

    #[test]
    fn narrowing_for_array_bounds() {
        let v = EvaluatedValue::integer(260).unwrap();
        let n = v.narrowed_to(LiteralType::Int16).unwrap();
        assert_eq!(n.ty, LiteralType::Int16);
        assert_eq!(n.literal, Literal::Int(260));
        assert!(EvaluatedValue::integer(70_000).unwrap().narrowed_to(LiteralType::Int16).is_none());
    }

    #[test]
    fn floats_are_hashable_and_comparable() {
        assert_eq!(EvaluatedValue::double(1.5), EvaluatedValue::double(1.5));
        assert_ne!(EvaluatedValue::single(1.5), EvaluatedValue::double(1.5));
    }

    #[test]
    fn serde_shape() {
        let v = EvaluatedValue::integer(15).unwrap();
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["type"], "int32");
        assert_eq!(json["literal"]["kind"], "int");
        assert_eq!(json["literal"]["value"], 15);
    }
}
