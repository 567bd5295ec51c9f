//! Declaration identity.
//!
//! Every top-level declaration is identified by its category and its name.
//! Typedefs and defined types live in separate namespaces, so `struct FOO` and
//! `typedef ... FOO` are distinct nodes.
//!
//! [`DeclHash`] is a deterministic 64-bit hash of a [`DeclKey`]. Traversals use
//! it for their visited sets so they never need to clone names.
//!
//! ```
//! use interop_core::{DeclHash, DeclKey};
//!
//! let a = DeclKey::defined("tagPOINT").decl_hash();
//! let b = DeclHash::of(&DeclKey::defined("tagPOINT"));
//! assert_eq!(a, b);
//! assert_ne!(a, DeclKey::typedef("tagPOINT").decl_hash());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

/// Domain mixing constants so that equal names in different categories hash apart.
mod hash_constants {
    pub const TYPEDEF: u64 = 0x2fac10b63a6cc57c;
    pub const DEFINED: u64 = 0x5ea77ffbcdf5f302;
    pub const CONSTANT: u64 = 0x7d3c8b4a92e15f6d;
    pub const PROCEDURE: u64 = 0x3e9f5d2a8c7b1403;
}

/// The namespace a declaration lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclCategory {
    Typedef,
    DefinedType,
    Constant,
    Procedure,
}

impl DeclCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            DeclCategory::Typedef => "typedef",
            DeclCategory::DefinedType => "defined type",
            DeclCategory::Constant => "constant",
            DeclCategory::Procedure => "procedure",
        }
    }

    const fn hash_domain(self) -> u64 {
        match self {
            DeclCategory::Typedef => hash_constants::TYPEDEF,
            DeclCategory::DefinedType => hash_constants::DEFINED,
            DeclCategory::Constant => hash_constants::CONSTANT,
            DeclCategory::Procedure => hash_constants::PROCEDURE,
        }
    }
}

impl fmt::Display for DeclCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a declaration: category plus exact, case-sensitive name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclKey {
    pub category: DeclCategory,
    pub name: String,
}

impl DeclKey {
    pub fn new(category: DeclCategory, name: impl Into<String>) -> Self {
        Self {
            category,
            name: name.into(),
        }
    }

    pub fn typedef(name: impl Into<String>) -> Self {
        Self::new(DeclCategory::Typedef, name)
    }

    pub fn defined(name: impl Into<String>) -> Self {
        Self::new(DeclCategory::DefinedType, name)
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Self::new(DeclCategory::Constant, name)
    }

    pub fn procedure(name: impl Into<String>) -> Self {
        Self::new(DeclCategory::Procedure, name)
    }

    /// Hash this key for visited-set bookkeeping.
    #[inline]
    pub fn decl_hash(&self) -> DeclHash {
        DeclHash::from_parts(self.category, &self.name)
    }
}

impl fmt::Display for DeclKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.category, self.name)
    }
}

/// Deterministic 64-bit hash of a declaration identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DeclHash(pub u64);

impl DeclHash {
    #[inline]
    pub fn from_parts(category: DeclCategory, name: &str) -> Self {
        DeclHash(category.hash_domain() ^ xxh64(name.as_bytes(), 0))
    }

    #[inline]
    pub fn of(key: &DeclKey) -> Self {
        key.decl_hash()
    }
}

impl fmt::Debug for DeclHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DeclHash({:#018x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(
            DeclKey::typedef("DWORD").decl_hash(),
            DeclKey::typedef("DWORD").decl_hash()
        );
    }

    #[test]
    fn categories_hash_apart() {
        let name = "POINT";
        let hashes = [
            DeclHash::from_parts(DeclCategory::Typedef, name),
            DeclHash::from_parts(DeclCategory::DefinedType, name),
            DeclHash::from_parts(DeclCategory::Constant, name),
            DeclHash::from_parts(DeclCategory::Procedure, name),
        ];
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn names_are_case_sensitive() {
        assert_ne!(DeclKey::defined("s1").decl_hash(), DeclKey::defined("S1").decl_hash());
    }

    #[test]
    fn display_names_category() {
        assert_eq!(DeclKey::constant("WM_PAINT").to_string(), "constant 'WM_PAINT'");
    }
}
