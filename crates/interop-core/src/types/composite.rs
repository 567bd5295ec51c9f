//! Structs, unions, enums, function pointers and array bounds.

use serde::{Deserialize, Serialize};

use super::NativeType;
use crate::{CallingConvention, EvaluatedValue, NativeParameter};

/// A struct or union member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeMember {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: NativeType,
}

impl NativeMember {
    pub fn new(name: impl Into<String>, ty: impl Into<NativeType>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// Body of a struct or union: a name (empty when anonymous) and ordered members.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeRecord {
    pub name: String,
    #[serde(default)]
    pub members: Vec<NativeMember>,
}

impl NativeRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, name: impl Into<String>, ty: impl Into<NativeType>) -> Self {
        self.members.push(NativeMember::new(name, ty));
        self
    }

    pub fn find_member(&self, name: &str) -> Option<&NativeMember> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }
}

/// An enumerator. `value` is the expression as written, if any; `resolved`
/// is filled by the value pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved: Option<EvaluatedValue>,
}

impl EnumMember {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
            resolved: None,
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new(name)
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NativeEnum {
    pub name: String,
    #[serde(default)]
    pub members: Vec<EnumMember>,
}

impl NativeEnum {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn with_member(mut self, member: EnumMember) -> Self {
        self.members.push(member);
        self
    }

    pub fn find_member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A function pointer signature.
///
/// `calling_convention` is `None` when the declaration did not spell one out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeFunctionPointer {
    #[serde(default)]
    pub name: String,
    pub return_type: Box<NativeType>,
    #[serde(default)]
    pub params: Vec<NativeParameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calling_convention: Option<CallingConvention>,
}

impl NativeFunctionPointer {
    pub fn new(name: impl Into<String>, return_type: impl Into<NativeType>) -> Self {
        Self {
            name: name.into(),
            return_type: Box::new(return_type.into()),
            params: Vec::new(),
            calling_convention: None,
        }
    }

    pub fn with_param(mut self, param: NativeParameter) -> Self {
        self.params.push(param);
        self
    }

    pub fn with_calling_convention(mut self, convention: CallingConvention) -> Self {
        self.calling_convention = Some(convention);
        self
    }
}

/// Declared bound of an array dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayLength {
    /// A literal element count.
    Fixed(u64),
    /// A bound spelled as a constant name (`TCHAR szName[MAX_PATH]`).
    Constant(String),
}
