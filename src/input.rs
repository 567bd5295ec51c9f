//! The declaration set handed over by a header parser.

use serde::{Deserialize, Serialize};

use interop_core::{
    DeclKey, DiagnosticKind, Diagnostics, DefinedType, NativeConstant, NativeProcedure,
    NativeTypeDef,
};
use interop_store::DeclarationStore;

use crate::error::{ConvertError, ConvertResult};

/// Unresolved declarations in the order the parser produced them, plus
/// whatever the parser had to report along the way.
///
/// Named references are plain names here; nothing is linked until the set is
/// committed to a store and resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeclarationSet {
    pub typedefs: Vec<NativeTypeDef>,
    pub defined_types: Vec<DefinedType>,
    pub constants: Vec<NativeConstant>,
    pub procedures: Vec<NativeProcedure>,
    /// Parse-time problems. Carried into the conversion output unchanged.
    #[serde(skip)]
    pub diagnostics: Diagnostics,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> ConvertResult<Self> {
        serde_json::from_str(json).map_err(ConvertError::Input)
    }

    pub fn with_typedef(mut self, typedef: NativeTypeDef) -> Self {
        self.typedefs.push(typedef);
        self
    }

    pub fn with_defined_type(mut self, defined: DefinedType) -> Self {
        self.defined_types.push(defined);
        self
    }

    pub fn with_constant(mut self, constant: NativeConstant) -> Self {
        self.constants.push(constant);
        self
    }

    pub fn with_procedure(mut self, procedure: NativeProcedure) -> Self {
        self.procedures.push(procedure);
        self
    }

    /// Record a parse-time problem about `subject`.
    pub fn report(
        &mut self,
        kind: DiagnosticKind,
        subject: Option<DeclKey>,
        message: impl Into<String>,
    ) {
        self.diagnostics.report(kind, subject, message);
    }

    /// Merge another set after this one.
    pub fn extend(&mut self, other: DeclarationSet) {
        self.typedefs.extend(other.typedefs);
        self.defined_types.extend(other.defined_types);
        self.constants.extend(other.constants);
        self.procedures.extend(other.procedures);
        self.diagnostics.append(other.diagnostics);
    }

    pub fn len(&self) -> usize {
        self.typedefs.len() + self.defined_types.len() + self.constants.len() + self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stage every declaration into `store`, returning the parse diagnostics.
    /// Nothing becomes visible until the store is committed.
    pub fn stage_into(self, store: &mut DeclarationStore) -> Diagnostics {
        for typedef in self.typedefs {
            store.add_typedef(typedef);
        }
        for defined in self.defined_types {
            store.add_defined_type(defined);
        }
        for constant in self.constants {
            store.add_constant(constant);
        }
        for procedure in self.procedures {
            store.add_procedure(procedure);
        }
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interop_core::{BuiltinKind, NativeType};

    #[test]
    fn reads_parser_json() {
        let set = DeclarationSet::from_json(
            r#"{
                "typedefs": [
                    { "name": "DWORD", "target": { "node": "builtin", "kind": "int32", "is_unsigned": true } },
                    { "name": "LPDWORD", "target": { "node": "pointer", "pointee": { "node": "named", "name": "DWORD" } } }
                ],
                "defined_types": [
                    { "kind": "struct", "name": "tagPOINT", "members": [
                        { "name": "x", "type": { "node": "builtin", "kind": "int32" } },
                        { "name": "y", "type": { "node": "builtin", "kind": "int32" } }
                    ] }
                ],
                "constants": [ { "name": "MAX_PATH", "value": "260" } ]
            }"#,
        )
        .unwrap();

        assert_eq!(set.len(), 4);
        assert!(set.procedures.is_empty());
        assert_eq!(
            set.typedefs[0].target,
            NativeType::unsigned(BuiltinKind::Int32)
        );
        assert_eq!(set.defined_types[0].record().map(|r| r.members.len()), Some(2));
        assert!(set.diagnostics.is_empty());
    }

    #[test]
    fn staging_leaves_store_uncommitted() {
        let mut set = DeclarationSet::new()
            .with_typedef(NativeTypeDef::new("BYTE", NativeType::unsigned(BuiltinKind::Byte)))
            .with_constant(NativeConstant::from_macro("MAX_PATH", "260"));
        set.report(
            DiagnosticKind::UnrepresentableExpression,
            Some(DeclKey::constant("BROKEN")),
            "macro body is not an expression",
        );

        let mut store = DeclarationStore::new();
        let diagnostics = set.stage_into(&mut store);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(store.pending_count(), 2);
        assert!(store.find_typedef("BYTE").is_none());

        store.commit();
        assert!(store.find_typedef("BYTE").is_some());
        assert!(store.find_constant("MAX_PATH").is_some());
    }

    #[test]
    fn extend_keeps_order() {
        let mut first = DeclarationSet::new().with_constant(NativeConstant::new("A", "1"));
        let second = DeclarationSet::new().with_constant(NativeConstant::new("B", "A + 1"));
        first.extend(second);
        let names: Vec<_> = first.constants.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }
}
