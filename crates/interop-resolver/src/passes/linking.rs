//! Linking Pass - attach every named reference to its target.
//!
//! Runs first. Every [`NamedType`](interop_core::NamedType) in every typedef
//! target, record member, parameter and return type is looked up by name:
//!
//! 1. a defined type (struct, union, enum) of that name
//! 2. otherwise a typedef of that name
//! 3. otherwise a builtin spelling (`unsigned long`, `wchar_t`)
//!
//! Defined types win so that `typedef struct S1 S1` links the typedef's target
//! to the struct instead of to itself. Cycles are linked as-is; nothing here
//! follows a reference once it is attached.
//!
//! A name that matches nothing stays unresolved and is reported once per
//! declaration as an `UnresolvedReference` warning. References that are already
//! linked are left alone, so running the pass again changes nothing.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use interop_core::{
    BuiltinType, DeclKey, Declaration, DiagnosticKind, Diagnostics, ResolvedTarget, TypeRef,
};
use interop_store::DeclarationStore;

/// Output of the linking pass.
#[derive(Debug, Default)]
pub struct LinkingOutput {
    /// References attached by this run.
    pub linked: usize,
    /// References that were already attached.
    pub already_linked: usize,
    /// References left unresolved.
    pub unresolved: usize,
    pub diagnostics: Diagnostics,
}

/// Linking Pass - resolves named references against the committed store.
pub struct LinkingPass<'s> {
    store: &'s mut DeclarationStore,
}

impl<'s> LinkingPass<'s> {
    pub fn new(store: &'s mut DeclarationStore) -> Self {
        Self { store }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> LinkingOutput {
        let mut output = LinkingOutput::default();

        // Phase 1: every linkable name, read before anything is mutated
        let targets = self.name_table();

        // Phase 2: attach
        let tables = self.store.tables_mut();
        link_all(tables.typedefs, &targets, &mut output);
        link_all(tables.defined_types, &targets, &mut output);
        link_all(tables.procedures, &targets, &mut output);

        debug!(
            linked = output.linked,
            already_linked = output.already_linked,
            unresolved = output.unresolved,
            "linking pass complete"
        );
        output
    }

    fn name_table(&self) -> FxHashMap<String, DeclKey> {
        let mut targets = FxHashMap::default();
        for typedef in self.store.typedefs() {
            targets.insert(typedef.name.clone(), typedef.key());
        }
        // defined types shadow typedefs of the same name
        for defined in self.store.defined_types() {
            targets.insert(defined.name().to_string(), defined.key());
        }
        targets
    }
}

fn link_all<T: Declaration>(
    decls: &mut [T],
    targets: &FxHashMap<String, DeclKey>,
    output: &mut LinkingOutput,
) {
    for decl in decls {
        let subject = decl.key();
        let mut missing: Vec<String> = Vec::new();

        decl.for_each_named_mut(&mut |named| {
            if named.is_resolved() {
                output.already_linked += 1;
                return;
            }
            let target = targets
                .get(&named.name)
                .map(|key| ResolvedTarget::Decl(key.clone()))
                .or_else(|| BuiltinType::from_c_name(&named.name).map(ResolvedTarget::Builtin));
            match target {
                Some(target) => {
                    named.target = TypeRef::Resolved(target);
                    output.linked += 1;
                }
                None => {
                    output.unresolved += 1;
                    missing.push(named.name.clone());
                }
            }
        });

        let mut reported = FxHashSet::default();
        for name in missing {
            if reported.insert(name.clone()) {
                output.diagnostics.report(
                    DiagnosticKind::UnresolvedReference,
                    Some(subject.clone()),
                    format!("reference to unknown type '{name}' left opaque"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interop_core::{
        BuiltinKind, DefinedType, NativeParameter, NativeProcedure, NativeRecord, NativeType,
        NativeTypeDef, NamedType, Severity,
    };

    fn target_of<'a>(ty: &'a NativeType) -> &'a TypeRef {
        match ty {
            NativeType::Named(n) => &n.target,
            NativeType::Pointer { pointee } => target_of(pointee),
            other => panic!("no reference in {other:?}"),
        }
    }

    #[test]
    fn forward_typedef_reference_links() {
        let mut store = DeclarationStore::new();
        store.add_typedef(NativeTypeDef::new("A", NativeType::named("B")));
        store.add_typedef(NativeTypeDef::new("B", NativeType::unsigned(BuiltinKind::Int32)));
        store.commit();

        let output = LinkingPass::new(&mut store).run();
        assert_eq!(output.linked, 1);
        assert!(output.diagnostics.is_empty());
        assert_eq!(
            target_of(&store.find_typedef("A").unwrap().target),
            &TypeRef::Resolved(ResolvedTarget::Decl(DeclKey::typedef("B")))
        );
    }

    #[test]
    fn defined_type_wins_over_typedef() {
        let mut store = DeclarationStore::new();
        store.add_typedef(NativeTypeDef::new("S1", NativeType::named("S1")));
        store.add_defined_type(DefinedType::Struct(
            NativeRecord::new("S1").with_member("next", NativeType::pointer(NativeType::named("S1"))),
        ));
        store.commit();

        LinkingPass::new(&mut store).run();
        let expected = TypeRef::Resolved(ResolvedTarget::Decl(DeclKey::defined("S1")));
        assert_eq!(target_of(&store.find_typedef("S1").unwrap().target), &expected);
        let member = &store.find_defined_type("S1").unwrap().record().unwrap().members[0];
        assert_eq!(target_of(&member.ty), &expected);
    }

    #[test]
    fn builtin_spellings_link() {
        let mut store = DeclarationStore::new();
        store.add_typedef(NativeTypeDef::new("ULONG", NativeType::named("unsigned long")));
        store.commit();

        LinkingPass::new(&mut store).run();
        assert_eq!(
            target_of(&store.find_typedef("ULONG").unwrap().target),
            &TypeRef::Resolved(ResolvedTarget::Builtin(BuiltinType::unsigned(BuiltinKind::Int32)))
        );
    }

    #[test]
    fn unknown_names_are_reported_once_per_declaration() {
        let mut store = DeclarationStore::new();
        store.add_procedure(
            NativeProcedure::new("Frob", NativeType::named("HRESULT"))
                .with_param(NativeParameter::new("a", NativeType::named("HRESULT")))
                .with_param(NativeParameter::new("b", NativeType::named("LPUNKNOWN"))),
        );
        store.commit();

        let output = LinkingPass::new(&mut store).run();
        assert_eq!(output.unresolved, 3);
        assert_eq!(output.diagnostics.count(), 2);
        let first = output.diagnostics.iter().next().unwrap();
        assert_eq!(first.severity, Severity::Warning);
        assert_eq!(first.subject, Some(DeclKey::procedure("Frob")));
        assert!(!output.diagnostics.has_errors());
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut store = DeclarationStore::new();
        store.add_typedef(NativeTypeDef::new("LPFOO", NativeType::pointer(NamedType::new("FOO"))));
        store.add_typedef(NativeTypeDef::new("FOO", BuiltinKind::Int32));
        store.commit();

        let first = LinkingPass::new(&mut store).run();
        let snapshot = store.clone();
        let second = LinkingPass::new(&mut store).run();

        assert_eq!(first.linked, 1);
        assert_eq!(second.linked, 0);
        assert_eq!(second.already_linked, 1);
        assert!(second.diagnostics.is_empty());
        assert_eq!(store.typedefs(), snapshot.typedefs());
    }
}
