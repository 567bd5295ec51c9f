//! The symbol resolver: the passes run in order over one store.

use tracing::{debug, warn};

use interop_core::{Diagnostics, ExportError};
use interop_exports::{ExportResolver, ExportSource, ModuleList};
use interop_store::DeclarationStore;

use crate::passes::{CallingConventionPass, LinkingPass, ValuePass};

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Run the calling convention pass when an export source is supplied.
    pub resolve_calling_conventions: bool,
    /// Cap on value-pass sweeps; `None` allows one per unevaluated item.
    pub max_value_passes: Option<usize>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            resolve_calling_conventions: true,
            max_value_passes: None,
        }
    }
}

/// Aggregate result of one resolution run.
#[derive(Debug, Default)]
pub struct ResolveOutput {
    pub linked: usize,
    pub unresolved_references: usize,
    pub evaluated: usize,
    pub unresolved_values: usize,
    pub bound: usize,
    pub diagnostics: Diagnostics,
    /// The export source failed; only the calling convention pass stopped.
    pub export_error: Option<ExportError>,
}

impl ResolveOutput {
    /// Nothing worse than informational diagnostics, and no export failure.
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_errors()
            && !self.diagnostics.has_warnings()
            && self.export_error.is_none()
    }

    /// Items this run linked, evaluated or bound. Zero on a rerun.
    pub fn changed(&self) -> usize {
        self.linked + self.evaluated + self.bound
    }

    /// No error diagnostics. Warnings leave opaque references and unvalued
    /// constants behind, which is still usable output.
    pub fn is_usable(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// Runs linking, value evaluation and, optionally, export binding.
///
/// Every pass always completes; nothing unresolved aborts the run. Running
/// again over an already resolved store changes nothing.
///
/// Diagnostics describe the store as it stands after the run, not what the
/// run changed: a rerun reports whatever is still unresolved again, and
/// never anything the first run did not. [`ResolveOutput::changed`] counts
/// what a run actually did.
///
/// ```
/// use interop_core::{BuiltinKind, NativeConstant, NativeType, NativeTypeDef};
/// use interop_resolver::SymbolResolver;
/// use interop_store::DeclarationStore;
///
/// let mut store = DeclarationStore::new();
/// store.add_typedef(NativeTypeDef::new("LPDWORD", NativeType::pointer(NativeType::named("DWORD"))));
/// store.add_typedef(NativeTypeDef::new("DWORD", NativeType::unsigned(BuiltinKind::Int32)));
/// store.add_constant(NativeConstant::from_macro("WM_PAINT", "0x000F"));
/// store.commit();
///
/// let output = SymbolResolver::default().resolve(&mut store);
/// assert!(output.is_success());
/// assert_eq!(output.linked, 1);
/// assert_eq!(output.evaluated, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SymbolResolver {
    options: ResolverOptions,
}

impl SymbolResolver {
    pub fn new(options: ResolverOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Link and evaluate, without export binding.
    pub fn resolve(&self, store: &mut DeclarationStore) -> ResolveOutput {
        let mut output = ResolveOutput::default();
        self.link_and_evaluate(store, &mut output);
        finish(&output);
        output
    }

    /// Link, evaluate, then bind procedures through `exports`.
    pub fn resolve_with_exports<S: ExportSource + ?Sized>(
        &self,
        store: &mut DeclarationStore,
        exports: &mut ExportResolver<'_, S>,
    ) -> ResolveOutput {
        let mut output = ResolveOutput::default();
        self.link_and_evaluate(store, &mut output);
        if self.options.resolve_calling_conventions {
            self.bind_exports(store, exports, &mut output);
        }
        finish(&output);
        output
    }

    /// Like [`resolve_with_exports`](Self::resolve_with_exports), opening the
    /// module tables from `source` for the calling convention pass and
    /// releasing them as soon as it ends.
    pub fn resolve_with_source<S: ExportSource + ?Sized>(
        &self,
        store: &mut DeclarationStore,
        source: &mut S,
        modules: ModuleList,
    ) -> ResolveOutput {
        let mut output = ResolveOutput::default();
        self.link_and_evaluate(store, &mut output);
        if self.options.resolve_calling_conventions {
            let mut exports = ExportResolver::new(source, modules);
            self.bind_exports(store, &mut exports, &mut output);
        }
        finish(&output);
        output
    }

    fn link_and_evaluate(&self, store: &mut DeclarationStore, output: &mut ResolveOutput) {
        if store.has_pending() {
            warn!(
                pending = store.pending_count(),
                "resolving with uncommitted declarations; they are not visible"
            );
        }

        let linking = {
            #[cfg(feature = "profiling")]
            profiling::scope!("linking");
            LinkingPass::new(store).run()
        };
        output.linked = linking.linked;
        output.unresolved_references = linking.unresolved;
        output.diagnostics.append(linking.diagnostics);

        let values = {
            #[cfg(feature = "profiling")]
            profiling::scope!("values");
            ValuePass::new(store)
                .with_max_passes(self.options.max_value_passes)
                .run()
        };
        output.evaluated = values.evaluated;
        output.unresolved_values = values.unresolved;
        output.diagnostics.append(values.diagnostics);
    }

    fn bind_exports<S: ExportSource + ?Sized>(
        &self,
        store: &mut DeclarationStore,
        exports: &mut ExportResolver<'_, S>,
        output: &mut ResolveOutput,
    ) {
        #[cfg(feature = "profiling")]
        profiling::scope!("calling_conventions");

        let binding = CallingConventionPass::new(store, exports).run();
        output.bound = binding.bound;
        output.diagnostics.append(binding.diagnostics);
        output.export_error = binding.error;
    }
}

fn finish(output: &ResolveOutput) {
    debug!(
        linked = output.linked,
        evaluated = output.evaluated,
        bound = output.bound,
        errors = output.diagnostics.error_count(),
        warnings = output.diagnostics.warning_count(),
        infos = output.diagnostics.info_count(),
        export_failed = output.export_error.is_some(),
        "symbol resolution complete"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use interop_core::{
        BuiltinKind, DefinedType, DiagnosticKind, NativeConstant, NativeProcedure, NativeRecord,
        NativeType, NativeTypeDef,
    };
    use interop_exports::MemoryExportSource;

    fn store() -> DeclarationStore {
        let mut store = DeclarationStore::with_base_typedefs();
        store.add_defined_type(DefinedType::Struct(
            NativeRecord::new("RecursiveStruct")
                .with_member("m1", NativeType::pointer(NativeType::named("RecursiveStruct"))),
        ));
        store.add_typedef(NativeTypeDef::new("DWORD", NativeType::unsigned(BuiltinKind::Int32)));
        store.add_constant(NativeConstant::from_macro("INFINITE", "((DWORD)-1)"));
        store.add_constant(NativeConstant::from_macro("BROKEN", "FOO BAR"));
        store.add_procedure(
            NativeProcedure::new("GetTickCount", NativeType::named("DWORD")),
        );
        store.add_procedure(NativeProcedure::new("Missing", NativeType::named("HRESULT")));
        store.commit();
        store
    }

    #[test]
    fn runs_every_pass_and_aggregates() {
        let mut store = store();
        let mut source = MemoryExportSource::new().with_module("kernel32.dll", ["GetTickCount"]);
        let output = SymbolResolver::default().resolve_with_source(
            &mut store,
            &mut source,
            ModuleList::default(),
        );

        assert_eq!(output.bound, 1);
        assert_eq!(source.open_handles(), 0);
        assert!(output.is_usable());
        assert!(!output.is_success());
        assert_eq!(output.diagnostics.of_kind(DiagnosticKind::UnresolvedReference).count(), 1);
        assert_eq!(
            output.diagnostics.of_kind(DiagnosticKind::UnrepresentableExpression).count(),
            1
        );
        assert_eq!(output.diagnostics.of_kind(DiagnosticKind::ExportNotFound).count(), 1);
    }

    #[test]
    fn export_binding_can_be_disabled() {
        let mut store = store();
        let mut source = MemoryExportSource::new().with_module("kernel32.dll", ["GetTickCount"]);
        let resolver = SymbolResolver::new(ResolverOptions {
            resolve_calling_conventions: false,
            ..ResolverOptions::default()
        });
        let output = resolver.resolve_with_source(&mut store, &mut source, ModuleList::default());

        assert_eq!(output.bound, 0);
        assert_eq!(source.total_acquired(), 0);
        assert!(store.find_procedure("GetTickCount").unwrap().source_module.is_none());
    }

    #[test]
    fn export_failure_leaves_other_results_in_place() {
        let mut store = store();
        let mut source = MemoryExportSource::new()
            .with_module("kernel32.dll", ["X"])
            .with_failure("kernel32.dll");
        let output = SymbolResolver::default().resolve_with_source(
            &mut store,
            &mut source,
            ModuleList::default(),
        );

        assert!(output.export_error.is_some());
        assert!(!output.is_success());
        assert!(store.find_constant("INFINITE").unwrap().is_resolved());
    }

    #[test]
    fn resolving_twice_is_idempotent() {
        let mut store = store();
        let mut source = MemoryExportSource::new().with_module("kernel32.dll", ["GetTickCount"]);
        let resolver = SymbolResolver::default();

        let first = resolver.resolve_with_source(&mut store, &mut source, ModuleList::default());
        let after_first = store.clone();
        let second = resolver.resolve_with_source(&mut store, &mut source, ModuleList::default());

        assert!(first.changed() > 0);
        assert_eq!(second.changed(), 0);
        assert_eq!(second.linked, 0);
        assert_eq!(second.evaluated, 0);
        assert_eq!(second.bound, 0);
        // same unresolved state, reported again
        assert_eq!(first.diagnostics, second.diagnostics);
        assert_eq!(store.typedefs(), after_first.typedefs());
        assert_eq!(store.defined_types(), after_first.defined_types());
        assert_eq!(store.constants(), after_first.constants());
        assert_eq!(store.procedures(), after_first.procedures());
    }
}
