//! The conversion pipeline: stage, commit, resolve, transform.

use tracing::{debug, info_span, warn};

use interop_core::{Diagnostics, ExportError};
use interop_exports::ExportSource;
use interop_resolver::{ResolveOutput, SymbolResolver};
use interop_store::DeclarationStore;
use interop_transform::{CodeUnit, DeclarationTransform, SkippedItem};

use crate::config::ConverterConfig;
use crate::input::DeclarationSet;

/// Counts from each phase of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionStats {
    /// Entries that reached the committed store.
    pub committed: usize,
    /// Entries dropped at commit as duplicates or conflicts.
    pub rejected: usize,
    pub linked: usize,
    pub unresolved_references: usize,
    pub evaluated: usize,
    pub unresolved_values: usize,
    /// Procedures bound to an exporting module.
    pub bound: usize,
    pub emitted_types: usize,
}

/// The result of converting a store in place.
#[derive(Debug)]
pub struct ConversionOutput {
    pub unit: CodeUnit,
    /// Parse, commit, resolution and transform diagnostics, in that order.
    pub diagnostics: Diagnostics,
    pub skipped: Vec<SkippedItem>,
    pub stats: ConversionStats,
    /// The export source failed. Procedures keep the default convention and
    /// have no module; everything else is unaffected.
    pub export_error: Option<ExportError>,
}

impl ConversionOutput {
    /// No error diagnostics and no export failure.
    pub fn is_success(&self) -> bool {
        !self.diagnostics.has_errors() && self.export_error.is_none()
    }

    /// No error diagnostics.
    pub fn is_usable(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

/// The result of converting a declaration set: the store it was committed
/// to, kept for lookups and snapshots, and the conversion output.
#[derive(Debug)]
pub struct Conversion {
    pub store: DeclarationStore,
    pub output: ConversionOutput,
}

/// Runs the whole pipeline with one configuration.
///
/// ```
/// use interop_core::{BuiltinKind, NativeParameter, NativeProcedure, NativeType, NativeTypeDef};
/// use interop_exports::MemoryExportSource;
/// use interop_gen::{Converter, ConverterConfig, DeclarationSet};
///
/// let set = DeclarationSet::new()
///     .with_typedef(NativeTypeDef::new("DWORD", NativeType::unsigned(BuiltinKind::Int32)))
///     .with_procedure(
///         NativeProcedure::new("Sleep", NativeType::void())
///             .with_param(NativeParameter::new("dwMilliseconds", NativeType::named("DWORD"))),
///     );
/// let mut exports = MemoryExportSource::new().with_module("kernel32.dll", ["Sleep"]);
///
/// let converter = Converter::new(ConverterConfig::default());
/// let conversion = converter.convert_with_source(set, &mut exports);
/// assert!(conversion.output.is_success());
/// assert_eq!(
///     conversion.store.find_procedure("Sleep").unwrap().source_module.as_deref(),
///     Some("kernel32.dll")
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert `declarations`, reading export tables from the configured
    /// search paths.
    pub fn convert(&self, declarations: DeclarationSet) -> Conversion {
        let mut source = self.config.export_source();
        self.convert_with_source(declarations, &mut source)
    }

    /// Convert `declarations`, reading export tables from `source`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn convert_with_source<S: ExportSource + ?Sized>(
        &self,
        declarations: DeclarationSet,
        source: &mut S,
    ) -> Conversion {
        let span = info_span!("convert", declarations = declarations.len());
        let _guard = span.enter();

        let mut store = self.new_store();
        let (mut diagnostics, report) = {
            #[cfg(feature = "profiling")]
            profiling::scope!("commit");
            store.set_fast_load(self.config.fast_load);
            let diagnostics = declarations.stage_into(&mut store);
            let report = store.commit();
            store.set_fast_load(false);
            (diagnostics, report)
        };
        debug!(
            committed = report.committed,
            skipped = report.skipped,
            "declaration set committed"
        );

        let mut output = self.run(&mut store, Some(source));
        output.stats.committed = report.committed;
        output.stats.rejected = report.skipped;
        diagnostics.append(report.diagnostics);
        output.diagnostics = prepend(diagnostics, output.diagnostics);

        Conversion { store, output }
    }

    /// Resolve and transform a store the caller already holds. Staged
    /// entries are committed first.
    pub fn convert_store(&self, store: &mut DeclarationStore) -> ConversionOutput {
        let mut source = self.config.export_source();
        self.convert_store_with_source(store, &mut source)
    }

    pub fn convert_store_with_source<S: ExportSource + ?Sized>(
        &self,
        store: &mut DeclarationStore,
        source: &mut S,
    ) -> ConversionOutput {
        let report = store.commit();
        let mut output = self.run(store, Some(source));
        output.stats.committed = report.committed;
        output.stats.rejected = report.skipped;
        output.diagnostics = prepend(report.diagnostics, output.diagnostics);
        output
    }

    /// Resolve without export binding, then transform.
    pub fn convert_store_offline(&self, store: &mut DeclarationStore) -> ConversionOutput {
        let report = store.commit();
        let mut output = self.run::<dyn ExportSource>(store, None);
        output.stats.committed = report.committed;
        output.stats.rejected = report.skipped;
        output.diagnostics = prepend(report.diagnostics, output.diagnostics);
        output
    }

    fn new_store(&self) -> DeclarationStore {
        if self.config.seed_base_typedefs {
            DeclarationStore::with_base_typedefs()
        } else {
            DeclarationStore::new()
        }
    }

    fn run<S: ExportSource + ?Sized>(
        &self,
        store: &mut DeclarationStore,
        source: Option<&mut S>,
    ) -> ConversionOutput {
        let resolver = SymbolResolver::new(self.config.resolver_options());
        let resolved: ResolveOutput = match source {
            // the export tables are released when this call returns
            Some(source) => {
                resolver.resolve_with_source(store, source, self.config.modules.clone())
            }
            None => resolver.resolve(store),
        };
        if let Some(err) = &resolved.export_error {
            warn!(error = %err, "export lookup failed; procedures keep the default convention");
        }

        let transformed = {
            #[cfg(feature = "profiling")]
            profiling::scope!("transform");
            DeclarationTransform::new(self.config.transform.clone()).transform(store)
        };

        let stats = ConversionStats {
            linked: resolved.linked,
            unresolved_references: resolved.unresolved_references,
            evaluated: resolved.evaluated,
            unresolved_values: resolved.unresolved_values,
            bound: resolved.bound,
            emitted_types: transformed.unit.len(),
            ..ConversionStats::default()
        };
        debug!(
            linked = stats.linked,
            evaluated = stats.evaluated,
            bound = stats.bound,
            types = stats.emitted_types,
            skipped = transformed.skipped.len(),
            "conversion finished"
        );

        let mut diagnostics = resolved.diagnostics;
        diagnostics.append(transformed.diagnostics);
        ConversionOutput {
            unit: transformed.unit,
            diagnostics,
            skipped: transformed.skipped,
            stats,
            export_error: resolved.export_error,
        }
    }
}

fn prepend(mut first: Diagnostics, rest: Diagnostics) -> Diagnostics {
    first.append(rest);
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use interop_core::{
        BuiltinKind, DiagnosticKind, NativeConstant, NativeProcedure, NativeType, NativeTypeDef,
    };
    use interop_exports::MemoryExportSource;

    fn offline() -> ConverterConfig {
        ConverterConfig {
            resolve_calling_conventions: false,
            ..ConverterConfig::default()
        }
    }

    #[test]
    fn seeds_base_typedefs_unless_disabled() {
        let converter = Converter::new(offline());
        let conversion = converter.convert_with_source(DeclarationSet::new(), &mut MemoryExportSource::new());
        assert!(conversion.store.find_typedef("HWND").is_some());

        let bare = Converter::new(ConverterConfig {
            seed_base_typedefs: false,
            ..offline()
        });
        let conversion = bare.convert_with_source(DeclarationSet::new(), &mut MemoryExportSource::new());
        assert!(conversion.store.is_empty());
        assert!(conversion.output.unit.is_empty());
    }

    #[test]
    fn parse_diagnostics_come_first() {
        let mut set = DeclarationSet::new()
            .with_constant(NativeConstant::new("A", "1"))
            .with_constant(NativeConstant::new("A", "2"));
        set.report(DiagnosticKind::UnrepresentableExpression, None, "skipped a macro");

        let conversion = Converter::new(offline())
            .convert_with_source(set, &mut MemoryExportSource::new());
        let kinds: Vec<_> = conversion.output.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(kinds[0], DiagnosticKind::UnrepresentableExpression);
        assert_eq!(kinds[1], DiagnosticKind::DuplicateDeclaration);
        assert!(!conversion.output.is_usable());
        assert!(conversion.store.find_constant("A").is_none());
        assert_eq!(conversion.output.stats.rejected, 2);
    }

    #[test]
    fn fast_load_is_switched_off_after_commit() {
        let set = DeclarationSet::new()
            .with_typedef(NativeTypeDef::new("BYTE", NativeType::unsigned(BuiltinKind::Byte)));
        let conversion = Converter::new(offline())
            .convert_with_source(set, &mut MemoryExportSource::new());
        assert!(!conversion.store.is_fast_load());
        assert!(!conversion.store.has_pending());
        assert_eq!(conversion.output.stats.committed, 1);
    }

    #[test]
    fn convert_store_commits_pending_entries() {
        let mut store = DeclarationStore::new();
        store.add_procedure(NativeProcedure::new("GetTickCount", NativeType::unsigned(BuiltinKind::Int32)));

        let mut source = MemoryExportSource::new().with_module("kernel32.dll", ["GetTickCount"]);
        let output = Converter::default().convert_store_with_source(&mut store, &mut source);
        assert!(output.is_success());
        assert_eq!(output.stats.committed, 1);
        assert_eq!(output.stats.bound, 1);
        assert_eq!(source.open_handles(), 0);

        let methods = output.unit.find_type("NativeMethods").unwrap();
        assert!(methods.method("GetTickCount").is_some());
    }

    #[test]
    fn export_failure_is_reported_not_fatal() {
        let set = DeclarationSet::new()
            .with_procedure(NativeProcedure::new("Beep", NativeType::builtin(BuiltinKind::Int32)));
        let mut source = MemoryExportSource::new().with_failure("kernel32.dll");

        let conversion = Converter::default().convert_with_source(set, &mut source);
        assert!(conversion.output.export_error.is_some());
        assert!(!conversion.output.is_success());
        assert!(conversion.output.is_usable());
        assert!(conversion.output.unit.find_type("NativeMethods").is_some());
        assert_eq!(source.open_handles(), 0);
    }

    #[test]
    fn offline_conversion_leaves_modules_unknown() {
        let mut store = DeclarationStore::new();
        store.add_procedure(NativeProcedure::new("Beep", NativeType::builtin(BuiltinKind::Int32)));
        let output = Converter::default().convert_store_offline(&mut store);
        assert_eq!(output.stats.bound, 0);
        assert!(store.find_procedure("Beep").unwrap().source_module.is_none());
    }
}
