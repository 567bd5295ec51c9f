//! Calling Convention Pass - learn which module exports each procedure.
//!
//! Only procedures with neither an explicit calling convention nor a known
//! source module are considered. A match records the owning module and leaves
//! the convention at the platform default: the export relationship is what is
//! learned here, not the ABI.
//!
//! A miss is informational. When several modules export the name, the first
//! in configured order wins and the others are listed in an informational
//! diagnostic. A failure to acquire a module's export table stops this pass
//! only, and only once a lookup has to read that module; procedures bound
//! before the failure keep their module.

use tracing::{debug, warn};

use interop_core::{Declaration, DiagnosticKind, Diagnostics, ExportError};
use interop_exports::{ExportResolver, ExportSource};
use interop_store::DeclarationStore;

/// Output of the calling convention pass.
#[derive(Debug, Default)]
pub struct CallingConventionOutput {
    /// Procedures given a source module by this run.
    pub bound: usize,
    /// Procedures no configured module exports.
    pub not_found: usize,
    pub diagnostics: Diagnostics,
    /// Set when the pass stopped early.
    pub error: Option<ExportError>,
}

/// Calling Convention Pass - binds procedures to their exporting module.
pub struct CallingConventionPass<'s, 'e, 'x, S: ExportSource + ?Sized> {
    store: &'s mut DeclarationStore,
    exports: &'e mut ExportResolver<'x, S>,
}

impl<'s, 'e, 'x, S: ExportSource + ?Sized> CallingConventionPass<'s, 'e, 'x, S> {
    pub fn new(store: &'s mut DeclarationStore, exports: &'e mut ExportResolver<'x, S>) -> Self {
        Self { store, exports }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) -> CallingConventionOutput {
        let mut output = CallingConventionOutput::default();
        let procedures = self.store.tables_mut().procedures;

        for procedure in procedures
            .iter_mut()
            .filter(|p| p.calling_convention.is_none() && p.source_module.is_none())
        {
            let found = match self.exports.find(&procedure.name) {
                Ok(found) => found,
                Err(e) => {
                    warn!(procedure = %procedure.name, error = %e, "export lookup failed, stopping");
                    output.error = Some(e);
                    break;
                }
            };

            match found {
                Some(found) => {
                    if found.is_ambiguous() {
                        output.diagnostics.report(
                            DiagnosticKind::AmbiguousExport,
                            Some(procedure.key()),
                            format!(
                                "exported by '{}' and also by {}; using '{}'",
                                found.module,
                                found
                                    .also_exported_by
                                    .iter()
                                    .map(|m| format!("'{m}'"))
                                    .collect::<Vec<_>>()
                                    .join(", "),
                                found.module
                            ),
                        );
                    }
                    procedure.source_module = Some(found.module);
                    output.bound += 1;
                }
                None => {
                    output.not_found += 1;
                    output.diagnostics.report(
                        DiagnosticKind::ExportNotFound,
                        Some(procedure.key()),
                        "not exported by any configured module",
                    );
                }
            }
        }

        debug!(
            bound = output.bound,
            not_found = output.not_found,
            failed = output.error.is_some(),
            "calling convention pass complete"
        );
        output
    }
}
