//! Ordered export lookup over a scoped set of module handles.

use tracing::{debug, trace};

use interop_core::ExportError;

use crate::{ExportSource, ExportTable, ModuleList};

/// Where a name was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportMatch {
    /// The first module, in configured order, that exports the name.
    pub module: String,
    /// Later modules that export the same name and were passed over.
    pub also_exported_by: Vec<String>,
}

impl ExportMatch {
    pub fn is_ambiguous(&self) -> bool {
        !self.also_exported_by.is_empty()
    }
}

#[derive(Debug)]
enum Slot {
    NotLoaded,
    Loaded(ExportTable),
    Missing,
    /// Acquisition failed; the error is replayed instead of retrying.
    Failed(ExportError),
}

/// Looks names up across an ordered module list.
///
/// Tables are acquired lazily from the source on first use and held until the
/// resolver is dropped, at which point every acquired table is released. That
/// holds on every exit path: normal completion, an early `?` return, or a
/// panic unwinding through the owner.
///
/// ```
/// use interop_exports::{ExportResolver, MemoryExportSource, ModuleList};
///
/// let mut source = MemoryExportSource::new()
///     .with_module("kernel32.dll", ["GetTickCount"])
///     .with_module("user32.dll", ["MessageBoxW"]);
/// {
///     let mut resolver = ExportResolver::new(&mut source, ModuleList::default());
///     let found = resolver.find("MessageBoxW").unwrap().unwrap();
///     assert_eq!(found.module, "user32.dll");
/// }
/// assert_eq!(source.open_handles(), 0);
/// ```
pub struct ExportResolver<'s, S: ExportSource + ?Sized> {
    source: &'s mut S,
    modules: ModuleList,
    slots: Vec<Slot>,
}

impl<'s, S: ExportSource + ?Sized> ExportResolver<'s, S> {
    pub fn new(source: &'s mut S, modules: ModuleList) -> Self {
        let slots = (0..modules.len()).map(|_| Slot::NotLoaded).collect();
        Self {
            source,
            modules,
            slots,
        }
    }

    pub fn modules(&self) -> &ModuleList {
        &self.modules
    }

    /// Find the first module exporting `name`.
    ///
    /// Modules that do not exist are skipped. Any other acquisition failure
    /// before a match is returned; tables acquired so far stay held until the
    /// resolver drops. After a match, the remaining modules are only read to
    /// list shadowed exports, and a module that fails to open there is passed
    /// over: the failure surfaces on the first lookup that needs it.
    pub fn find(&mut self, name: &str) -> Result<Option<ExportMatch>, ExportError> {
        let mut found: Option<ExportMatch> = None;

        for index in 0..self.slots.len() {
            let table = match self.table(index) {
                Ok(Some(table)) => table,
                Ok(None) => continue,
                Err(e) if found.is_some() => {
                    trace!(name, error = %e, "unreadable module skipped after a match");
                    continue;
                }
                Err(e) => return Err(e),
            };
            if !table.exports(name) {
                continue;
            }
            let module = table.module().to_string();
            match &mut found {
                None => {
                    found = Some(ExportMatch {
                        module,
                        also_exported_by: Vec::new(),
                    })
                }
                Some(first) => first.also_exported_by.push(module),
            }
        }

        trace!(name, module = found.as_ref().map(|m| m.module.as_str()), "export lookup");
        Ok(found)
    }

    /// Modules whose tables are currently held.
    pub fn loaded_modules(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter_map(|slot| match slot {
                Slot::Loaded(table) => Some(table.module()),
                _ => None,
            })
            .collect()
    }

    /// Configured modules that could not be found.
    pub fn missing_modules(&self) -> Vec<&str> {
        self.slots
            .iter()
            .zip(self.modules.iter())
            .filter_map(|(slot, module)| matches!(slot, Slot::Missing).then_some(module))
            .collect()
    }

    fn table(&mut self, index: usize) -> Result<Option<&ExportTable>, ExportError> {
        if matches!(self.slots[index], Slot::NotLoaded) {
            let module = self.modules.get(index).unwrap_or_default();
            self.slots[index] = match self.source.acquire(module) {
                Ok(table) => {
                    debug!(module, exports = table.len(), "acquired module export table");
                    Slot::Loaded(table)
                }
                Err(e) if e.is_skippable() => {
                    debug!(module, "module not found, skipping");
                    Slot::Missing
                }
                Err(e) => {
                    debug!(module, error = %e, "module export table unreadable");
                    Slot::Failed(e)
                }
            };
        }
        match &self.slots[index] {
            Slot::Loaded(table) => Ok(Some(table)),
            Slot::Failed(e) => Err(e.clone()),
            Slot::NotLoaded | Slot::Missing => Ok(None),
        }
    }
}

impl<S: ExportSource + ?Sized> Drop for ExportResolver<'_, S> {
    fn drop(&mut self) {
        let mut released = 0usize;
        for slot in self.slots.drain(..) {
            if let Slot::Loaded(table) = slot {
                self.source.release(table);
                released += 1;
            }
        }
        if released > 0 {
            debug!(released, "released module export tables");
        }
    }
}
