//! Where export tables come from.
//!
//! An [`ExportSource`] opens a module by name and hands back its
//! [`ExportTable`]. Opening is the expensive, handle-holding step; the
//! [`ExportResolver`](crate::ExportResolver) makes sure every table it acquires
//! is handed back through [`ExportSource::release`].

use std::path::{Path, PathBuf};

use object::{Object, ObjectSymbol};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use interop_core::ExportError;

/// The exported symbol names of one opened module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    module: String,
    names: FxHashSet<String>,
}

impl ExportTable {
    pub fn new<I, S>(module: impl Into<String>, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            module: module.into(),
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// Exact, case-sensitive membership.
    pub fn exports(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Opens modules and reads their export tables.
pub trait ExportSource {
    /// Open `module` and read its exports.
    ///
    /// Return [`ExportError::ModuleNotFound`] when the module simply does not
    /// exist here; the resolver skips it. Any other error aborts the lookup.
    fn acquire(&mut self, module: &str) -> Result<ExportTable, ExportError>;

    /// Give back a table obtained from [`acquire`](ExportSource::acquire).
    fn release(&mut self, table: ExportTable) {
        drop(table);
    }
}

// ============================================================================
// In-memory source
// ============================================================================

/// An export source backed by fixed tables. Tracks open handles so callers can
/// check that everything acquired was released.
#[derive(Debug, Default)]
pub struct MemoryExportSource {
    modules: FxHashMap<String, Vec<String>>,
    failing: FxHashSet<String>,
    open: usize,
    acquired: usize,
}

impl MemoryExportSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module<I, S>(mut self, module: &str, exports: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.modules.insert(
            module.to_ascii_lowercase(),
            exports.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Make acquiring `module` fail with [`ExportError::Acquire`].
    pub fn with_failure(mut self, module: &str) -> Self {
        self.failing.insert(module.to_ascii_lowercase());
        self
    }

    /// Tables acquired and not yet released.
    pub fn open_handles(&self) -> usize {
        self.open
    }

    /// Total successful acquisitions so far.
    pub fn total_acquired(&self) -> usize {
        self.acquired
    }
}

impl ExportSource for MemoryExportSource {
    fn acquire(&mut self, module: &str) -> Result<ExportTable, ExportError> {
        let key = module.to_ascii_lowercase();
        if self.failing.contains(&key) {
            return Err(ExportError::Acquire {
                module: module.to_string(),
                reason: "access denied".to_string(),
            });
        }
        let exports = self
            .modules
            .get(&key)
            .ok_or_else(|| ExportError::ModuleNotFound {
                module: module.to_string(),
            })?;
        self.open += 1;
        self.acquired += 1;
        Ok(ExportTable::new(module, exports.iter().cloned()))
    }

    fn release(&mut self, table: ExportTable) {
        self.open = self.open.saturating_sub(1);
        trace!(module = table.module(), open = self.open, "released in-memory export table");
    }
}

// ============================================================================
// On-disk source
// ============================================================================

/// Reads export tables from module files found in a list of directories.
///
/// PE/COFF, ELF and Mach-O files are understood. Dynamic export tables are
/// preferred; files without one fall back to their global defined symbols.
#[derive(Debug, Clone, Default)]
pub struct FileExportSource {
    search_paths: Vec<PathBuf>,
}

impl FileExportSource {
    pub fn new<I, P>(search_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_paths: search_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// The Windows system directory, when `SystemRoot` is set.
    pub fn system() -> Self {
        let paths = std::env::var_os("SystemRoot")
            .map(|root| vec![Path::new(&root).join("System32")])
            .unwrap_or_default();
        Self::new(paths)
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    fn locate(&self, module: &str) -> Option<PathBuf> {
        self.search_paths
            .iter()
            .map(|dir| dir.join(module))
            .find(|path| path.is_file())
    }
}

impl ExportSource for FileExportSource {
    fn acquire(&mut self, module: &str) -> Result<ExportTable, ExportError> {
        let path = self.locate(module).ok_or_else(|| ExportError::ModuleNotFound {
            module: module.to_string(),
        })?;
        let data = std::fs::read(&path).map_err(|e| ExportError::Acquire {
            module: module.to_string(),
            reason: e.to_string(),
        })?;
        let names = read_export_names(&data).map_err(|e| ExportError::Parse {
            module: module.to_string(),
            reason: e.to_string(),
        })?;
        debug!(module, path = %path.display(), exports = names.len(), "read module export table");
        Ok(ExportTable::new(module, names))
    }
}

fn read_export_names(data: &[u8]) -> Result<Vec<String>, object::Error> {
    let file = object::File::parse(data)?;

    let exported: Vec<String> = file
        .exports()?
        .iter()
        .map(|export| String::from_utf8_lossy(export.name()).into_owned())
        .collect();
    if !exported.is_empty() {
        return Ok(exported);
    }

    Ok(file
        .symbols()
        .filter(|symbol| symbol.is_global() && symbol.is_definition())
        .filter_map(|symbol| symbol.name().ok().map(str::to_string))
        .filter(|name| !name.is_empty())
        .collect())
}
