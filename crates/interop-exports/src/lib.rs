//! Export lookup for the native interop generator.
//!
//! Given a procedure name and an ordered [`ModuleList`], an [`ExportResolver`]
//! reports the first module whose export table contains the name. Export
//! tables come from an [`ExportSource`]: [`FileExportSource`] reads module files
//! from disk, [`MemoryExportSource`] serves fixed tables.
//!
//! The resolver owns the tables it acquires and releases all of them when it
//! is dropped, so a resolver created in a block is released when the block
//! ends, however it ends.

mod modules;
mod resolver;
mod source;

pub use modules::{DEFAULT_MODULES, EXTENDED_MODULES, ModuleList};
pub use resolver::{ExportMatch, ExportResolver};
pub use source::{ExportSource, ExportTable, FileExportSource, MemoryExportSource};
