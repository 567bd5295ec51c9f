//! The declaration store.
//!
//! Entries are added to a staging area and only become visible to lookups
//! after [`DeclarationStore::commit`]. Commit is where duplicate names are
//! detected: a name staged more than once within a category is rejected
//! entirely, and a staged entry that collides with a committed one of
//! different content is rejected in favor of the committed entry.
//!
//! # Fast load
//!
//! Normally each staged entry is indexed as it is added, and each committed
//! entry is indexed as it is moved. With [`set_fast_load(true)`](DeclarationStore::set_fast_load)
//! both are skipped; duplicate detection and the committed index are rebuilt
//! once at commit. Query results after commit are identical either way.

use std::borrow::Cow;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use interop_core::{
    DeclCategory, DeclKey, Declaration, DeclarationLookup, DefinedType, DiagnosticKind,
    Diagnostics, NativeConstant, NativeProcedure, NativeTypeDef, NodeRef,
};

use crate::Table;

// ============================================================================
// Staging
// ============================================================================

/// Pending entries of one category.
#[derive(Debug, Clone)]
struct Staged<T> {
    entries: Vec<T>,
    /// Per-name occurrence counts; only maintained outside fast-load.
    seen: FxHashMap<String, usize>,
    indexed: bool,
}

impl<T> Default for Staged<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            seen: FxHashMap::default(),
            indexed: true,
        }
    }
}

impl<T: Declaration> Staged<T> {
    fn push(&mut self, entry: T, index: bool) {
        if index {
            *self.seen.entry(entry.name().to_string()).or_default() += 1;
        }
        self.entries.push(entry);
    }

    fn set_indexed(&mut self, indexed: bool) {
        if indexed && !self.indexed {
            self.seen = Self::count(&self.entries);
        } else if !indexed {
            self.seen.clear();
        }
        self.indexed = indexed;
    }

    fn count(entries: &[T]) -> FxHashMap<String, usize> {
        let mut seen = FxHashMap::default();
        for entry in entries {
            *seen.entry(entry.name().to_string()).or_default() += 1;
        }
        seen
    }

    fn counts(&self) -> Cow<'_, FxHashMap<String, usize>> {
        if self.indexed {
            Cow::Borrowed(&self.seen)
        } else {
            Cow::Owned(Self::count(&self.entries))
        }
    }

    fn staged_count(&self, name: &str) -> Option<usize> {
        self.indexed
            .then(|| self.seen.get(name).copied().unwrap_or(0))
    }

    fn take(&mut self) -> (Vec<T>, FxHashMap<String, usize>) {
        let counts = self.counts().into_owned();
        self.seen.clear();
        (std::mem::take(&mut self.entries), counts)
    }
}

/// Outcome of one [`DeclarationStore::commit`].
#[derive(Debug, Clone, Default)]
pub struct CommitReport {
    /// Entries moved into the committed state.
    pub committed: usize,
    /// Entries dropped: duplicates, conflicts, or identical re-adds.
    pub skipped: usize,
    pub diagnostics: Diagnostics,
}

impl CommitReport {
    pub fn is_clean(&self) -> bool {
        !self.diagnostics.has_errors()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Mutable views of every committed table at once, for passes that update one
/// category while reading another.
pub struct TablesMut<'a> {
    pub typedefs: &'a mut [NativeTypeDef],
    pub defined_types: &'a mut [DefinedType],
    pub constants: &'a mut [NativeConstant],
    pub procedures: &'a mut [NativeProcedure],
}

/// Typedefs, defined types, constants and procedures, each keyed by name.
#[derive(Debug, Clone, Default)]
pub struct DeclarationStore {
    typedefs: Table<NativeTypeDef>,
    defined_types: Table<DefinedType>,
    constants: Table<NativeConstant>,
    procedures: Table<NativeProcedure>,

    staged_typedefs: Staged<NativeTypeDef>,
    staged_defined_types: Staged<DefinedType>,
    staged_constants: Staged<NativeConstant>,
    staged_procedures: Staged<NativeProcedure>,

    fast_load: bool,
}

impl DeclarationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with the base typedefs already committed.
    pub fn with_base_typedefs() -> Self {
        let mut store = Self::new();
        for typedef in crate::standard::base_typedefs() {
            store.add_typedef(typedef);
        }
        store.commit();
        store
    }

    // ==========================================================================
    // Staging
    // ==========================================================================

    pub fn add_typedef(&mut self, typedef: NativeTypeDef) {
        let index = !self.fast_load;
        self.staged_typedefs.push(typedef, index);
    }

    pub fn add_defined_type(&mut self, defined: DefinedType) {
        let index = !self.fast_load;
        self.staged_defined_types.push(defined, index);
    }

    pub fn add_constant(&mut self, constant: NativeConstant) {
        let index = !self.fast_load;
        self.staged_constants.push(constant, index);
    }

    pub fn add_procedure(&mut self, procedure: NativeProcedure) {
        let index = !self.fast_load;
        self.staged_procedures.push(procedure, index);
    }

    /// Toggle bulk-insert mode. Has no effect on query results after commit.
    pub fn set_fast_load(&mut self, fast_load: bool) {
        if self.fast_load == fast_load {
            return;
        }
        self.fast_load = fast_load;
        self.staged_typedefs.set_indexed(!fast_load);
        self.staged_defined_types.set_indexed(!fast_load);
        self.staged_constants.set_indexed(!fast_load);
        self.staged_procedures.set_indexed(!fast_load);
        debug!(fast_load, "declaration store load mode changed");
    }

    pub fn is_fast_load(&self) -> bool {
        self.fast_load
    }

    pub fn pending_count(&self) -> usize {
        self.staged_typedefs.entries.len()
            + self.staged_defined_types.entries.len()
            + self.staged_constants.entries.len()
            + self.staged_procedures.entries.len()
    }

    pub fn has_pending(&self) -> bool {
        self.pending_count() > 0
    }

    /// How many times `key` is staged. `None` in fast-load mode, where staged
    /// entries are not indexed.
    pub fn staged_count(&self, key: &DeclKey) -> Option<usize> {
        match key.category {
            DeclCategory::Typedef => self.staged_typedefs.staged_count(&key.name),
            DeclCategory::DefinedType => self.staged_defined_types.staged_count(&key.name),
            DeclCategory::Constant => self.staged_constants.staged_count(&key.name),
            DeclCategory::Procedure => self.staged_procedures.staged_count(&key.name),
        }
    }

    /// Move every staged entry into the committed, indexed state.
    ///
    /// Calling this with nothing staged does nothing.
    pub fn commit(&mut self) -> CommitReport {
        let mut report = CommitReport::default();
        if !self.has_pending() {
            return report;
        }

        let fast_load = self.fast_load;
        commit_category(&mut self.typedefs, &mut self.staged_typedefs, fast_load, &mut report);
        commit_category(
            &mut self.defined_types,
            &mut self.staged_defined_types,
            fast_load,
            &mut report,
        );
        commit_category(&mut self.constants, &mut self.staged_constants, fast_load, &mut report);
        commit_category(
            &mut self.procedures,
            &mut self.staged_procedures,
            fast_load,
            &mut report,
        );

        debug!(
            committed = report.committed,
            skipped = report.skipped,
            errors = report.diagnostics.error_count(),
            fast_load,
            "committed staged declarations"
        );
        report
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn find_typedef(&self, name: &str) -> Option<&NativeTypeDef> {
        self.typedefs.get(name)
    }

    pub fn find_defined_type(&self, name: &str) -> Option<&DefinedType> {
        self.defined_types.get(name)
    }

    pub fn find_constant(&self, name: &str) -> Option<&NativeConstant> {
        self.constants.get(name)
    }

    pub fn find_procedure(&self, name: &str) -> Option<&NativeProcedure> {
        self.procedures.get(name)
    }

    /// A defined type by `name`, or else a typedef.
    pub fn find_by_name(&self, name: &str) -> Option<NodeRef<'_>> {
        self.find_defined_type(name)
            .map(NodeRef::Defined)
            .or_else(|| self.find_typedef(name).map(NodeRef::Typedef))
    }

    pub fn typedef_mut(&mut self, name: &str) -> Option<&mut NativeTypeDef> {
        self.typedefs.get_mut(name)
    }

    pub fn defined_type_mut(&mut self, name: &str) -> Option<&mut DefinedType> {
        self.defined_types.get_mut(name)
    }

    pub fn constant_mut(&mut self, name: &str) -> Option<&mut NativeConstant> {
        self.constants.get_mut(name)
    }

    pub fn procedure_mut(&mut self, name: &str) -> Option<&mut NativeProcedure> {
        self.procedures.get_mut(name)
    }

    /// Whether a committed declaration with this identity exists.
    pub fn contains(&self, key: &DeclKey) -> bool {
        match key.category {
            DeclCategory::Typedef => self.typedefs.contains(&key.name),
            DeclCategory::DefinedType => self.defined_types.contains(&key.name),
            DeclCategory::Constant => self.constants.contains(&key.name),
            DeclCategory::Procedure => self.procedures.contains(&key.name),
        }
    }

    /// The subset of `required` that is not committed.
    pub fn missing_names<'k>(&self, required: &'k [DeclKey]) -> Vec<&'k DeclKey> {
        required.iter().filter(|key| !self.contains(key)).collect()
    }

    // ==========================================================================
    // Removal
    // ==========================================================================

    pub fn remove_typedef(&mut self, name: &str) -> Option<NativeTypeDef> {
        self.typedefs.remove(name)
    }

    pub fn remove_defined_type(&mut self, name: &str) -> Option<DefinedType> {
        self.defined_types.remove(name)
    }

    pub fn remove_constant(&mut self, name: &str) -> Option<NativeConstant> {
        self.constants.remove(name)
    }

    pub fn remove_procedure(&mut self, name: &str) -> Option<NativeProcedure> {
        self.procedures.remove(name)
    }

    // ==========================================================================
    // Iteration and counts
    // ==========================================================================

    pub fn typedefs(&self) -> &[NativeTypeDef] {
        self.typedefs.as_slice()
    }

    pub fn defined_types(&self) -> &[DefinedType] {
        self.defined_types.as_slice()
    }

    pub fn constants(&self) -> &[NativeConstant] {
        self.constants.as_slice()
    }

    pub fn procedures(&self) -> &[NativeProcedure] {
        self.procedures.as_slice()
    }

    pub fn tables_mut(&mut self) -> TablesMut<'_> {
        TablesMut {
            typedefs: self.typedefs.as_mut_slice(),
            defined_types: self.defined_types.as_mut_slice(),
            constants: self.constants.as_mut_slice(),
            procedures: self.procedures.as_mut_slice(),
        }
    }

    pub fn typedef_count(&self) -> usize {
        self.typedefs.len()
    }

    pub fn defined_type_count(&self) -> usize {
        self.defined_types.len()
    }

    pub fn constant_count(&self) -> usize {
        self.constants.len()
    }

    pub fn procedure_count(&self) -> usize {
        self.procedures.len()
    }

    /// Total committed declarations.
    pub fn len(&self) -> usize {
        self.typedefs.len() + self.defined_types.len() + self.constants.len() + self.procedures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DeclarationLookup for DeclarationStore {
    fn typedef(&self, name: &str) -> Option<&NativeTypeDef> {
        self.find_typedef(name)
    }

    fn defined_type(&self, name: &str) -> Option<&DefinedType> {
        self.find_defined_type(name)
    }
}

fn commit_category<T: Declaration>(
    table: &mut Table<T>,
    staged: &mut Staged<T>,
    fast_load: bool,
    report: &mut CommitReport,
) {
    let (entries, counts) = staged.take();
    let mut reported: FxHashSet<&str> = FxHashSet::default();

    for entry in &entries {
        let name = entry.name();
        let occurrences = counts.get(name).copied().unwrap_or(1);

        if occurrences > 1 {
            report.skipped += 1;
            if reported.insert(name) {
                report.diagnostics.report(
                    DiagnosticKind::DuplicateDeclaration,
                    Some(entry.key()),
                    format!("{} '{name}' staged {occurrences} times; none committed", T::CATEGORY),
                );
            }
            continue;
        }

        if let Some(existing) = table.get(name) {
            report.skipped += 1;
            if !existing.same_content(entry) {
                report.diagnostics.report(
                    DiagnosticKind::DuplicateDeclaration,
                    Some(entry.key()),
                    format!(
                        "{} '{name}' conflicts with the committed declaration; keeping the committed one",
                        T::CATEGORY
                    ),
                );
            } else {
                trace!(name, category = %T::CATEGORY, "identical declaration already committed");
            }
            continue;
        }

        // During fast load the table index is stale, so collisions among the
        // entries of this batch were already ruled out by `counts`.
        report.committed += 1;
        if fast_load {
            table.push_unindexed(entry.clone());
        } else {
            table.insert(entry.clone());
        }
    }

    if fast_load {
        table.rebuild_index();
    }
}
