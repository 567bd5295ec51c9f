//! Persisted store snapshots.
//!
//! A snapshot is a JSON document with a format version and four sections,
//! `typedefs`, `defined_types`, `constants` and `procedures`. References
//! between entries are written by name: an inline typedef, struct, union or
//! enum that the store also holds as its own entry is written as a reference
//! to it, so cyclic graphs serialize finitely.
//!
//! Loading is forgiving per entry. An entry that fails to decode, or that
//! carries an empty name or reference, is reported as a
//! [`MalformedEntry`](interop_core::DiagnosticKind::MalformedEntry) diagnostic
//! and skipped. Only a document that is not a snapshot at all fails with
//! [`StoreError`].

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use interop_core::{
    DeclCategory, DeclKey, Declaration, DefinedType, Diagnostic, DiagnosticKind, Diagnostics,
    NativeConstant, NativeProcedure, NativeType, NativeTypeDef, StoreError,
};

use crate::DeclarationStore;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

const TYPEDEFS: &str = "typedefs";
const DEFINED_TYPES: &str = "defined_types";
const CONSTANTS: &str = "constants";
const PROCEDURES: &str = "procedures";

#[derive(Serialize)]
struct SnapshotDocument<'a> {
    version: u32,
    typedefs: Vec<NativeTypeDef>,
    defined_types: Vec<DefinedType>,
    constants: &'a [NativeConstant],
    procedures: Vec<NativeProcedure>,
}

/// A store read back from a snapshot, with the per-entry problems found.
#[derive(Debug)]
pub struct LoadedStore {
    pub store: DeclarationStore,
    pub diagnostics: Diagnostics,
}

impl DeclarationStore {
    /// Encode the committed declarations. Staged entries are not included.
    pub fn serialize(&self) -> Result<Vec<u8>, StoreError> {
        let document = SnapshotDocument {
            version: SNAPSHOT_VERSION,
            typedefs: self
                .typedefs()
                .iter()
                .map(|td| {
                    let mut td = td.clone();
                    td.for_each_type_mut(&mut |ty| *ty = hoist(ty, self));
                    td
                })
                .collect(),
            defined_types: self
                .defined_types()
                .iter()
                .map(|d| {
                    let mut d = d.clone();
                    d.for_each_type_mut(&mut |ty| *ty = hoist(ty, self));
                    d
                })
                .collect(),
            constants: self.constants(),
            procedures: self
                .procedures()
                .iter()
                .map(|p| {
                    let mut p = p.clone();
                    p.for_each_type_mut(&mut |ty| *ty = hoist(ty, self));
                    p
                })
                .collect(),
        };

        let bytes = serde_json::to_vec_pretty(&document).map_err(|e| StoreError::Encode {
            reason: e.to_string(),
        })?;
        debug!(bytes = bytes.len(), declarations = self.len(), "serialized declaration store");
        Ok(bytes)
    }

    /// Decode a snapshot into a fresh store.
    pub fn deserialize(bytes: &[u8]) -> Result<LoadedStore, StoreError> {
        let mut store = DeclarationStore::new();
        let diagnostics = store.load(bytes)?;
        Ok(LoadedStore { store, diagnostics })
    }

    /// Stage every readable entry of a snapshot and commit them.
    ///
    /// Uses fast-load for the bulk insert and restores the previous mode after.
    /// Returns the skipped-entry diagnostics together with any commit
    /// diagnostics (e.g. a snapshot entry conflicting with a committed one).
    pub fn load(&mut self, bytes: &[u8]) -> Result<Diagnostics, StoreError> {
        let document: Value =
            serde_json::from_slice(bytes).map_err(|e| StoreError::MalformedSnapshot {
                reason: e.to_string(),
            })?;
        let root = document
            .as_object()
            .ok_or_else(|| malformed("snapshot root is not an object"))?;

        let version = root
            .get("version")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("missing format version"))?;
        if version != u64::from(SNAPSHOT_VERSION) {
            return Err(StoreError::UnsupportedVersion {
                found: u32::try_from(version).unwrap_or(u32::MAX),
                expected: SNAPSHOT_VERSION,
            });
        }

        let typedefs = section(root, TYPEDEFS)?;
        let defined_types = section(root, DEFINED_TYPES)?;
        let constants = section(root, CONSTANTS)?;
        let procedures = section(root, PROCEDURES)?;

        let mut diagnostics = Diagnostics::new();
        let was_fast = self.is_fast_load();
        self.set_fast_load(true);

        for entry in decode_entries::<NativeTypeDef>(typedefs, &mut diagnostics) {
            self.add_typedef(entry);
        }
        for entry in decode_entries::<DefinedType>(defined_types, &mut diagnostics) {
            self.add_defined_type(entry);
        }
        for entry in decode_entries::<NativeConstant>(constants, &mut diagnostics) {
            self.add_constant(entry);
        }
        for entry in decode_entries::<NativeProcedure>(procedures, &mut diagnostics) {
            self.add_procedure(entry);
        }

        let report = self.commit();
        self.set_fast_load(was_fast);
        diagnostics.append(report.diagnostics);

        debug!(
            committed = report.committed,
            skipped = diagnostics.of_kind(DiagnosticKind::MalformedEntry).count(),
            "loaded declaration store snapshot"
        );
        Ok(diagnostics)
    }
}

fn malformed(reason: &str) -> StoreError {
    StoreError::MalformedSnapshot {
        reason: reason.to_string(),
    }
}

/// A top-level section. Absent sections are empty; a section of the wrong
/// shape makes the whole document unreadable.
fn section<'v>(
    root: &'v serde_json::Map<String, Value>,
    name: &str,
) -> Result<&'v [Value], StoreError> {
    match root.get(name) {
        None => Ok(&[]),
        Some(Value::Array(entries)) => Ok(entries),
        Some(_) => Err(StoreError::MalformedSnapshot {
            reason: format!("section '{name}' is not a list"),
        }),
    }
}

fn decode_entries<T>(entries: &[Value], diagnostics: &mut Diagnostics) -> Vec<T>
where
    T: Declaration + DeserializeOwned,
{
    let mut out = Vec::with_capacity(entries.len());
    for (position, raw) in entries.iter().enumerate() {
        let subject = raw
            .get("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(|name| DeclKey::new(T::CATEGORY, name));

        match decode_entry::<T>(raw) {
            Ok(entry) => out.push(entry),
            Err(reason) => diagnostics.push(Diagnostic::new(
                DiagnosticKind::MalformedEntry,
                subject,
                format!("{} entry #{position} skipped: {reason}", T::CATEGORY),
            )),
        }
    }
    out
}

fn decode_entry<T>(raw: &Value) -> Result<T, String>
where
    T: Declaration + DeserializeOwned,
{
    let mut entry: T = T::deserialize(raw).map_err(|e| e.to_string())?;
    if entry.name().is_empty() {
        return Err("missing name".to_string());
    }

    let mut empty_reference = false;
    entry.for_each_named_mut(&mut |named| empty_reference |= named.name.is_empty());
    if empty_reference {
        return Err("reference with an empty name".to_string());
    }
    Ok(entry)
}

/// Replace inline named definitions the store holds on their own with
/// references to them.
fn hoist(ty: &NativeType, store: &DeclarationStore) -> NativeType {
    let held = match ty {
        NativeType::TypeDef(td) => store.contains(&DeclKey::new(DeclCategory::Typedef, td.name.as_str())),
        NativeType::Struct(_) | NativeType::Union(_) | NativeType::Enum(_) => ty
            .name()
            .is_some_and(|name| store.contains(&DeclKey::defined(name))),
        _ => false,
    };
    match (held, ty.name()) {
        (true, Some(name)) => NativeType::named(name),
        _ => ty.map_children(&|child| hoist(child, store)),
    }
}
