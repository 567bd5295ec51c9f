//! Declaration store for the native interop generator.
//!
//! [`DeclarationStore`] holds committed typedefs, defined types, constants and
//! procedures, each keyed by exact name within its category. Additions are
//! staged and become visible only through [`DeclarationStore::commit`].
//!
//! # Example
//!
//! ```
//! use interop_core::{NativeConstant, NativeType, NativeTypeDef, BuiltinKind};
//! use interop_store::DeclarationStore;
//!
//! let mut store = DeclarationStore::with_base_typedefs();
//! store.add_typedef(NativeTypeDef::new("DWORD", NativeType::unsigned(BuiltinKind::Int32)));
//! store.add_constant(NativeConstant::from_macro("WM_PAINT", "0x000F"));
//! assert!(store.find_constant("WM_PAINT").is_none());
//!
//! let report = store.commit();
//! assert!(report.is_clean());
//! assert!(store.find_typedef("DWORD").is_some());
//!
//! let bytes = store.serialize().unwrap();
//! let loaded = DeclarationStore::deserialize(&bytes).unwrap();
//! assert_eq!(loaded.store.len(), store.len());
//! ```

mod snapshot;
pub mod standard;
mod store;
mod table;

pub use snapshot::{LoadedStore, SNAPSHOT_VERSION};
pub use store::{CommitReport, DeclarationStore, TablesMut};
pub use table::Table;
