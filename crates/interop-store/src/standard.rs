//! Base declarations a fresh store is seeded with.

use interop_core::{BuiltinKind, NativeType, NativeTypeDef};

/// Handle typedefs that are opaque `void*` aliases.
const HANDLE_TYPEDEFS: &[&str] = &["HWND", "HMENU", "HACCEL", "HBRUSH", "HFONT", "HDC", "HICON"];

/// The base Win32 typedefs: sized integer aliases and the common handle types.
pub fn base_typedefs() -> Vec<NativeTypeDef> {
    let mut typedefs = vec![
        NativeTypeDef::new("SIZE_T", NativeType::unsigned(BuiltinKind::Int32)),
        NativeTypeDef::new("DWORD64", NativeType::unsigned(BuiltinKind::Int64)),
    ];
    typedefs.extend(
        HANDLE_TYPEDEFS
            .iter()
            .map(|name| NativeTypeDef::new(*name, NativeType::pointer(NativeType::void()))),
    );
    typedefs
}
