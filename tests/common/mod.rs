//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use interop_core::{
    BuiltinKind, DefinedType, NamedType, NativeRecord, NativeType, NativeTypeDef,
};
use interop_exports::MemoryExportSource;
use interop_gen::{Converter, ConverterConfig, DeclarationSet};

fn typedef(name: &str, target: impl Into<NativeType>) -> NativeTypeDef {
    NativeTypeDef::new(name, target)
}

fn named(name: &str) -> NativeType {
    NativeType::named(name)
}

fn const_named(name: &str) -> NativeType {
    NativeType::Named(NamedType::constant(name))
}

/// The standard test declarations: the common Win32 aliases, the string
/// pointer family, and a handful of structs including a self-referential one.
pub fn standard_declarations() -> DeclarationSet {
    DeclarationSet::new()
        .with_typedef(typedef("BOOL", NativeType::builtin(BuiltinKind::Int32)))
        .with_typedef(typedef("DWORD", NativeType::unsigned(BuiltinKind::Int32)))
        .with_typedef(typedef("BYTE", NativeType::unsigned(BuiltinKind::Byte)))
        .with_typedef(typedef("UINT_PTR", NativeType::unsigned(BuiltinKind::Int32)))
        .with_typedef(typedef("WPARAM", named("UINT_PTR")))
        .with_typedef(typedef("LPARAM", NativeType::builtin(BuiltinKind::Int32)))
        .with_typedef(typedef("WCHAR", NativeType::builtin(BuiltinKind::WChar)))
        .with_typedef(typedef("CHAR", NativeType::builtin(BuiltinKind::Char)))
        .with_typedef(typedef("TCHAR", named("WCHAR")))
        .with_typedef(typedef("LPWSTR", NativeType::pointer(named("WCHAR"))))
        .with_typedef(typedef("LPCWSTR", NativeType::pointer(const_named("WCHAR"))))
        .with_typedef(typedef("LPSTR", NativeType::pointer(named("CHAR"))))
        .with_typedef(typedef("LPTSTR", NativeType::pointer(named("TCHAR"))))
        .with_typedef(typedef("LPCSTR", NativeType::pointer(const_named("CHAR"))))
        .with_typedef(typedef("LPCTSTR", NativeType::pointer(const_named("TCHAR"))))
        .with_typedef(typedef("OLECHAR", named("WCHAR")))
        .with_typedef(typedef("BSTR", NativeType::pointer(named("OLECHAR"))))
        .with_defined_type(DefinedType::Struct(
            NativeRecord::new("RecursiveStruct")
                .with_member("m1", NativeType::pointer(named("RecursiveStruct"))),
        ))
        .with_defined_type(DefinedType::Struct(
            NativeRecord::new("S1").with_member("m1", BuiltinKind::Int32),
        ))
        .with_defined_type(DefinedType::Struct(
            NativeRecord::new("tagDEC")
                .with_member("wReserved", NativeType::unsigned(BuiltinKind::Int16))
                .with_member("scale", named("BYTE"))
                .with_member("sign", named("BYTE"))
                .with_member("Hi32", named("DWORD"))
                .with_member("Lo64", NativeType::unsigned(BuiltinKind::Int64)),
        ))
        .with_typedef(typedef("DECIMAL", named("tagDEC")))
        .with_defined_type(DefinedType::Struct(
            NativeRecord::new("tagCY").with_member("int64", BuiltinKind::Int64),
        ))
        .with_typedef(typedef("CY", named("tagCY")))
        .with_typedef(typedef("CURRENCY", named("CY")))
}

/// A converter that never touches the file system for export tables.
pub fn offline_converter() -> Converter {
    Converter::new(ConverterConfig {
        resolve_calling_conventions: false,
        ..ConverterConfig::default()
    })
}

/// `kernel32.dll` and `user32.dll` with a few well-known exports.
pub fn win32_exports() -> MemoryExportSource {
    MemoryExportSource::new()
        .with_module(
            "kernel32.dll",
            ["Beep", "GetTickCount", "GetExitCodeProcess", "lstrlenW", "Sleep"],
        )
        .with_module(
            "user32.dll",
            ["GetWindowTextW", "GetCursorPos", "MessageBoxW", "wsprintfW"],
        )
}

/// Install a test-writer subscriber so `tracing` output shows up with
/// `--nocapture`. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
