//! Candidate module lists.

use serde::{Deserialize, Serialize};

/// Modules searched when no list is configured.
pub const DEFAULT_MODULES: &[&str] = &[
    "kernel32.dll",
    "user32.dll",
    "advapi32.dll",
    "gdi32.dll",
    "shell32.dll",
    "shlwapi.dll",
    "ntdll.dll",
    "version.dll",
    "winmm.dll",
    "ws2_32.dll",
];

/// Less common modules, searched only when asked for.
pub const EXTENDED_MODULES: &[&str] = &[
    "oleaut32.dll",
    "ole32.dll",
    "msvcrt.dll",
    "msimg32.dll",
    "winscard.dll",
    "winspool.drv",
    "comctl32.dll",
];

/// An ordered list of module names. Earlier modules win when more than one
/// exports the same name.
///
/// Names compare case-insensitively; adding a module already in the list is a
/// no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleList(Vec<String>);

impl ModuleList {
    pub fn empty() -> Self {
        ModuleList(Vec::new())
    }

    pub fn new<I, S>(modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::empty();
        list.extend(modules);
        list
    }

    /// The default list followed by the less common modules.
    pub fn extended() -> Self {
        let mut list = Self::default();
        list.extend(EXTENDED_MODULES.iter().copied());
        list
    }

    pub fn push(&mut self, module: impl Into<String>) {
        let module = module.into();
        if !self.contains(&module) {
            self.0.push(module);
        }
    }

    pub fn contains(&self, module: &str) -> bool {
        self.0.iter().any(|m| m.eq_ignore_ascii_case(module))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for ModuleList {
    fn default() -> Self {
        Self::new(DEFAULT_MODULES.iter().copied())
    }
}

impl<S: Into<String>> Extend<S> for ModuleList {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for module in iter {
            self.push(module);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_starts_with_kernel32() {
        let list = ModuleList::default();
        assert_eq!(list.get(0), Some("kernel32.dll"));
        assert_eq!(list.len(), DEFAULT_MODULES.len());
    }

    #[test]
    fn extended_appends_after_defaults() {
        let list = ModuleList::extended();
        assert_eq!(list.len(), DEFAULT_MODULES.len() + EXTENDED_MODULES.len());
        assert_eq!(list.get(DEFAULT_MODULES.len()), Some("oleaut32.dll"));
    }

    #[test]
    fn push_ignores_duplicates_case_insensitively() {
        let mut list = ModuleList::empty();
        list.push("User32.dll");
        list.push("user32.DLL");
        list.push("gdi32.dll");
        assert_eq!(list.iter().collect::<Vec<_>>(), ["User32.dll", "gdi32.dll"]);
    }

    #[test]
    fn serializes_as_plain_list() {
        let list = ModuleList::new(["a.dll", "b.dll"]);
        assert_eq!(serde_json::to_string(&list).unwrap(), r#"["a.dll","b.dll"]"#);
        let back: ModuleList = serde_json::from_str(r#"["x.dll"]"#).unwrap();
        assert!(back.contains("X.DLL"));
    }
}
