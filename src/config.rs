//! Converter configuration.
//!
//! Every run gets its own [`ConverterConfig`]; nothing here is process-wide.
//! The JSON form accepts any subset of fields:
//!
//! ```json
//! {
//!   "modules": ["kernel32.dll", "user32.dll"],
//!   "search_paths": ["C:\\Windows\\System32"],
//!   "resolve_calling_conventions": true,
//!   "transform": { "methods_class": "User32" }
//! }
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use interop_exports::{FileExportSource, ModuleList};
use interop_resolver::ResolverOptions;
use interop_transform::TransformOptions;

use crate::error::{ConvertError, ConvertResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// Candidate modules for export lookup, searched in order.
    pub modules: ModuleList,
    /// Directories module files are read from. Empty means the system
    /// directory.
    pub search_paths: Vec<PathBuf>,
    /// Bind procedures to the modules exporting them.
    pub resolve_calling_conventions: bool,
    /// Cap on value-pass sweeps.
    pub max_value_passes: Option<usize>,
    /// Seed the store with the base Win32 typedefs.
    pub seed_base_typedefs: bool,
    /// Stage declaration sets without per-insert indexing.
    pub fast_load: bool,
    pub transform: TransformOptions,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        let resolver = ResolverOptions::default();
        Self {
            modules: ModuleList::default(),
            search_paths: Vec::new(),
            resolve_calling_conventions: resolver.resolve_calling_conventions,
            max_value_passes: resolver.max_value_passes,
            seed_base_typedefs: true,
            fast_load: true,
            transform: TransformOptions::default(),
        }
    }
}

impl ConverterConfig {
    pub fn from_json(json: &str) -> ConvertResult<Self> {
        serde_json::from_str(json).map_err(ConvertError::Config)
    }

    pub fn with_modules(mut self, modules: ModuleList) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn with_transform(mut self, transform: TransformOptions) -> Self {
        self.transform = transform;
        self
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            resolve_calling_conventions: self.resolve_calling_conventions,
            max_value_passes: self.max_value_passes,
        }
    }

    /// The export source the configured search paths describe.
    pub fn export_source(&self) -> FileExportSource {
        if self.search_paths.is_empty() {
            FileExportSource::system()
        } else {
            FileExportSource::new(self.search_paths.iter().cloned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interop_core::CallingConvention;

    #[test]
    fn defaults() {
        let config = ConverterConfig::default();
        assert_eq!(config.modules, ModuleList::default());
        assert!(config.seed_base_typedefs);
        assert_eq!(config.resolver_options(), ResolverOptions::default());
        assert_eq!(config.transform.constants_class, "NativeConstants");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = ConverterConfig::from_json(
            r#"{
                "modules": ["user32.dll", "gdi32.dll"],
                "search_paths": ["/opt/modules"],
                "max_value_passes": 4,
                "transform": { "methods_class": "User32", "default_convention": "cdecl" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.search_paths, vec![PathBuf::from("/opt/modules")]);
        assert_eq!(config.resolver_options().max_value_passes, Some(4));
        assert!(config.resolve_calling_conventions);
        assert_eq!(config.transform.methods_class, "User32");
        assert_eq!(config.transform.constants_class, "NativeConstants");
        assert_eq!(config.transform.default_convention, CallingConvention::Cdecl);
        assert_eq!(config.export_source().search_paths().len(), 1);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = ConverterConfig::from_json(r#"{ "modules": 3 }"#).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));
        assert!(err.to_string().starts_with("invalid configuration"));
    }
}
