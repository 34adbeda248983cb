//! Compiler configuration: module search paths and per-run flags.
//!
//! A plain builder struct an embedder fills in before compiling, narrowed to
//! what this crate's in-scope pipeline actually needs: module search paths
//! and the debug-memory toggle. There is no FFI builtin extension point here
//! (BreadLang has no such hook); [`ManifestConfig`] instead gives an on-disk
//! project file a way to configure those same two knobs, loaded the way a
//! lint-rule TOML file would be.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Project manifest (`bread.toml`), the on-disk counterpart of
/// [`CompilerConfig`]. Fields here only ever *extend* a [`CompilerConfig`]
/// built from CLI flags; they never override flags the caller passed
/// explicitly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestConfig {
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
    #[serde(default)]
    pub debug_memory: bool,
}

impl ManifestConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("failed to parse bread.toml: {e}"))
    }
}

/// Configuration for a single parse→link→analyze run.
#[derive(Debug, Clone, Default)]
pub struct CompilerConfig {
    /// Additional directories tried, in declaration order, after the
    /// importing file's own directory.
    pub search_paths: Vec<PathBuf>,
    /// Enables `bread_core::memory_stats` tracking for the run, surfaced as
    /// `breadc --debug-memory`.
    pub debug_memory: bool,
}

impl CompilerConfig {
    pub fn new() -> Self {
        CompilerConfig::default()
    }

    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    pub fn with_debug_memory(mut self, enabled: bool) -> Self {
        self.debug_memory = enabled;
        self
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Folds a parsed `bread.toml` in: its search paths are appended after
    /// whatever the caller already configured, and `debug_memory` is OR'd in
    /// so a manifest can only turn tracking on, never silently off.
    pub fn with_manifest(mut self, manifest: ManifestConfig) -> Self {
        self.search_paths.extend(manifest.search_paths);
        self.debug_memory = self.debug_memory || manifest.debug_memory;
        self
    }
}

/// Default search paths (`.`, `./lib`, `./modules`) an embedder gets if it
/// builds a `CompilerConfig` with no explicit search paths at all.
pub fn default_search_paths(entry_dir: &Path) -> Vec<PathBuf> {
    vec![entry_dir.to_path_buf(), entry_dir.join("lib"), entry_dir.join("modules")]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_config_parses_search_paths_and_debug_memory() {
        let manifest = ManifestConfig::from_toml(
            r#"
            search_paths = ["lib", "vendor/modules"]
            debug_memory = true
            "#,
        )
        .unwrap();
        assert_eq!(manifest.search_paths, vec![PathBuf::from("lib"), PathBuf::from("vendor/modules")]);
        assert!(manifest.debug_memory);
    }

    #[test]
    fn manifest_config_defaults_when_fields_absent() {
        let manifest = ManifestConfig::from_toml("").unwrap();
        assert!(manifest.search_paths.is_empty());
        assert!(!manifest.debug_memory);
    }

    #[test]
    fn manifest_config_rejects_malformed_toml() {
        assert!(ManifestConfig::from_toml("search_paths = [").is_err());
    }

    #[test]
    fn with_manifest_extends_rather_than_replaces() {
        let config = CompilerConfig::new()
            .with_search_path("cli-path")
            .with_manifest(ManifestConfig { search_paths: vec![PathBuf::from("toml-path")], debug_memory: true });
        assert_eq!(config.search_paths(), &[PathBuf::from("cli-path"), PathBuf::from("toml-path")]);
        assert!(config.debug_memory);
    }

    #[test]
    fn default_search_paths_orders_entry_dir_then_lib_then_modules() {
        let paths = default_search_paths(Path::new("/proj"));
        assert_eq!(
            paths,
            vec![PathBuf::from("/proj"), PathBuf::from("/proj/lib"), PathBuf::from("/proj/modules")]
        );
    }
}
