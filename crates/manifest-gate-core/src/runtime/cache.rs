// crates/manifest-gate-core/src/runtime/cache.rs
// ============================================================================
// Module: Specification Cache
// Description: Local fallback store of previously installed package manifests.
// Purpose: Recover a manifest when the primary source cannot provide one.
// Dependencies: crate::{core, runtime}, tracing
// ============================================================================

//! ## Overview
//! Cached manifests live at `<root>/specifications/<name>-<version>.manifest`
//! as declarative documents. The cache is read-only and consulted only after
//! the primary source failed; when it cannot help, the primary failure is
//! returned untouched. An entry whose content names another package or
//! version than its file name is unusable.
//! Security posture: package names and versions are untrusted; anything that
//! could escape the specifications directory is treated as a miss.

use std::path::Path;
use std::path::PathBuf;

use crate::core::DiagnosticReport;
use crate::core::Dialect;
use crate::core::PackageManifest;
use crate::core::Version;
use crate::runtime::loader::ManifestLoader;

/// Directory under the cache root holding cached manifests.
pub const SPECIFICATIONS_DIR: &str = "specifications";

/// File extension of cached manifests.
pub const CACHE_EXTENSION: &str = "manifest";

// ============================================================================
// SECTION: Cache Entry
// ============================================================================

/// Cached manifest location for one package version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Path of the cached manifest.
    pub path: PathBuf,
}

impl CacheEntry {
    /// Returns true when `manifest` is the package version this entry is
    /// filed under. Versions compare numerically, so `1.0` matches `1.0.0`.
    #[must_use]
    pub fn describes(&self, manifest: &PackageManifest) -> bool {
        if manifest.name() != self.name {
            return false;
        }
        match (Version::parse(&self.version), Version::parse(manifest.version())) {
            (Ok(filed), Ok(loaded)) => filed == loaded,
            _ => manifest.version() == self.version,
        }
    }
}

// ============================================================================
// SECTION: Specification Cache
// ============================================================================

/// Read-only cache of package manifests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecificationCache {
    /// Cache root directory.
    root: PathBuf,
}

impl SpecificationCache {
    /// Creates a cache rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the cache root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the entry for `name` at `version` when its file exists.
    #[must_use]
    pub fn entry(&self, name: &str, version: &str) -> Option<CacheEntry> {
        if !is_safe_component(name) || !is_safe_component(version) {
            return None;
        }
        let path = self
            .root
            .join(SPECIFICATIONS_DIR)
            .join(format!("{name}-{version}.{CACHE_EXTENSION}"));
        path.is_file().then(|| CacheEntry {
            name: name.to_string(),
            version: version.to_string(),
            path,
        })
    }

    /// Returns `primary` when it succeeded; otherwise loads the cached
    /// manifest, or returns the primary failure unchanged when the cache has
    /// no usable entry.
    ///
    /// # Errors
    ///
    /// Returns the primary [`DiagnosticReport`] when the fallback fails.
    pub fn resolve(
        &self,
        primary: Result<PackageManifest, DiagnosticReport>,
        name: &str,
        version: &str,
        loader: &ManifestLoader,
    ) -> Result<PackageManifest, DiagnosticReport> {
        let report = match primary {
            Ok(manifest) => return Ok(manifest),
            Err(report) => report,
        };
        let Some(entry) = self.entry(name, version) else {
            tracing::warn!(
                package = %format!("{name}-{version}"),
                root = %self.root.display(),
                "primary source failed and no cached manifest exists"
            );
            return Err(report);
        };
        match loader.load_path(&entry.path, Some(Dialect::Declarative)) {
            Ok(manifest) if !entry.describes(&manifest) => {
                tracing::warn!(
                    path = %entry.path.display(),
                    expected = %format!("{name}-{version}"),
                    found = %manifest.full_name(),
                    "cached manifest describes another package version"
                );
                Err(report)
            }
            Ok(manifest) => {
                tracing::info!(
                    package = %manifest.full_name(),
                    path = %entry.path.display(),
                    "loaded manifest from specification cache"
                );
                Ok(manifest)
            }
            Err(cached) => {
                tracing::warn!(
                    path = %entry.path.display(),
                    error = %cached,
                    "cached manifest is unusable"
                );
                Err(report)
            }
        }
    }
}

/// Returns true when `value` is usable as part of a cache file name.
fn is_safe_component(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('.')
        && !value.contains("..")
        && !value.chars().any(|c| c == '/' || c == '\\' || c == '\0' || c.is_control())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
