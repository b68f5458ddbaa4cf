// crates/manifest-gate-core/src/runtime/loader.rs
// ============================================================================
// Module: Manifest Loader
// Description: Single entry point that reads, evaluates, and diagnoses manifests.
// Purpose: Hide dialect selection and failure rendering from every caller.
// Dependencies: crate::{core, interfaces, runtime}, tracing
// ============================================================================

//! ## Overview
//! [`ManifestLoader`] picks a dialect, reads the source, runs the
//! [`SandboxEvaluator`], and renders any failure through the
//! [`DiagnosticRenderer`]. Callers only ever see a [`PackageManifest`] or a
//! [`DiagnosticReport`]; I/O faults become reports too.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use crate::core::DiagnosticReport;
use crate::core::Dialect;
use crate::core::FailureKind;
use crate::core::PackageManifest;
use crate::core::SourceFailure;
use crate::interfaces::ManifestSource;
use crate::interfaces::SourceError;
use crate::runtime::cache::SpecificationCache;
use crate::runtime::render::DiagnosticRenderer;
use crate::runtime::sandbox::EvaluationContext;
use crate::runtime::sandbox::SandboxEvaluator;
use crate::runtime::source::read_with_limit;

// ============================================================================
// SECTION: Dialect Detection
// ============================================================================

/// Chooses a dialect from the file extension, then from the content.
///
/// `.yml`, `.yaml`, and `.manifest` are declarative; `.gemspec` and `.rb` are
/// scripts. Otherwise a leading `---` or a `key:` line marks a declarative
/// document, and anything else is treated as a script.
#[must_use]
pub fn detect_dialect(path: &Path, bytes: &[u8]) -> Dialect {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("yml" | "yaml" | "manifest") => return Dialect::Declarative,
        Some("gemspec" | "rb") => return Dialect::Script,
        _ => {}
    }
    let first = bytes
        .split(|&byte| byte == b'\n')
        .map(|line| line.trim_ascii())
        .find(|line| !line.is_empty() && !line.starts_with(b"#"));
    match first {
        Some(line) if line.starts_with(b"---") || is_mapping_key(line) => Dialect::Declarative,
        _ => Dialect::Script,
    }
}

/// Returns true for `identifier:` followed by whitespace or end of line.
fn is_mapping_key(line: &[u8]) -> bool {
    let key_len = line
        .iter()
        .position(|&byte| !(byte.is_ascii_alphanumeric() || byte == b'_'))
        .unwrap_or(line.len());
    if key_len == 0 || line[0].is_ascii_digit() {
        return false;
    }
    match &line[key_len ..] {
        [b':'] => true,
        [b':', next, ..] => next.is_ascii_whitespace(),
        _ => false,
    }
}

// ============================================================================
// SECTION: Manifest Loader
// ============================================================================

/// Loads manifests and renders failures.
#[derive(Debug, Clone, Default)]
pub struct ManifestLoader {
    /// Evaluator for both dialects.
    evaluator: SandboxEvaluator,
    /// Renderer for failures.
    renderer: DiagnosticRenderer,
}

impl ManifestLoader {
    /// Creates a loader evaluating under `context`.
    #[must_use]
    pub fn new(context: EvaluationContext) -> Self {
        Self {
            evaluator: SandboxEvaluator::new(context),
            renderer: DiagnosticRenderer::default(),
        }
    }

    /// Sets the number of context lines shown around a failing line.
    #[must_use]
    pub fn with_context_radius(mut self, radius: usize) -> Self {
        self.renderer = DiagnosticRenderer::new(radius);
        self
    }

    /// Returns the evaluator.
    #[must_use]
    pub const fn evaluator(&self) -> &SandboxEvaluator {
        &self.evaluator
    }

    /// Returns the renderer.
    #[must_use]
    pub const fn renderer(&self) -> &DiagnosticRenderer {
        &self.renderer
    }

    /// Reads and evaluates the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`DiagnosticReport`] when the file cannot be read or fails
    /// to evaluate.
    #[tracing::instrument(
        name = "manifest_gate.loader.load_path",
        skip_all,
        fields(path = %path.display())
    )]
    pub fn load_path(
        &self,
        path: &Path,
        hint: Option<Dialect>,
    ) -> Result<PackageManifest, DiagnosticReport> {
        match read_with_limit(path) {
            Ok(bytes) => self.load_bytes(&bytes, path, hint),
            Err(err) => {
                tracing::warn!(error = %err, "manifest could not be read");
                let failure = SourceFailure::new(
                    FailureKind::EvaluationFailure,
                    format!("cannot read manifest: {err}"),
                    path,
                    0,
                );
                Err(self.renderer.render(failure, path))
            }
        }
    }

    /// Evaluates manifest bytes that were read from `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`DiagnosticReport`] when evaluation fails.
    pub fn load_bytes(
        &self,
        bytes: &[u8],
        path: &Path,
        hint: Option<Dialect>,
    ) -> Result<PackageManifest, DiagnosticReport> {
        let dialect = hint.unwrap_or_else(|| detect_dialect(path, bytes));
        tracing::debug!(
            path = %path.display(),
            dialect = dialect.as_str(),
            bytes = bytes.len(),
            "evaluating manifest"
        );
        match self.evaluator.evaluate(bytes, path, dialect) {
            Ok(manifest) => {
                tracing::debug!(
                    package = %manifest.full_name(),
                    dependencies = manifest.dependencies().len(),
                    "manifest loaded"
                );
                Ok(manifest)
            }
            Err(failure) => {
                tracing::warn!(
                    kind = failure.kind.as_str(),
                    source = %failure.source_path.display(),
                    line = failure.line,
                    message = %failure.message,
                    "manifest evaluation failed"
                );
                Err(self.renderer.render_with_source(failure, path, Some(bytes)))
            }
        }
    }

    /// Loads `name`-`version` from `primary`, falling back to `cache` when
    /// the primary source fails.
    ///
    /// # Errors
    ///
    /// Returns the primary source's [`DiagnosticReport`] when it fails and
    /// the cache has no usable entry.
    pub fn load_package(
        &self,
        name: &str,
        version: &str,
        primary: &dyn ManifestSource,
        cache: Option<&SpecificationCache>,
    ) -> Result<PackageManifest, DiagnosticReport> {
        let result = match primary.fetch(name, version) {
            Ok(payload) => self.load_bytes(&payload.bytes, &payload.path, payload.dialect),
            Err(err) => Err(self.source_report(&err, &primary.location(name, version))),
        };
        match cache {
            Some(cache) => cache.resolve(result, name, version, self),
            None => result,
        }
    }

    /// Renders a primary-source fault.
    fn source_report(&self, err: &SourceError, location: &Path) -> DiagnosticReport {
        tracing::warn!(location = %location.display(), error = %err, "primary source failed");
        let failure =
            SourceFailure::new(FailureKind::EvaluationFailure, err.to_string(), location, 0);
        self.renderer.render(failure, location)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::detect_dialect;
    use crate::core::Dialect;

    #[test]
    fn extension_wins_over_content() {
        assert_eq!(detect_dialect(Path::new("a.yml"), b"Gem::Specification"), Dialect::Declarative);
        assert_eq!(detect_dialect(Path::new("a.gemspec"), b"name: a"), Dialect::Script);
    }

    #[test]
    fn content_sniffing_distinguishes_mappings_from_scripts() {
        let path = Path::new("manifest");
        assert_eq!(detect_dialect(path, b"---\nname: a\n"), Dialect::Declarative);
        assert_eq!(detect_dialect(path, b"# c\nname: a\n"), Dialect::Declarative);
        assert_eq!(detect_dialect(path, b"Gem::Specification.new do |s|\n"), Dialect::Script);
        assert_eq!(detect_dialect(path, b"VERSION = '1'\n"), Dialect::Script);
        assert_eq!(detect_dialect(path, b"a::b\n"), Dialect::Script);
    }
}
