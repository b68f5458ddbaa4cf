// crates/manifest-gate-core/src/core/model.rs
// ============================================================================
// Module: Manifest Model
// Description: Canonical package manifest and dependency structures.
// Purpose: Provide the single structure both manifest dialects decode into.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! [`PackageManifest`] is produced only through [`ManifestDraft::finish`], so a
//! manifest handed to a caller always has a name and a version. Fields are
//! read through accessors; a produced manifest is never mutated.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::encoding::TextEncoding;

// ============================================================================
// SECTION: Dialect
// ============================================================================

/// Surface syntax of a manifest source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// Declarative YAML document.
    Declarative,
    /// Embedded builder script.
    Script,
}

impl Dialect {
    /// Returns the stable label for logs and messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Declarative => "declarative",
            Self::Script => "script",
        }
    }
}

// ============================================================================
// SECTION: Dependencies
// ============================================================================

/// Requirement recorded when a dependency declares none.
pub const DEFAULT_REQUIREMENT: &str = ">= 0";

/// Dependency class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// Needed at run time.
    #[default]
    Runtime,
    /// Needed only for development.
    Development,
}

/// Declared dependency on another package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name.
    pub name: String,
    /// Version requirement, e.g. `">= 1.0, < 3"`.
    pub requirement: String,
    /// Dependency class.
    #[serde(rename = "type", default)]
    pub kind: DependencyKind,
}

impl Dependency {
    /// Creates a dependency from a name and requirement fragments.
    ///
    /// Empty `requirements` yields [`DEFAULT_REQUIREMENT`]; several are joined
    /// with `", "`.
    #[must_use]
    pub fn new(name: impl Into<String>, requirements: &[String], kind: DependencyKind) -> Self {
        let requirement = if requirements.is_empty() {
            DEFAULT_REQUIREMENT.to_string()
        } else {
            requirements.join(", ")
        };
        Self {
            name: name.into(),
            requirement,
            kind,
        }
    }
}

// ============================================================================
// SECTION: Package Manifest
// ============================================================================

/// Canonical package manifest.
///
/// # Invariants
/// - `name` and `version` are non-empty.
/// - `dependencies` keep declaration order; names may repeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageManifest {
    /// Package name.
    name: String,
    /// Package version, kept as written.
    version: String,
    /// One-line summary.
    summary: Option<String>,
    /// Authors in declaration order.
    authors: Vec<String>,
    /// Long description.
    description: Option<String>,
    /// Project homepage.
    homepage: Option<String>,
    /// License identifiers.
    licenses: Vec<String>,
    /// Declared dependencies.
    dependencies: Vec<Dependency>,
    /// Required host runtime version expression.
    required_runtime_version: Option<String>,
    /// Source the manifest was loaded from.
    source_path: PathBuf,
    /// Text encoding the source was decoded with.
    encoding: TextEncoding,
}

impl PackageManifest {
    /// Returns the package name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the package version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the summary.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Returns the first author.
    #[must_use]
    pub fn author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }

    /// Returns all authors.
    #[must_use]
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the homepage.
    #[must_use]
    pub fn homepage(&self) -> Option<&str> {
        self.homepage.as_deref()
    }

    /// Returns the license identifiers.
    #[must_use]
    pub fn licenses(&self) -> &[String] {
        &self.licenses
    }

    /// Returns the dependencies in declaration order.
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Returns the required host runtime version expression.
    #[must_use]
    pub fn required_runtime_version(&self) -> Option<&str> {
        self.required_runtime_version.as_deref()
    }

    /// Returns the source path.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns the text encoding the source was decoded with.
    #[must_use]
    pub const fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Returns `name-version`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }

    /// Compares logical content, ignoring where and how the manifest was read.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.version == other.version
            && self.summary == other.summary
            && self.authors == other.authors
            && self.description == other.description
            && self.homepage == other.homepage
            && self.licenses == other.licenses
            && self.dependencies == other.dependencies
            && self.required_runtime_version == other.required_runtime_version
    }
}

// ============================================================================
// SECTION: Draft
// ============================================================================

/// Manifest completion failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    /// A required attribute was never set or is empty.
    #[error("missing value for attribute {0}")]
    MissingAttribute(&'static str),
}

/// Mutable manifest under construction by an evaluator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestDraft {
    /// Package name.
    pub name: Option<String>,
    /// Package version.
    pub version: Option<String>,
    /// Summary.
    pub summary: Option<String>,
    /// Authors.
    pub authors: Vec<String>,
    /// Description.
    pub description: Option<String>,
    /// Homepage.
    pub homepage: Option<String>,
    /// License identifiers.
    pub licenses: Vec<String>,
    /// Dependencies.
    pub dependencies: Vec<Dependency>,
    /// Required runtime version expression.
    pub required_runtime_version: Option<String>,
}

impl ManifestDraft {
    /// Completes the draft into an immutable manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError::MissingAttribute`] when `name` or `version`
    /// is absent or blank.
    pub fn finish(
        self,
        source_path: PathBuf,
        encoding: TextEncoding,
    ) -> Result<PackageManifest, ManifestError> {
        let name = required(self.name, "name")?;
        let version = required(self.version, "version")?;
        Ok(PackageManifest {
            name,
            version,
            summary: self.summary,
            authors: self.authors,
            description: self.description,
            homepage: self.homepage,
            licenses: self.licenses,
            dependencies: self.dependencies,
            required_runtime_version: self.required_runtime_version,
            source_path,
            encoding,
        })
    }
}

/// Returns the trimmed value or a missing-attribute error.
fn required(value: Option<String>, attribute: &'static str) -> Result<String, ManifestError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ManifestError::MissingAttribute(attribute)),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
