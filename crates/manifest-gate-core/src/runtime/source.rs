// crates/manifest-gate-core/src/runtime/source.rs
// ============================================================================
// Module: Directory Source
// Description: Primary manifest source backed by a local directory.
// Purpose: Fetch `<name>-<version>` manifests from a project-local directory.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! `DirectorySource` looks for `<name>-<version>.gemspec`, `.yml`, then
//! `.yaml` under its root and reads the first that exists. Names and versions
//! are untrusted and must be plain file name components.

use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use crate::core::Dialect;
use crate::interfaces::MAX_MANIFEST_BYTES;
use crate::interfaces::ManifestSource;
use crate::interfaces::SourceError;
use crate::interfaces::SourcePayload;
use crate::interfaces::enforce_max_bytes;

/// Candidate extensions in lookup order.
const CANDIDATES: [(&str, Dialect); 3] = [
    ("gemspec", Dialect::Script),
    ("yml", Dialect::Declarative),
    ("yaml", Dialect::Declarative),
];

/// Directory-backed manifest source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySource {
    /// Directory holding manifests.
    root: PathBuf,
}

impl DirectorySource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
        }
    }

    /// Returns the root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the path for `stem` with `extension`.
    fn candidate(&self, stem: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{stem}.{extension}"))
    }
}

impl ManifestSource for DirectorySource {
    fn fetch(&self, name: &str, version: &str) -> Result<SourcePayload, SourceError> {
        let stem = stem(name, version)?;
        for (extension, dialect) in CANDIDATES {
            let path = self.candidate(&stem, extension);
            match read_with_limit(&path) {
                Ok(bytes) => {
                    return Ok(SourcePayload {
                        path,
                        bytes,
                        dialect: Some(dialect),
                    });
                }
                Err(SourceError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Err(SourceError::NotFound(format!("{stem} in {}", self.root.display())))
    }

    fn location(&self, name: &str, version: &str) -> PathBuf {
        self.candidate(&format!("{name}-{version}"), CANDIDATES[0].0)
    }
}

/// Builds the file stem, rejecting unsafe components.
fn stem(name: &str, version: &str) -> Result<String, SourceError> {
    for value in [name, version] {
        if value.is_empty()
            || value.starts_with('.')
            || value.contains("..")
            || value.contains(['/', '\\', '\0'])
        {
            return Err(SourceError::InvalidName(value.to_string()));
        }
    }
    Ok(format!("{name}-{version}"))
}

/// Reads at most [`MAX_MANIFEST_BYTES`] from `path`.
pub(crate) fn read_with_limit(path: &Path) -> Result<Vec<u8>, SourceError> {
    let file = File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            SourceError::NotFound(path.display().to_string())
        } else {
            SourceError::Io(err.to_string())
        }
    })?;
    let mut limited = file.take((MAX_MANIFEST_BYTES + 1) as u64);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes).map_err(|err| SourceError::Io(err.to_string()))?;
    enforce_max_bytes(bytes.len())?;
    Ok(bytes)
}
