// crates/manifest-gate-core/src/interfaces/mod.rs
// ============================================================================
// Module: Manifest Gate Interfaces
// Description: Primary manifest source contract.
// Purpose: Let callers plug in where package manifests come from.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! A [`ManifestSource`] is the primary place a package manifest is fetched
//! from. Retrieval over the network is outside this crate; the bundled
//! [`crate::runtime::DirectorySource`] reads a local directory. Sources must
//! fail closed: oversized payloads, invalid names, and I/O faults are errors,
//! never partial reads.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

use crate::core::Dialect;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum manifest source size accepted anywhere in the crate.
pub const MAX_MANIFEST_BYTES: usize = 1024 * 1024;

/// Returns an error when a payload exceeds [`MAX_MANIFEST_BYTES`].
///
/// # Errors
///
/// Returns [`SourceError::TooLarge`] for oversized payloads.
pub const fn enforce_max_bytes(actual_bytes: usize) -> Result<(), SourceError> {
    if actual_bytes > MAX_MANIFEST_BYTES {
        return Err(SourceError::TooLarge {
            max_bytes: MAX_MANIFEST_BYTES,
            actual_bytes,
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Source Payload
// ============================================================================

/// Manifest bytes fetched from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePayload {
    /// Path the bytes were read from; used for diagnostics and includes.
    pub path: PathBuf,
    /// Raw manifest bytes.
    pub bytes: Vec<u8>,
    /// Dialect hint, when the source knows it.
    pub dialect: Option<Dialect>,
}

// ============================================================================
// SECTION: Source Errors
// ============================================================================

/// Errors emitted by manifest sources.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No manifest exists for the requested package.
    #[error("manifest not found: {0}")]
    NotFound(String),
    /// Source reported an I/O failure.
    #[error("io failure: {0}")]
    Io(String),
    /// Package name or version is not a safe file name component.
    #[error("invalid package reference: {0}")]
    InvalidName(String),
    /// Payload exceeded the byte limit.
    #[error("manifest exceeds size limit: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual payload size in bytes.
        actual_bytes: usize,
    },
}

// ============================================================================
// SECTION: Source Trait
// ============================================================================

/// Fetches package manifests by name and version.
pub trait ManifestSource: Send + Sync {
    /// Fetches manifest bytes for `name` at `version`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the manifest cannot be fetched.
    fn fetch(&self, name: &str, version: &str) -> Result<SourcePayload, SourceError>;

    /// Returns the path the manifest is expected at, for diagnostics when
    /// fetching fails.
    fn location(&self, name: &str, version: &str) -> PathBuf;
}
