// crates/manifest-gate-core/src/core/diagnostic.rs
// ============================================================================
// Module: Diagnostics
// Description: Classified evaluation failures and rendered diagnostic reports.
// Purpose: Describe a failing manifest precisely enough to point at its line.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! An evaluator reports a [`SourceFailure`]: what went wrong, in which file,
//! on which line. The renderer turns it into a [`DiagnosticReport`] by
//! attaching the manifest the caller asked for and a window of raw source
//! lines. Reports are rendered as bytes so file names and source lines that
//! are not valid text survive unchanged.

use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Failure Classification
// ============================================================================

/// Class of a manifest loading failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Malformed document or script grammar violation.
    SyntaxFailure,
    /// Source bytes invalid for the assumed encoding.
    EncodingFailure,
    /// Script raised while executing, or the source could not be read.
    EvaluationFailure,
}

impl FailureKind {
    /// Returns the stable label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SyntaxFailure => "syntax_failure",
            Self::EncodingFailure => "encoding_failure",
            Self::EvaluationFailure => "evaluation_failure",
        }
    }
}

/// Classified failure with source attribution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SourceFailure {
    /// Failure class.
    pub kind: FailureKind,
    /// Failure message.
    pub message: String,
    /// File the failure occurred in.
    pub source_path: PathBuf,
    /// 1-based line; `0` when unknown.
    pub line: usize,
}

impl SourceFailure {
    /// Creates a failure.
    #[must_use]
    pub fn new(
        kind: FailureKind,
        message: impl Into<String>,
        source_path: impl Into<PathBuf>,
        line: usize,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source_path: source_path.into(),
            line,
        }
    }
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// Prefix of context lines.
pub const CONTEXT_PREFIX: &[u8] = b" #  ";
/// Prefix of the failing line.
pub const MARKER_PREFIX: &[u8] = b" >  ";
/// Separator framing the context window.
pub const SEPARATOR: &[u8] = b" #  -------------------------------------------";

/// Role of a line inside the context window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineTag {
    /// The failing line.
    Marker,
    /// A surrounding line.
    Context,
}

/// One raw source line of the context window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextLine {
    /// 1-based line number.
    pub number: usize,
    /// Role of the line.
    pub tag: LineTag,
    /// Line bytes without the trailing line terminator.
    pub bytes: Vec<u8>,
}

/// Rendered-ready diagnostic for a failed manifest load.
///
/// # Invariants
/// - `context` is empty when `line` is `0` or the source was unreadable;
///   otherwise exactly one entry is tagged [`LineTag::Marker`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DiagnosticReport {
    /// Failure class.
    kind: FailureKind,
    /// Absolute path of the file the failure occurred in.
    source_path: PathBuf,
    /// 1-based failing line; `0` when unknown.
    line: usize,
    /// Failure message.
    message: String,
    /// Manifest the caller asked to load.
    manifest_path: PathBuf,
    /// Context window.
    context: Vec<ContextLine>,
}

impl DiagnosticReport {
    /// Creates a report.
    #[must_use]
    pub fn new(
        failure: SourceFailure,
        manifest_path: PathBuf,
        context: Vec<ContextLine>,
    ) -> Self {
        let SourceFailure {
            kind,
            message,
            source_path,
            line,
        } = failure;
        Self {
            kind,
            source_path,
            line,
            message,
            manifest_path,
            context,
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    /// Returns the file the failure occurred in.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns the failing line.
    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the manifest the caller asked to load.
    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    /// Returns the context window.
    #[must_use]
    pub fn context(&self) -> &[ContextLine] {
        &self.context
    }

    /// Renders the report as raw bytes, one `\n`-terminated line each.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"[!] There was an error while loading `");
        if let Some(name) = self.manifest_path.file_name() {
            out.extend_from_slice(&path_bytes(Path::new(name)));
        }
        out.extend_from_slice(b"`: ");
        out.extend_from_slice(self.message.as_bytes());
        out.push(b'\n');

        out.extend_from_slice(CONTEXT_PREFIX);
        out.extend_from_slice(b"from ");
        out.extend_from_slice(&path_bytes(&self.source_path));
        if self.line > 0 {
            out.extend_from_slice(format!(":{}", self.line).as_bytes());
        }
        out.push(b'\n');

        if self.context.is_empty() {
            return out;
        }
        out.extend_from_slice(SEPARATOR);
        out.push(b'\n');
        for line in &self.context {
            let prefix = match line.tag {
                LineTag::Marker => MARKER_PREFIX,
                LineTag::Context => CONTEXT_PREFIX,
            };
            out.extend_from_slice(prefix);
            out.extend_from_slice(&line.bytes);
            out.push(b'\n');
        }
        out.extend_from_slice(SEPARATOR);
        out.push(b'\n');
        out
    }

    /// Renders the report as text, replacing invalid bytes.
    #[must_use]
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }
}

impl fmt::Display for ContextLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

/// Returns the bytes of a path exactly as stored by the OS.
#[cfg(unix)]
fn path_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

/// Returns the bytes of a path, replacing unrepresentable characters.
#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}
