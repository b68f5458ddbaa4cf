// crates/manifest-script/src/error.rs
// ============================================================================
// Module: Script Error Definitions
// Description: Classified failures raised while lexing, parsing, or evaluating.
// Purpose: Carry the failure class, message, and source attribution together.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every failure produced by this crate is a [`ScriptError`]. Errors raised
//! while evaluating an included file keep that file's path and line so
//! callers can point at the real source of the problem rather than the
//! manifest that pulled it in.

use std::path::Path;
use std::path::PathBuf;

use thiserror::Error;

/// Classification of a script failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptErrorKind {
    /// Source text does not match the script grammar.
    Syntax,
    /// Source bytes are not valid for the assumed text encoding.
    Encoding,
    /// Source parsed but raised while executing.
    Evaluation,
}

/// Failure raised by the restricted script interpreter.
///
/// # Invariants
/// - `line` is 1-based; `0` means the location is unknown.
/// - `path` is `None` only for failures raised before a source file was
///   attached (for example when parsing a bare string).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScriptError {
    /// Failure class.
    pub kind: ScriptErrorKind,
    /// Human-readable failure message.
    pub message: String,
    /// 1-based line number of the failure.
    pub line: usize,
    /// Source file the failure occurred in, when known.
    pub path: Option<PathBuf>,
}

impl ScriptError {
    /// Creates a syntax failure at `line`.
    #[must_use]
    pub fn syntax(message: impl Into<String>, line: usize) -> Self {
        Self::new(ScriptErrorKind::Syntax, message, line)
    }

    /// Creates an encoding failure at `line`.
    #[must_use]
    pub fn encoding(message: impl Into<String>, line: usize) -> Self {
        Self::new(ScriptErrorKind::Encoding, message, line)
    }

    /// Creates an evaluation failure at `line`.
    #[must_use]
    pub fn evaluation(message: impl Into<String>, line: usize) -> Self {
        Self::new(ScriptErrorKind::Evaluation, message, line)
    }

    /// Creates a failure of the given kind.
    fn new(kind: ScriptErrorKind, message: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            path: None,
        }
    }

    /// Attaches a source path (and a line, when none is known) unless the
    /// error already points into another file.
    #[must_use]
    pub fn attributed_to(mut self, path: &Path, line: usize) -> Self {
        if self.path.is_none() {
            self.path = Some(path.to_path_buf());
            if self.line == 0 {
                self.line = line;
            }
        }
        self
    }
}

/// Result alias for script operations.
pub type ScriptResult<T> = Result<T, ScriptError>;
