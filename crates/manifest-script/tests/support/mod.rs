// crates/manifest-script/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Shared helpers for manifest-script integration tests.
// ============================================================================
//! ## Overview
//! Result-based assertions, a recording specification target, and an
//! in-memory include resolver.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use manifest_script::IncludeRequest;
use manifest_script::IncludeResolver;
use manifest_script::ScriptError;
use manifest_script::ScriptResult;
use manifest_script::SpecificationTarget;
use manifest_script::TargetError;
use manifest_script::Value;

// ========================================================================
// Test Result Helpers
// ========================================================================

/// Standard result type used across script integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

/// Lightweight error type for test assertions.
#[derive(Debug)]
struct TestError {
    /// Human-readable failure message.
    message: String,
}

impl fmt::Display for TestError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}

impl Error for TestError {}

/// Returns an error when a test condition fails.
///
/// # Errors
/// Returns a `TestError` when the condition is false.
pub fn ensure(condition: bool, message: impl Into<String>) -> TestResult {
    if condition {
        Ok(())
    } else {
        Err(Box::new(TestError {
            message: message.into(),
        }))
    }
}

// ========================================================================
// Recording Target
// ========================================================================

/// Specification target that records every accepted effect.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    /// Attribute writes in order.
    pub assigned: Vec<(String, Value)>,
    /// Method calls in order.
    pub invoked: Vec<(String, Vec<Value>)>,
}

impl RecordingTarget {
    /// Returns the last value assigned to `attribute`.
    pub fn attribute(&self, attribute: &str) -> Option<&Value> {
        self.assigned.iter().rev().find(|(name, _)| name == attribute).map(|(_, value)| value)
    }
}

impl SpecificationTarget for RecordingTarget {
    fn assign(&mut self, attribute: &str, value: Value) -> Result<(), TargetError> {
        match attribute {
            "name" | "version" | "summary" | "authors" | "author" => {
                self.assigned.push((attribute.to_string(), value));
                Ok(())
            }
            "files" => Err(TargetError::Invalid("files are not accepted".to_string())),
            _ => Err(TargetError::UndefinedMethod),
        }
    }

    fn invoke(&mut self, method: &str, args: Vec<Value>) -> Result<(), TargetError> {
        if method.starts_with("add_") {
            self.invoked.push((method.to_string(), args));
            Ok(())
        } else {
            Err(TargetError::UndefinedMethod)
        }
    }
}

// ========================================================================
// In-Memory Includes
// ========================================================================

/// Include resolver backed by a map of path to text.
#[derive(Debug, Default)]
pub struct MapResolver {
    /// Files keyed by normalized path.
    files: BTreeMap<PathBuf, String>,
}

impl MapResolver {
    /// Adds a file.
    pub fn with(mut self, path: &str, text: &str) -> Self {
        self.files.insert(PathBuf::from(path), text.to_string());
        self
    }
}

impl IncludeResolver for MapResolver {
    fn locate(&self, from: &Path, request: &IncludeRequest<'_>) -> ScriptResult<PathBuf> {
        let dir = from.parent().unwrap_or_else(|| Path::new(""));
        let relative = request.target.trim_start_matches("./");
        let mut candidate = dir.join(relative);
        if candidate.extension().is_none() {
            candidate.set_extension("rb");
        }
        if self.files.contains_key(&candidate) {
            Ok(candidate)
        } else {
            Err(ScriptError::evaluation(
                format!("cannot load such file -- {}", request.target),
                request.line,
            ))
        }
    }

    fn load(&self, path: &Path) -> ScriptResult<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            ScriptError::evaluation(format!("cannot load such file -- {}", path.display()), 0)
        })
    }
}
