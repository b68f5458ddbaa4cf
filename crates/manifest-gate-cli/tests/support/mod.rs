// crates/manifest-gate-cli/tests/support/mod.rs
// ============================================================================
// Module: CLI Test Support
// Description: Runs the built binary against temporary project fixtures.
// ============================================================================
//! ## Overview
//! Every invocation clears the environment variables the CLI consults so
//! results do not depend on the developer's shell.

#![allow(
    dead_code,
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use std::error::Error;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::Output;

use tempfile::TempDir;

/// Standard result type used across CLI integration tests.
pub type TestResult<T = ()> = Result<T, Box<dyn Error>>;

/// Returns an error with `message` unless `condition` holds.
pub fn ensure(condition: bool, message: impl Into<String>) -> TestResult {
    if condition {
        return Ok(());
    }
    let message: String = message.into();
    Err(message.into())
}

/// Temporary project directory.
pub struct Project {
    /// Owned temporary directory.
    dir: TempDir,
}

impl Project {
    /// Creates an empty project.
    pub fn new() -> TestResult<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    /// Returns the project root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Returns `rel` under the project root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// Writes `contents` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, contents: impl AsRef<[u8]>) -> TestResult<PathBuf> {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Runs the binary with `args` from the project root.
    pub fn run(&self, args: &[&str]) -> TestResult<Run> {
        let output = Command::new(env!("CARGO_BIN_EXE_manifest-gate"))
            .args(args)
            .current_dir(self.root())
            .env_remove("MANIFEST_GATE_CONFIG")
            .env_remove("MANIFEST_GATE_LANG")
            .env("MANIFEST_GATE_LOG", "off")
            .env_remove("LC_ALL")
            .env_remove("LC_CTYPE")
            .env_remove("LANG")
            .output()?;
        Ok(Run::from(output))
    }
}

/// Captured process outcome.
pub struct Run {
    /// Exit status code, if the process exited normally.
    pub code: Option<i32>,
    /// Captured stdout.
    pub stdout: String,
    /// Captured stderr, raw.
    pub stderr_bytes: Vec<u8>,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

impl From<Output> for Run {
    fn from(output: Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            stderr_bytes: output.stderr,
        }
    }
}
