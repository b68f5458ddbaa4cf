// crates/manifest-gate-core/src/runtime/render.rs
// ============================================================================
// Module: Diagnostic Renderer
// Description: Builds diagnostic reports with a window of raw source lines.
// Purpose: Point developers at the failing line of a manifest or included file.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! The renderer re-reads the failing file as raw bytes and never decodes it:
//! a manifest that failed because of its encoding is shown exactly as it is
//! on disk. Paths are made absolute but not canonicalized.

use std::path::Path;
use std::path::PathBuf;

use crate::core::ContextLine;
use crate::core::DiagnosticReport;
use crate::core::LineTag;
use crate::core::SourceFailure;

/// Lines shown on each side of the failing line by default.
pub const DEFAULT_CONTEXT_RADIUS: usize = 2;

// ============================================================================
// SECTION: Renderer
// ============================================================================

/// Turns classified failures into diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticRenderer {
    /// Lines shown on each side of the failing line.
    radius: usize,
}

impl Default for DiagnosticRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_RADIUS)
    }
}

impl DiagnosticRenderer {
    /// Creates a renderer with the given context radius.
    #[must_use]
    pub const fn new(radius: usize) -> Self {
        Self {
            radius,
        }
    }

    /// Returns the context radius.
    #[must_use]
    pub const fn radius(&self) -> usize {
        self.radius
    }

    /// Builds a report for `failure`, reading context from disk.
    #[must_use]
    pub fn render(&self, failure: SourceFailure, manifest_path: &Path) -> DiagnosticReport {
        self.render_with_source(failure, manifest_path, None)
    }

    /// Builds a report for `failure`.
    ///
    /// Context is read from the failing file; when that file cannot be read
    /// and it is the manifest itself, `manifest_bytes` is used instead.
    #[must_use]
    pub fn render_with_source(
        &self,
        failure: SourceFailure,
        manifest_path: &Path,
        manifest_bytes: Option<&[u8]>,
    ) -> DiagnosticReport {
        let context = if failure.line == 0 {
            Vec::new()
        } else {
            match std::fs::read(&failure.source_path) {
                Ok(bytes) => self.window(&bytes, failure.line),
                Err(_) if failure.source_path.as_path() == manifest_path => {
                    manifest_bytes.map(|bytes| self.window(bytes, failure.line)).unwrap_or_default()
                }
                Err(_) => Vec::new(),
            }
        };
        let failure = SourceFailure {
            source_path: absolute(&failure.source_path),
            ..failure
        };
        DiagnosticReport::new(failure, absolute(manifest_path), context)
    }

    /// Returns the lines around `line`, clipped to the file.
    ///
    /// A `line` beyond the end of the file yields no context.
    #[must_use]
    pub fn window(&self, bytes: &[u8], line: usize) -> Vec<ContextLine> {
        let mut lines: Vec<&[u8]> = bytes.split(|&byte| byte == b'\n').collect();
        if bytes.ends_with(b"\n") {
            lines.pop();
        }
        if line == 0 || line > lines.len() {
            return Vec::new();
        }
        let first = line.saturating_sub(self.radius).max(1);
        let last = line.saturating_add(self.radius).min(lines.len());
        (first ..= last)
            .map(|number| {
                let raw = lines[number - 1];
                ContextLine {
                    number,
                    tag: if number == line { LineTag::Marker } else { LineTag::Context },
                    bytes: raw.strip_suffix(b"\r").unwrap_or(raw).to_vec(),
                }
            })
            .collect()
    }
}

/// Returns `path` made absolute against the working directory.
fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::DiagnosticRenderer;
    use crate::core::LineTag;

    #[test]
    fn window_clips_to_file_bounds() {
        let renderer = DiagnosticRenderer::default();
        let window = renderer.window(b"a\nb\nc\n", 1);
        let numbers: Vec<usize> = window.iter().map(|line| line.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(window[0].tag, LineTag::Marker);

        let window = renderer.window(b"a\nb\nc\nd\ne\nf\n", 6);
        let numbers: Vec<usize> = window.iter().map(|line| line.number).collect();
        assert_eq!(numbers, vec![4, 5, 6]);
    }

    #[test]
    fn window_strips_carriage_returns_only() {
        let window = DiagnosticRenderer::new(0).window(b"x\r\n\xff y \r\n", 2);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].bytes, b"\xff y ".to_vec());
    }

    #[test]
    fn out_of_range_lines_have_no_context() {
        assert!(DiagnosticRenderer::default().window(b"a\n", 2).is_empty());
        assert!(DiagnosticRenderer::default().window(b"a\n", 0).is_empty());
    }
}
