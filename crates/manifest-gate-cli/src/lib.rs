// crates/manifest-gate-cli/src/lib.rs
// ============================================================================
// Module: Manifest Gate CLI Library
// Description: Shared helpers for the Manifest Gate command-line interface.
// Purpose: Provide reusable components (i18n, logging) for the CLI binary and tests.
// Dependencies: tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! This library module houses shared CLI utilities: the internationalized
//! message catalog and the tracing bootstrap. The binary entry point
//! (`src/main.rs`) imports these helpers to keep all user-facing output
//! consistent.
//!
//! Security posture: CLI inputs are untrusted and must be validated.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;
/// Tracing subscriber bootstrap.
pub mod logging;
