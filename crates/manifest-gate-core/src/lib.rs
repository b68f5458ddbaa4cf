// crates/manifest-gate-core/src/lib.rs
// ============================================================================
// Module: Manifest Gate Core Library
// Description: Public API surface for manifest evaluation and runtime gating.
// Purpose: Expose core types, the primary-source interface, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Manifest Gate loads package manifests written either as declarative YAML
//! documents or as restricted builder scripts, renders line-accurate
//! diagnostics when they fail, gates work on the executing runtime, and falls
//! back to a local specification cache when the primary source fails.
//! Nothing here reads process-wide state; locale, paths, and runtime identity
//! are always passed in.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::MAX_MANIFEST_BYTES;
pub use interfaces::ManifestSource;
pub use interfaces::SourceError;
pub use interfaces::SourcePayload;
pub use runtime::CacheEntry;
pub use runtime::DEFAULT_CONTEXT_RADIUS;
pub use runtime::DiagnosticRenderer;
pub use runtime::DirectorySource;
pub use runtime::EvaluationContext;
pub use runtime::ManifestLoader;
pub use runtime::ManifestRuntimeMismatch;
pub use runtime::MismatchKind;
pub use runtime::RUNTIME_MISMATCH_EXIT_STATUS;
pub use runtime::RuntimeCompatibilityGate;
pub use runtime::RuntimeMismatch;
pub use runtime::SandboxEvaluator;
pub use runtime::SpecificationBuilder;
pub use runtime::SpecificationCache;
pub use runtime::Verdict;
pub use runtime::detect_dialect;
