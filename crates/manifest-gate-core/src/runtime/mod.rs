// crates/manifest-gate-core/src/runtime/mod.rs
// ============================================================================
// Module: Manifest Gate Runtime
// Description: Evaluation, rendering, loading, gating, and cache fallback.
// Purpose: Execute manifest loads and runtime checks over the core types.
// Dependencies: crate::{core, interfaces}, manifest-script, serde_yaml, tracing
// ============================================================================

//! ## Overview
//! Runtime modules turn bytes into manifests and failures into diagnostics.
//! [`ManifestLoader`] is the entry point every caller goes through; the
//! gate is independent of it and runs before any manifest is touched.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod cache;
pub mod gate;
pub mod loader;
pub mod render;
pub mod sandbox;
pub mod source;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cache::CacheEntry;
pub use cache::SpecificationCache;
pub use gate::ManifestRuntimeMismatch;
pub use gate::MismatchKind;
pub use gate::RUNTIME_MISMATCH_EXIT_STATUS;
pub use gate::RuntimeCompatibilityGate;
pub use gate::RuntimeMismatch;
pub use gate::Verdict;
pub use loader::ManifestLoader;
pub use loader::detect_dialect;
pub use render::DEFAULT_CONTEXT_RADIUS;
pub use render::DiagnosticRenderer;
pub use sandbox::EvaluationContext;
pub use sandbox::SandboxEvaluator;
pub use sandbox::SpecificationBuilder;
pub use source::DirectorySource;
