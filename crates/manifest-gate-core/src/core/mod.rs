// crates/manifest-gate-core/src/core/mod.rs
// ============================================================================
// Module: Manifest Gate Core Types
// Description: Canonical manifest, version, runtime, encoding, and diagnostic types.
// Purpose: Provide the stable data structures every loader and gate operates on.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types are plain data. They carry no I/O and read no process state;
//! the runtime modules load, evaluate, and render them.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod diagnostic;
pub mod encoding;
pub mod model;
pub mod runtime;
pub mod version;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use diagnostic::CONTEXT_PREFIX;
pub use diagnostic::ContextLine;
pub use diagnostic::DiagnosticReport;
pub use diagnostic::FailureKind;
pub use diagnostic::LineTag;
pub use diagnostic::MARKER_PREFIX;
pub use diagnostic::SEPARATOR;
pub use diagnostic::SourceFailure;
pub use encoding::DecodeError;
pub use encoding::ExecutionLocale;
pub use encoding::TextEncoding;
pub use model::DEFAULT_REQUIREMENT;
pub use model::Dependency;
pub use model::DependencyKind;
pub use model::Dialect;
pub use model::ManifestDraft;
pub use model::ManifestError;
pub use model::PackageManifest;
pub use runtime::DEFAULT_DECLARED_IN;
pub use runtime::DEFAULT_RUNTIME_FAMILY;
pub use runtime::HostRuntime;
pub use runtime::PatchLevel;
pub use runtime::RuntimeRequirement;
pub use version::Constraint;
pub use version::Operator;
pub use version::Requirement;
pub use version::Version;
pub use version::VersionError;
