// crates/manifest-gate-core/src/runtime/gate.rs
// ============================================================================
// Module: Runtime Compatibility Gate
// Description: Compares a declared runtime requirement with the host runtime.
// Purpose: Abort installs early when the executing runtime cannot satisfy the project.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! The gate is a pure function of a [`RuntimeRequirement`] and a
//! [`HostRuntime`]. Checks run in a fixed order and the first failing check
//! decides the verdict: engine, then base version, then engine version, then
//! patch level. A project that declares nothing is always compatible.
//!
//! Manifests may also declare the runtime they need;
//! [`RuntimeCompatibilityGate::check_manifest`] compares that against the
//! host separately from the project gate.

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::HostRuntime;
use crate::core::PackageManifest;
use crate::core::Requirement;
use crate::core::RuntimeRequirement;
use crate::core::Version;

/// Process exit status for a runtime mismatch.
pub const RUNTIME_MISMATCH_EXIT_STATUS: u8 = 18;

// ============================================================================
// SECTION: Verdicts
// ============================================================================

/// Which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchKind {
    /// Engine or engine version differs.
    Engine,
    /// Base version not satisfied.
    Version,
    /// Patch level differs.
    PatchLevel,
}

/// Terminal compatibility failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RuntimeMismatch {
    /// Failed check.
    pub kind: MismatchKind,
    /// User-facing message.
    pub message: String,
}

impl RuntimeMismatch {
    /// Returns the process exit status for this failure.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        RUNTIME_MISMATCH_EXIT_STATUS
    }
}

/// Outcome of the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Host satisfies the requirement.
    Compatible,
    /// Host does not satisfy the requirement.
    Incompatible(RuntimeMismatch),
}

impl Verdict {
    /// Returns true for [`Verdict::Compatible`].
    #[must_use]
    pub const fn is_compatible(&self) -> bool {
        matches!(self, Self::Compatible)
    }

    /// Returns `0` when compatible, otherwise the mismatch exit status.
    #[must_use]
    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::Compatible => 0,
            Self::Incompatible(mismatch) => mismatch.exit_status(),
        }
    }
}

/// A manifest requires a runtime version the host does not provide.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{package} requires ruby version {required}, which is incompatible with the current \
     version, {current}"
)]
pub struct ManifestRuntimeMismatch {
    /// `name-version` of the manifest.
    pub package: String,
    /// Declared runtime requirement.
    pub required: String,
    /// Host version the requirement was checked against.
    pub current: String,
}

// ============================================================================
// SECTION: Gate
// ============================================================================

/// Stateless runtime compatibility gate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeCompatibilityGate;

impl RuntimeCompatibilityGate {
    /// Evaluates `requirement` against `host`.
    #[must_use]
    pub fn evaluate(requirement: Option<&RuntimeRequirement>, host: &HostRuntime) -> Verdict {
        match Self::check(requirement, host) {
            Ok(()) => Verdict::Compatible,
            Err(mismatch) => Verdict::Incompatible(mismatch),
        }
    }

    /// Evaluates `requirement` against `host`.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`RuntimeMismatch`].
    pub fn check(
        requirement: Option<&RuntimeRequirement>,
        host: &HostRuntime,
    ) -> Result<(), RuntimeMismatch> {
        let Some(requirement) = requirement else {
            return Ok(());
        };
        let family = &host.family;
        let declared_in = &requirement.declared_in;

        if requirement.engine != host.engine {
            return Err(RuntimeMismatch {
                kind: MismatchKind::Engine,
                message: format!(
                    "Your {family} engine is {}, but your {declared_in} specified {}",
                    host.engine, requirement.engine
                ),
            });
        }
        if !satisfies(&requirement.version, &host.version) {
            return Err(RuntimeMismatch {
                kind: MismatchKind::Version,
                message: format!(
                    "Your {family} version is {}, but your {declared_in} specified {}",
                    host.version, requirement.version
                ),
            });
        }
        if let Some(engine_version) = &requirement.engine_version
            && !satisfies(engine_version, &host.engine_version)
        {
            return Err(RuntimeMismatch {
                kind: MismatchKind::Engine,
                message: format!(
                    "Your {} version is {}, but your {declared_in} specified {} {engine_version}",
                    host.engine, host.engine_version, requirement.engine
                ),
            });
        }
        if let (Some(declared), Some(actual)) =
            (requirement.patchlevel.as_deref(), host.patchlevel.known())
            && declared != actual
        {
            return Err(RuntimeMismatch {
                kind: MismatchKind::PatchLevel,
                message: format!(
                    "Your {family} patchlevel is {actual}, but your {declared_in} specified \
                     {declared}"
                ),
            });
        }
        Ok(())
    }

    /// Checks a manifest's own runtime requirement against `host`.
    ///
    /// The requirement is compared with the host's base version extended by
    /// its numeric patch level, so `>= 2.7.0.100` can be expressed.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestRuntimeMismatch`] when the host is not acceptable.
    pub fn check_manifest(
        manifest: &PackageManifest,
        host: &HostRuntime,
    ) -> Result<(), ManifestRuntimeMismatch> {
        let Some(required) = manifest.required_runtime_version() else {
            return Ok(());
        };
        let current = host.comparable_version();
        if satisfies(required, &current) {
            return Ok(());
        }
        Err(ManifestRuntimeMismatch {
            package: manifest.full_name(),
            required: required.to_string(),
            current,
        })
    }
}

/// Returns true when `actual` satisfies the requirement expression.
///
/// Expressions or versions that do not parse only match by exact text.
fn satisfies(requirement: &str, actual: &str) -> bool {
    match (Requirement::parse(requirement), Version::parse(actual)) {
        (Ok(requirement), Ok(version)) => requirement.is_satisfied_by(&version),
        _ => requirement.trim() == actual.trim(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
