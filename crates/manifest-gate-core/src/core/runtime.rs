// crates/manifest-gate-core/src/core/runtime.rs
// ============================================================================
// Module: Runtime Identity
// Description: Declared runtime requirements and the executing host runtime.
// Purpose: Carry the inputs of the runtime compatibility gate.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! A [`RuntimeRequirement`] is what a project declares; a [`HostRuntime`] is
//! what is actually executing. Both are plain data; comparison lives in the
//! gate.

use serde::Deserialize;
use serde::Serialize;

/// Configuration label used in mismatch messages when none is given.
pub const DEFAULT_DECLARED_IN: &str = "Gemfile";

/// Runtime family name used in mismatch messages when none is given.
pub const DEFAULT_RUNTIME_FAMILY: &str = "Ruby";

// ============================================================================
// SECTION: Requirement
// ============================================================================

/// Runtime constraint declared by a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeRequirement {
    /// Engine identifier, e.g. `ruby` or `jruby`.
    pub engine: String,
    /// Engine version requirement.
    pub engine_version: Option<String>,
    /// Base version requirement; a bare version means exact match.
    pub version: String,
    /// Exact patch level.
    pub patchlevel: Option<String>,
    /// Name of the file the requirement came from.
    pub declared_in: String,
}

impl RuntimeRequirement {
    /// Creates a requirement on `engine` at `version`.
    #[must_use]
    pub fn new(engine: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            engine_version: None,
            version: version.into(),
            patchlevel: None,
            declared_in: DEFAULT_DECLARED_IN.to_string(),
        }
    }

    /// Sets the engine version requirement.
    #[must_use]
    pub fn with_engine_version(mut self, engine_version: impl Into<String>) -> Self {
        self.engine_version = Some(engine_version.into());
        self
    }

    /// Sets the required patch level.
    #[must_use]
    pub fn with_patchlevel(mut self, patchlevel: impl Into<String>) -> Self {
        self.patchlevel = Some(patchlevel.into());
        self
    }

    /// Sets the label of the declaring file.
    #[must_use]
    pub fn declared_in(mut self, label: impl Into<String>) -> Self {
        self.declared_in = label.into();
        self
    }
}

// ============================================================================
// SECTION: Host
// ============================================================================

/// Patch level of a host runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchLevel {
    /// Meaningful patch level.
    Known(String),
    /// The runtime has no patch level.
    NotApplicable,
}

impl PatchLevel {
    /// Returns the patch level when known.
    #[must_use]
    pub fn known(&self) -> Option<&str> {
        match self {
            Self::Known(level) => Some(level),
            Self::NotApplicable => None,
        }
    }
}

/// Executing host runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRuntime {
    /// Family name used in messages, e.g. `Ruby`.
    pub family: String,
    /// Engine identifier.
    pub engine: String,
    /// Engine version.
    pub engine_version: String,
    /// Base version.
    pub version: String,
    /// Patch level.
    pub patchlevel: PatchLevel,
}

impl HostRuntime {
    /// Creates a host whose engine version equals its base version.
    #[must_use]
    pub fn new(
        engine: impl Into<String>,
        version: impl Into<String>,
        patchlevel: PatchLevel,
    ) -> Self {
        let version = version.into();
        Self {
            family: DEFAULT_RUNTIME_FAMILY.to_string(),
            engine: engine.into(),
            engine_version: version.clone(),
            version,
            patchlevel,
        }
    }

    /// Sets a distinct engine version.
    #[must_use]
    pub fn with_engine_version(mut self, engine_version: impl Into<String>) -> Self {
        self.engine_version = engine_version.into();
        self
    }

    /// Returns the version manifests' runtime requirements are checked
    /// against: the base version, extended by a numeric patch level.
    #[must_use]
    pub fn comparable_version(&self) -> String {
        match self.patchlevel.known() {
            Some(level) if !level.is_empty() && level.bytes().all(|b| b.is_ascii_digit()) => {
                format!("{}.{level}", self.version)
            }
            _ => self.version.clone(),
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::HostRuntime;
    use super::PatchLevel;
    use super::RuntimeRequirement;

    #[test]
    fn comparable_version_appends_numeric_patchlevels() {
        let host = HostRuntime::new("ruby", "3.3.0", PatchLevel::Known("100".to_string()));
        assert_eq!(host.comparable_version(), "3.3.0.100");
        let host = HostRuntime::new("jruby", "3.1.4", PatchLevel::NotApplicable);
        assert_eq!(host.comparable_version(), "3.1.4");
    }

    #[test]
    fn requirement_defaults_to_gemfile_label() {
        let requirement = RuntimeRequirement::new("ruby", "3.3.0").with_patchlevel("100");
        assert_eq!(requirement.declared_in, "Gemfile");
        assert_eq!(requirement.patchlevel.as_deref(), Some("100"));
    }
}
