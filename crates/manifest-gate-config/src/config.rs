// crates/manifest-gate-config/src/config.rs
// ============================================================================
// Module: Manifest Gate Configuration
// Description: Configuration loading and validation for Manifest Gate.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: manifest-gate-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed: a requirement that does not
//! parse, a runtime section without a host, or an oversized list is rejected
//! before any manifest is touched.
//!
//! Relative paths in `[loader]` and `[[manifests]]` are resolved against the
//! directory holding the config file.
//! Security posture: config inputs are untrusted.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use manifest_gate_core::DEFAULT_CONTEXT_RADIUS;
use manifest_gate_core::DEFAULT_DECLARED_IN;
use manifest_gate_core::DEFAULT_RUNTIME_FAMILY;
use manifest_gate_core::Dialect;
use manifest_gate_core::EvaluationContext;
use manifest_gate_core::ExecutionLocale;
use manifest_gate_core::HostRuntime;
use manifest_gate_core::PatchLevel;
use manifest_gate_core::Requirement;
use manifest_gate_core::RuntimeRequirement;
use manifest_gate_core::Version;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "manifest-gate.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "MANIFEST_GATE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of context lines around a failing line.
pub const MAX_CONTEXT_RADIUS: usize = 64;
/// Maximum length of a locale name.
pub(crate) const MAX_LOCALE_LENGTH: usize = 128;
/// Maximum length of identifiers such as engine or package names.
pub(crate) const MAX_IDENTIFIER_LENGTH: usize = 128;
/// Maximum length of a version or requirement string.
pub(crate) const MAX_REQUIREMENT_LENGTH: usize = 256;
/// Maximum number of `[[manifests]]` entries.
pub const MAX_MANIFEST_ENTRIES: usize = 1024;
/// Maximum number of `[[packages]]` entries.
pub const MAX_PACKAGE_ENTRIES: usize = 1024;
/// Default engine for `[host]` and `[runtime]`.
pub(crate) const DEFAULT_ENGINE: &str = "ruby";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Manifest Gate configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestGateConfig {
    /// Loader settings.
    #[serde(default)]
    pub loader: LoaderConfig,
    /// Description of the executing runtime.
    #[serde(default)]
    pub host: Option<HostConfig>,
    /// Runtime the project requires.
    #[serde(default)]
    pub runtime: Option<RuntimeConfig>,
    /// Manifest files checked by `check`.
    #[serde(default)]
    pub manifests: Vec<ManifestEntry>,
    /// Packages resolved through the primary source and the cache.
    #[serde(default)]
    pub packages: Vec<PackageEntry>,
    /// Directory relative paths are resolved against (not serialized).
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl ManifestGateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml_str(content)?;
        config.base_dir = resolved.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.loader.validate()?;
        if let Some(host) = &self.host {
            host.validate()?;
        }
        if let Some(runtime) = &self.runtime {
            runtime.validate()?;
            if self.host.is_none() {
                return Err(ConfigError::Invalid("runtime requires a [host] section".to_string()));
            }
        }
        if self.manifests.len() > MAX_MANIFEST_ENTRIES {
            return Err(ConfigError::Invalid("too many manifests entries".to_string()));
        }
        for entry in &self.manifests {
            entry.validate()?;
        }
        if self.packages.len() > MAX_PACKAGE_ENTRIES {
            return Err(ConfigError::Invalid("too many packages entries".to_string()));
        }
        for entry in &self.packages {
            entry.validate()?;
        }
        if !self.packages.is_empty() && self.loader.manifest_dir.is_none() {
            return Err(ConfigError::Invalid("packages require loader.manifest_dir".to_string()));
        }
        Ok(())
    }

    /// Resolves a configured path against the config file's directory.
    #[must_use]
    pub fn resolve(&self, value: &str) -> PathBuf {
        let path = Path::new(value.trim());
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Returns the resolved cache root, when configured.
    #[must_use]
    pub fn cache_root(&self) -> Option<PathBuf> {
        self.loader.cache_root.as_deref().map(|value| self.resolve(value))
    }

    /// Returns the resolved primary manifest directory, when configured.
    #[must_use]
    pub fn manifest_dir(&self) -> Option<PathBuf> {
        self.loader.manifest_dir.as_deref().map(|value| self.resolve(value))
    }

    /// Returns the host runtime, when described.
    #[must_use]
    pub fn host_runtime(&self) -> Option<HostRuntime> {
        self.host.as_ref().map(HostConfig::to_host_runtime)
    }

    /// Returns the project runtime requirement, when declared.
    #[must_use]
    pub fn runtime_requirement(&self) -> Option<RuntimeRequirement> {
        self.runtime.as_ref().map(RuntimeConfig::to_requirement)
    }
}

// ============================================================================
// SECTION: Loader
// ============================================================================

/// Loader settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Specification cache root.
    #[serde(default)]
    pub cache_root: Option<String>,
    /// Locale manifests are evaluated under.
    #[serde(default)]
    pub locale: Option<String>,
    /// Context lines shown around a failing line.
    #[serde(default = "default_context_radius")]
    pub context_radius: usize,
    /// Primary manifest directory for `[[packages]]`.
    #[serde(default)]
    pub manifest_dir: Option<String>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            cache_root: None,
            locale: None,
            context_radius: default_context_radius(),
            manifest_dir: None,
        }
    }
}

impl LoaderConfig {
    /// Validates loader settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(cache_root) = &self.cache_root {
            validate_path_string("loader.cache_root", cache_root)?;
        }
        if let Some(manifest_dir) = &self.manifest_dir {
            validate_path_string("loader.manifest_dir", manifest_dir)?;
        }
        if let Some(locale) = &self.locale {
            validate_locale(locale)?;
        }
        if self.context_radius > MAX_CONTEXT_RADIUS {
            return Err(ConfigError::Invalid(format!(
                "loader.context_radius must be at most {MAX_CONTEXT_RADIUS}"
            )));
        }
        Ok(())
    }

    /// Builds the evaluation context, preferring `locale_override`.
    #[must_use]
    pub fn evaluation_context(&self, locale_override: Option<&str>) -> EvaluationContext {
        let locale = locale_override
            .or(self.locale.as_deref())
            .map_or_else(ExecutionLocale::utf8, ExecutionLocale::new);
        EvaluationContext::new(locale)
    }
}

// ============================================================================
// SECTION: Runtime
// ============================================================================

/// Executing runtime description.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Family name used in messages.
    #[serde(default = "default_family")]
    pub family: String,
    /// Engine identifier.
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Base version.
    pub version: String,
    /// Engine version; defaults to the base version.
    #[serde(default)]
    pub engine_version: Option<String>,
    /// Patch level; absent means not applicable.
    #[serde(default)]
    pub patchlevel: Option<String>,
}

impl HostConfig {
    /// Validates the host description.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("host.family", &self.family)?;
        validate_identifier("host.engine", &self.engine)?;
        validate_version("host.version", &self.version)?;
        if let Some(engine_version) = &self.engine_version {
            validate_version("host.engine_version", engine_version)?;
        }
        if let Some(patchlevel) = &self.patchlevel {
            validate_identifier("host.patchlevel", patchlevel)?;
        }
        Ok(())
    }

    /// Converts to a [`HostRuntime`].
    #[must_use]
    pub fn to_host_runtime(&self) -> HostRuntime {
        let patchlevel = self
            .patchlevel
            .as_ref()
            .map_or(PatchLevel::NotApplicable, |level| PatchLevel::Known(level.trim().to_string()));
        let mut host = HostRuntime::new(self.engine.trim(), self.version.trim(), patchlevel);
        host.family = self.family.trim().to_string();
        match &self.engine_version {
            Some(engine_version) => host.with_engine_version(engine_version.trim()),
            None => host,
        }
    }
}

/// Runtime the project requires.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Required engine.
    #[serde(default = "default_engine")]
    pub engine: String,
    /// Base version requirement; a bare version means exact match.
    pub version: String,
    /// Engine version requirement.
    #[serde(default)]
    pub engine_version: Option<String>,
    /// Exact patch level.
    #[serde(default)]
    pub patchlevel: Option<String>,
    /// Label used in mismatch messages.
    #[serde(default = "default_declared_in")]
    pub declared_in: String,
}

impl RuntimeConfig {
    /// Validates the runtime requirement.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("runtime.engine", &self.engine)?;
        validate_requirement("runtime.version", &self.version)?;
        if let Some(engine_version) = &self.engine_version {
            validate_requirement("runtime.engine_version", engine_version)?;
        }
        if let Some(patchlevel) = &self.patchlevel {
            validate_identifier("runtime.patchlevel", patchlevel)?;
        }
        validate_identifier("runtime.declared_in", &self.declared_in)
    }

    /// Converts to a [`RuntimeRequirement`].
    #[must_use]
    pub fn to_requirement(&self) -> RuntimeRequirement {
        let mut requirement = RuntimeRequirement::new(self.engine.trim(), self.version.trim())
            .declared_in(self.declared_in.trim());
        if let Some(engine_version) = &self.engine_version {
            requirement = requirement.with_engine_version(engine_version.trim());
        }
        if let Some(patchlevel) = &self.patchlevel {
            requirement = requirement.with_patchlevel(patchlevel.trim());
        }
        requirement
    }
}

// ============================================================================
// SECTION: Entries
// ============================================================================

/// Manifest file reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Manifest path.
    pub path: String,
    /// Dialect override; detected when absent.
    #[serde(default)]
    pub dialect: Option<Dialect>,
}

impl ManifestEntry {
    /// Validates the entry.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("manifests.path", &self.path)
    }
}

/// Package reference resolved through the primary source.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageEntry {
    /// Package name.
    pub name: String,
    /// Exact package version.
    pub version: String,
}

impl PackageEntry {
    /// Validates the entry.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_identifier("packages.name", &self.name)?;
        if self.name.starts_with('.') || self.name.contains(['/', '\\']) {
            return Err(ConfigError::Invalid(format!(
                "packages.name must be a plain file name: {}",
                self.name
            )));
        }
        validate_version("packages.version", &self.version)
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a short identifier: non-empty, bounded, no whitespace or controls.
fn validate_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    if trimmed.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(ConfigError::Invalid(format!("{field} must not contain whitespace")));
    }
    Ok(())
}

/// Validates a locale name.
fn validate_locale(value: &str) -> Result<(), ConfigError> {
    if value.len() > MAX_LOCALE_LENGTH {
        return Err(ConfigError::Invalid("loader.locale exceeds max length".to_string()));
    }
    if !value.chars().all(|c| c.is_ascii_graphic()) {
        return Err(ConfigError::Invalid(
            "loader.locale must contain printable ascii only".to_string(),
        ));
    }
    Ok(())
}

/// Validates an exact version string.
fn validate_version(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.len() > MAX_REQUIREMENT_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Version::parse(value)
        .map(|_| ())
        .map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))
}

/// Validates a requirement expression.
fn validate_requirement(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.len() > MAX_REQUIREMENT_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Requirement::parse(value)
        .map(|_| ())
        .map_err(|err| ConfigError::Invalid(format!("{field}: {err}")))
}

/// Default context radius.
pub(crate) const fn default_context_radius() -> usize {
    DEFAULT_CONTEXT_RADIUS
}

/// Default runtime family.
fn default_family() -> String {
    DEFAULT_RUNTIME_FAMILY.to_string()
}

/// Default engine.
fn default_engine() -> String {
    DEFAULT_ENGINE.to_string()
}

/// Default declaring file label.
fn default_declared_in() -> String {
    DEFAULT_DECLARED_IN.to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================
