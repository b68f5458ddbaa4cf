// crates/manifest-gate-config/tests/common/mod.rs
// =============================================================================
// Module: Config Test Helpers
// Description: Shared helpers for config validation tests.
// Purpose: Reduce duplication across integration tests for manifest-gate-config.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use manifest_gate_config::ConfigError;
use manifest_gate_config::ManifestGateConfig;

/// Result type shared by config tests.
pub type TestResult = Result<(), String>;

/// Parses and validates a TOML string.
pub fn config_from_toml(toml_str: &str) -> Result<ManifestGateConfig, ConfigError> {
    ManifestGateConfig::from_toml_str(toml_str)
}

/// Asserts that a result is an error whose message contains `needle`.
pub fn assert_invalid<T>(result: Result<T, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(_) => Err("expected invalid config".to_string()),
    }
}

/// Converts a config error into a test failure.
pub fn valid(result: Result<ManifestGateConfig, ConfigError>) -> Result<ManifestGateConfig, String> {
    result.map_err(|err| err.to_string())
}
