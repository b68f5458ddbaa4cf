//! Validation tests for manifest-gate-config.
// crates/manifest-gate-config/tests/validation.rs
// =============================================================================
// Module: Config Validation Tests
// Description: Fail-closed validation of every section.
// Purpose: Ensure malformed or inconsistent configuration is rejected.
// =============================================================================

use manifest_gate_config::MAX_CONTEXT_RADIUS;
use manifest_gate_config::MAX_PACKAGE_ENTRIES;

mod common;

use common::TestResult;
use common::assert_invalid;
use common::config_from_toml;

#[test]
fn unknown_keys_are_rejected() -> TestResult {
    assert_invalid(config_from_toml("[loader]\ncache = \"x\"\n"), "config parse error")?;
    assert_invalid(config_from_toml("[server]\n"), "config parse error")
}

#[test]
fn runtime_without_host_is_rejected() -> TestResult {
    assert_invalid(
        config_from_toml("[runtime]\nversion = \"3.2.2\"\n"),
        "runtime requires a [host] section",
    )
}

#[test]
fn malformed_runtime_requirement_is_rejected() -> TestResult {
    assert_invalid(
        config_from_toml("[host]\nversion = \"3.2.2\"\n[runtime]\nversion = \"=> 3\"\n"),
        "runtime.version",
    )
}

#[test]
fn malformed_host_version_is_rejected() -> TestResult {
    assert_invalid(config_from_toml("[host]\nversion = \"three\"\n"), "host.version")
}

#[test]
fn context_radius_is_bounded() -> TestResult {
    let at_max = format!("[loader]\ncontext_radius = {MAX_CONTEXT_RADIUS}\n");
    config_from_toml(&at_max).map_err(|err| err.to_string())?;
    let over = format!("[loader]\ncontext_radius = {}\n", MAX_CONTEXT_RADIUS + 1);
    assert_invalid(config_from_toml(&over), "loader.context_radius")
}

#[test]
fn locale_must_be_printable_ascii() -> TestResult {
    assert_invalid(config_from_toml("[loader]\nlocale = \"en US\"\n"), "loader.locale")
}

#[test]
fn empty_manifest_path_is_rejected() -> TestResult {
    assert_invalid(config_from_toml("[[manifests]]\npath = \" \"\n"), "manifests.path")
}

#[test]
fn unknown_dialect_is_rejected() -> TestResult {
    assert_invalid(
        config_from_toml("[[manifests]]\npath = \"a\"\ndialect = \"json\"\n"),
        "config parse error",
    )
}

#[test]
fn packages_require_manifest_dir() -> TestResult {
    assert_invalid(
        config_from_toml("[[packages]]\nname = \"rake\"\nversion = \"13.0.6\"\n"),
        "packages require loader.manifest_dir",
    )
}

#[test]
fn package_names_must_be_plain_file_names() -> TestResult {
    let toml = "[loader]\nmanifest_dir = \"specs\"\n[[packages]]\nname = \"../rake\"\nversion = \
                \"13.0.6\"\n";
    assert_invalid(config_from_toml(toml), "packages.name")
}

#[test]
fn package_count_is_bounded() -> TestResult {
    let mut toml = String::from("[loader]\nmanifest_dir = \"specs\"\n");
    for index in 0 ..= MAX_PACKAGE_ENTRIES {
        toml.push_str(&format!("[[packages]]\nname = \"pkg{index}\"\nversion = \"1.0\"\n"));
    }
    assert_invalid(config_from_toml(&toml), "too many packages entries")
}
