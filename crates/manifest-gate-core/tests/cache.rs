// crates/manifest-gate-core/tests/cache.rs
// ============================================================================
// Module: Specification Cache Tests
// Description: Primary-source failures recovered from the local cache.
// Purpose: Verify fallback success, miss propagation, and primary precedence.
// Dependencies: manifest_gate_core, tempfile
// ============================================================================
//! ## Overview
//! Uses an empty [`DirectorySource`] as an unreachable primary source and a
//! temporary cache root laid out as `specifications/<name>-<version>.manifest`.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

mod support;

use manifest_gate_core::DirectorySource;
use manifest_gate_core::FailureKind;
use manifest_gate_core::ManifestLoader;
use manifest_gate_core::SpecificationCache;
use support::Project;
use support::TestResult;
use support::ensure;

const ACTIVESUPPORT: &str = "---\nname: activesupport\nversion: 2.3.2\nauthors:\n  - David \
                             Heinemeier Hansson\ndependencies:\n  - name: i18n\n    requirement: \
                             \">= 0.1.3\"\n";

#[test]
fn unreachable_primary_falls_back_to_the_cache() -> TestResult {
    let project = Project::new()?;
    project.write("cache/specifications/activesupport-2.3.2.manifest", ACTIVESUPPORT)?;
    let primary = DirectorySource::new(project.path("primary"));
    let cache = SpecificationCache::new(project.path("cache"));

    let manifest = ManifestLoader::default().load_package(
        "activesupport",
        "2.3.2",
        &primary,
        Some(&cache),
    )?;
    ensure(manifest.full_name() == "activesupport-2.3.2", "cached manifest")?;
    ensure(
        manifest.dependencies().iter().any(|dep| dep.name == "i18n" && dep.requirement == ">= 0.1.3"),
        "dependency from the cache",
    )?;
    Ok(())
}

#[test]
fn cache_miss_propagates_the_primary_failure_unchanged() -> TestResult {
    let project = Project::new()?;
    let primary = DirectorySource::new(project.path("primary"));
    let cache = SpecificationCache::new(project.path("cache"));
    let loader = ManifestLoader::default();

    let without_cache = loader.load_package("rails", "7.1.0", &primary, None).unwrap_err();
    let with_cache = loader.load_package("rails", "7.1.0", &primary, Some(&cache)).unwrap_err();
    ensure(with_cache == without_cache, "primary failure unchanged")?;
    ensure(with_cache.kind() == FailureKind::EvaluationFailure, "evaluation failure")?;
    ensure(with_cache.message().starts_with("manifest not found"), with_cache.message())?;
    Ok(())
}

#[test]
fn primary_success_never_consults_the_cache() -> TestResult {
    let project = Project::new()?;
    project.write("primary/rack-3.0.0.yml", "name: rack\nversion: 3.0.0\n")?;
    project.write("cache/specifications/rack-3.0.0.manifest", "name: rack\nversion: 9.9.9\n")?;
    let primary = DirectorySource::new(project.path("primary"));
    let cache = SpecificationCache::new(project.path("cache"));

    let manifest = ManifestLoader::default().load_package("rack", "3.0.0", &primary, Some(&cache))?;
    ensure(manifest.version() == "3.0.0", "primary manifest")?;
    ensure(manifest.source_path() == project.path("primary/rack-3.0.0.yml"), "provenance")?;
    Ok(())
}

#[test]
fn failing_primary_manifest_also_falls_back() -> TestResult {
    let project = Project::new()?;
    project.write("primary/rack-3.0.0.gemspec", "Gem::Specification.new do |s|\n  s.name = \"rack\n")?;
    project.write("cache/specifications/rack-3.0.0.manifest", "name: rack\nversion: 3.0.0\n")?;
    let primary = DirectorySource::new(project.path("primary"));
    let cache = SpecificationCache::new(project.path("cache"));

    let manifest = ManifestLoader::default().load_package("rack", "3.0.0", &primary, Some(&cache))?;
    ensure(manifest.source_path() == project.path("cache/specifications/rack-3.0.0.manifest"), "cache")?;
    Ok(())
}

#[test]
fn unusable_cache_entry_keeps_the_primary_failure() -> TestResult {
    let project = Project::new()?;
    project.write("cache/specifications/rack-3.0.0.manifest", "name: [rack\n")?;
    let primary = DirectorySource::new(project.path("primary"));
    let cache = SpecificationCache::new(project.path("cache"));
    let loader = ManifestLoader::default();

    let expected = loader.load_package("rack", "3.0.0", &primary, None).unwrap_err();
    let actual = loader.load_package("rack", "3.0.0", &primary, Some(&cache)).unwrap_err();
    ensure(actual == expected, "primary failure returned")?;
    Ok(())
}

#[test]
fn entry_naming_another_version_keeps_the_primary_failure() -> TestResult {
    let project = Project::new()?;
    project.write("cache/specifications/rack-1.0.0.manifest", "name: rack\nversion: 9.9.9\n")?;
    let primary = DirectorySource::new(project.path("primary"));
    let cache = SpecificationCache::new(project.path("cache"));
    let loader = ManifestLoader::default();

    let expected = loader.load_package("rack", "1.0.0", &primary, None).unwrap_err();
    let actual = loader.load_package("rack", "1.0.0", &primary, Some(&cache)).unwrap_err();
    ensure(actual == expected, "primary failure returned")?;
    Ok(())
}

#[test]
fn entries_match_on_name_and_numeric_version() -> TestResult {
    let project = Project::new()?;
    project.write("cache/specifications/rack-1.0.0.manifest", "name: rack\nversion: '1.0'\n")?;
    project.write("cache/specifications/rake-2.0.manifest", "name: rack\nversion: '2.0'\n")?;
    let cache = SpecificationCache::new(project.path("cache"));
    let loader = ManifestLoader::default();

    let rack = cache.entry("rack", "1.0.0").ok_or("rack entry")?;
    let manifest = loader.load_path(&rack.path, None)?;
    ensure(rack.describes(&manifest), "1.0 is 1.0.0")?;

    let rake = cache.entry("rake", "2.0").ok_or("rake entry")?;
    let manifest = loader.load_path(&rake.path, None)?;
    ensure(!rake.describes(&manifest), "name differs")?;
    Ok(())
}

#[test]
fn traversal_names_are_cache_misses() -> TestResult {
    let project = Project::new()?;
    project.write("cache/secret-1.manifest", "name: secret\nversion: '1'\n")?;
    let cache = SpecificationCache::new(project.path("cache"));
    ensure(cache.entry("../secret", "1").is_none(), "traversal rejected")?;
    ensure(cache.entry("secret", "1").is_none(), "entries live under specifications/")?;
    Ok(())
}
