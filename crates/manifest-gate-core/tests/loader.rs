// crates/manifest-gate-core/tests/loader.rs
// ============================================================================
// Module: Manifest Loader Tests
// Description: End-to-end loads of both dialects from disk.
// Purpose: Verify dialect equivalence, diagnostics, and include attribution.
// Dependencies: manifest_gate_core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Writes manifests into a temporary project and loads them through
//! [`ManifestLoader`], checking the canonical structure on success and the
//! rendered diagnostic on failure.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Test Support
// ============================================================================

mod support;

use manifest_gate_core::Dependency;
use manifest_gate_core::DependencyKind;
use manifest_gate_core::Dialect;
use manifest_gate_core::EvaluationContext;
use manifest_gate_core::ExecutionLocale;
use manifest_gate_core::FailureKind;
use manifest_gate_core::LineTag;
use manifest_gate_core::ManifestLoader;
use manifest_gate_core::TextEncoding;
use support::Project;
use support::TestResult;
use support::ensure;

const VERSION_RB: &str = "module Hello\n  VERSION = \"3.4.2\".freeze\nend\n";

const HELLO_GEMSPEC: &str = r#"# frozen_string_literal: true
require_relative "lib/hello/version"

Gem::Specification.new do |s|
  s.name = "hello"
  s.version = Hello::VERSION
  s.authors = ["David Rodríguez", "Ann Lee"]
  s.summary = "Says hello"
  s.license = "MIT"
  s.required_ruby_version = ">= 2.7"
  s.files = ["lib/hello.rb"]
  s.add_runtime_dependency "rack", ">= 1.0", "< 3"
  s.add_development_dependency "rspec", "~> 3.12"
  s.add_dependency "json"
end
"#;

const HELLO_YAML: &str = r#"---
name: hello
version: "3.4.2"
authors:
  - David Rodríguez
  - Ann Lee
summary: Says hello
license: MIT
required_ruby_version: ">= 2.7"
dependencies:
  - name: rack
    requirement: [">= 1.0", "< 3"]
  - name: rspec
    requirement: "~> 3.12"
    type: development
  - name: json
"#;

fn ascii_loader() -> ManifestLoader {
    ManifestLoader::new(EvaluationContext::new(ExecutionLocale::new("C")))
}

// ============================================================================
// SECTION: Dialect Equivalence
// ============================================================================

#[test]
fn both_dialects_produce_the_same_manifest() -> TestResult {
    let project = Project::new()?;
    project.write("lib/hello/version.rb", VERSION_RB)?;
    let script = project.write("hello.gemspec", HELLO_GEMSPEC)?;
    let document = project.write("hello.yml", HELLO_YAML)?;

    let loader = ManifestLoader::default();
    let from_script = loader.load_path(&script, None)?;
    let from_document = loader.load_path(&document, None)?;

    ensure(from_script.same_content(&from_document), "dialects disagree")?;
    ensure(from_script.name() == "hello", "name")?;
    ensure(from_script.version() == "3.4.2", "version from included constant")?;
    ensure(from_script.author() == Some("David Rodríguez"), "first author")?;
    ensure(from_script.licenses() == ["MIT".to_string()], "licenses")?;
    ensure(from_script.required_runtime_version() == Some(">= 2.7"), "runtime requirement")?;
    ensure(
        from_script.dependencies()
            == [
                Dependency::new(
                    "rack",
                    &[">= 1.0".to_string(), "< 3".to_string()],
                    DependencyKind::Runtime,
                ),
                Dependency::new("rspec", &["~> 3.12".to_string()], DependencyKind::Development),
                Dependency::new("json", &[], DependencyKind::Runtime),
            ],
        "dependencies in declaration order",
    )?;
    ensure(from_script.dependencies()[2].requirement == ">= 0", "default requirement")?;
    ensure(from_script.source_path() == script, "script provenance")?;
    ensure(from_document.source_path() == document, "document provenance")?;
    Ok(())
}

#[test]
fn explicit_hint_overrides_the_extension() -> TestResult {
    let project = Project::new()?;
    let path = project.write("hello.txt", "name: hello\nversion: '1.0'\n")?;
    let manifest = ManifestLoader::default().load_path(&path, Some(Dialect::Declarative))?;
    ensure(manifest.full_name() == "hello-1.0", "loaded as declarative")?;
    let err = ManifestLoader::default().load_path(&path, Some(Dialect::Script)).unwrap_err();
    ensure(err.kind() == FailureKind::EvaluationFailure, "loaded as script")?;
    Ok(())
}

const RUBYGEMS_YAML: &str = r#"--- !ruby/object:Gem::Specification
name: yaml_spec
version: !ruby/object:Gem::Version
  version: '1.0'
platform: ruby
authors:
- no one
autorequire:
bindir: bin
cert_chain: []
date: 2024-01-01 00:00:00.000000000 Z
dependencies:
- !ruby/object:Gem::Dependency
  name: rack
  requirement: !ruby/object:Gem::Requirement
    requirements:
    - - "="
      - !ruby/object:Gem::Version
        version: 0.9.1
  type: :runtime
  prerelease: false
  version_requirements: !ruby/object:Gem::Requirement
    requirements:
    - - "="
      - !ruby/object:Gem::Version
        version: 0.9.1
- !ruby/object:Gem::Dependency
  name: rspec
  requirement: !ruby/object:Gem::Requirement
    requirements:
    - - ">="
      - !ruby/object:Gem::Version
        version: '3'
    - - "<"
      - !ruby/object:Gem::Version
        version: '4'
  type: :development
  prerelease: false
description:
email:
executables: []
extensions: []
extra_rdoc_files: []
files:
- lib/yaml_spec.rb
homepage:
licenses: []
metadata: {}
post_install_message:
rdoc_options: []
require_paths:
- lib
required_ruby_version: !ruby/object:Gem::Requirement
  requirements:
  - - ">="
    - !ruby/object:Gem::Version
      version: '0'
required_rubygems_version: !ruby/object:Gem::Requirement
  requirements:
  - - ">="
    - !ruby/object:Gem::Version
      version: '0'
requirements: []
rubygems_version: 3.4.10
signing_key:
specification_version: 4
summary: This is just a fake gem for testing
test_files: []
"#;

#[test]
fn rubygems_serialized_documents_load_as_declarative() -> TestResult {
    let project = Project::new()?;
    let path = project.write("yaml_spec.yml", RUBYGEMS_YAML)?;
    let manifest = ManifestLoader::default().load_path(&path, None)?;
    ensure(manifest.full_name() == "yaml_spec-1.0", manifest.full_name())?;
    ensure(manifest.authors() == ["no one".to_string()], "authors")?;
    ensure(manifest.summary() == Some("This is just a fake gem for testing"), "summary")?;
    ensure(manifest.description().is_none(), "null description")?;
    ensure(manifest.required_runtime_version() == Some(">= 0"), "runtime requirement")?;
    ensure(
        manifest.dependencies()
            == [
                Dependency::new("rack", &["= 0.9.1".to_string()], DependencyKind::Runtime),
                Dependency::new(
                    "rspec",
                    &[">= 3".to_string(), "< 4".to_string()],
                    DependencyKind::Development,
                ),
            ],
        "dependencies",
    )?;
    Ok(())
}

#[test]
fn loaded_manifests_serialize_to_the_canonical_json_shape() -> TestResult {
    let project = Project::new()?;
    let path = project.write("yaml_spec.yml", RUBYGEMS_YAML)?;
    let manifest = ManifestLoader::default().load_path(&path, None)?;
    let value = serde_json::to_value(&manifest)?;
    ensure(value["name"] == "yaml_spec", "name")?;
    ensure(value["version"] == "1.0", "version")?;
    ensure(value["encoding"] == "UTF-8", "encoding")?;
    ensure(value["description"].is_null(), "description")?;
    ensure(value["dependencies"][0]["requirement"] == "= 0.9.1", "requirement")?;
    ensure(value["dependencies"][1]["type"] == "development", "dependency type")?;
    ensure(value["required_runtime_version"] == ">= 0", "runtime requirement")?;
    Ok(())
}

#[test]
fn rubygems_documents_still_reject_unknown_keys() -> TestResult {
    let project = Project::new()?;
    let path = project.write(
        "odd.yml",
        "--- !ruby/object:Gem::Specification\nname: odd\nversion: '1'\nbogus: true\n",
    )?;
    let report = ManifestLoader::default().load_path(&path, None).unwrap_err();
    ensure(report.kind() == FailureKind::SyntaxFailure, "syntax failure")?;
    ensure(report.message().contains("bogus"), report.message().to_string())?;
    Ok(())
}

#[test]
fn version_objects_unwrap_in_plain_and_tagged_documents() -> TestResult {
    let project = Project::new()?;
    let path = project.write(
        "plain.yml",
        "name: plain\nversion: !ruby/object:Gem::Version\n  version: '2.1'\n",
    )?;
    let manifest = ManifestLoader::default().load_path(&path, None)?;
    ensure(manifest.version() == "2.1", manifest.version().to_string())?;

    let path = project.write(
        "tagged.yml",
        "--- !ruby/object:Gem::Specification\nname: yaml_spec\nversion:          !ruby/object:Gem::Version\n  version: '1.0'\n",
    )?;
    let manifest = ManifestLoader::default().load_path(&path, None)?;
    ensure(manifest.full_name() == "yaml_spec-1.0", manifest.full_name())?;
    Ok(())
}

// ============================================================================
// SECTION: Encoding Diagnostics
// ============================================================================

#[test]
fn multibyte_author_under_ascii_locale_renders_a_marked_window() -> TestResult {
    let project = Project::new()?;
    let path = project.write(
        "hello.gemspec",
        "Gem::Specification.new do |gem|\n  gem.name = \"hello\"\n  gem.version = \
         \"3.4.2\"\n  gem.author = \"David Rodríguez\"\n  gem.summary = \"Says hello\"\n  \
         gem.add_dependency \"rack\", \">= 1.0\"\nend\n",
    )?;

    let report = ascii_loader().load_path(&path, None).unwrap_err();
    ensure(report.kind() == FailureKind::EncodingFailure, "encoding failure")?;
    ensure(report.message() == "invalid multibyte char (US-ASCII)", "message")?;
    ensure(report.line() == 4, "failing line")?;

    let tags: Vec<(usize, LineTag)> =
        report.context().iter().map(|line| (line.number, line.tag)).collect();
    ensure(
        tags == [
            (2, LineTag::Context),
            (3, LineTag::Context),
            (4, LineTag::Marker),
            (5, LineTag::Context),
            (6, LineTag::Context),
        ],
        format!("context window: {tags:?}"),
    )?;

    let expected = format!(
        "[!] There was an error while loading `hello.gemspec`: invalid multibyte char \
         (US-ASCII)\n #  from {}:4\n #  -------------------------------------------\n #    \
         gem.name = \"hello\"\n #    gem.version = \"3.4.2\"\n >    gem.author = \"David \
         Rodríguez\"\n #    gem.summary = \"Says hello\"\n #    gem.add_dependency \"rack\", \
         \">= 1.0\"\n #  -------------------------------------------\n",
        path.display()
    );
    ensure(report.to_text() == expected, format!("rendered:\n{}", report.to_text()))?;
    Ok(())
}

#[test]
fn magic_comment_lets_ascii_locales_read_utf8() -> TestResult {
    let project = Project::new()?;
    let path = project.write(
        "hello.gemspec",
        "# -*- encoding: utf-8 -*-\nGem::Specification.new do |s|\n  s.name = \"hello\"\n  \
         s.version = \"1.0\"\n  s.author = \"Zoë\"\nend\n",
    )?;
    let manifest = ascii_loader().load_path(&path, None)?;
    ensure(manifest.author() == Some("Zoë"), "author decoded")?;
    ensure(manifest.encoding() == TextEncoding::Utf8, "magic comment encoding")?;
    Ok(())
}

#[test]
fn declarative_documents_are_always_utf8() -> TestResult {
    let project = Project::new()?;
    let path = project.write("a.yml", b"name: a\nversion: '1'\nsummary: \"\xff\"\n")?;
    let report = ManifestLoader::default().load_path(&path, None).unwrap_err();
    ensure(report.kind() == FailureKind::EncodingFailure, "encoding failure")?;
    ensure(report.message() == "invalid multibyte char (UTF-8)", "message")?;
    ensure(report.line() == 3, "line")?;
    Ok(())
}

// ============================================================================
// SECTION: Include Attribution
// ============================================================================

#[test]
fn unterminated_string_in_included_file_is_attributed_to_that_file() -> TestResult {
    let project = Project::new()?;
    let included = project.write("💎.rb", "VALUE = \"never closed\n")?;
    let path = project.write(
        "hello.gemspec",
        "require_relative \"💎\"\n\nGem::Specification.new do |s|\n  s.name = \"hello\"\n  \
         s.version = \"1.0\"\nend\n",
    )?;

    let report = ManifestLoader::default().load_path(&path, None).unwrap_err();
    let included = std::fs::canonicalize(included)?;
    ensure(report.kind() == FailureKind::SyntaxFailure, "syntax failure")?;
    ensure(
        report.message().contains("unterminated string meets end of file"),
        "unterminated message",
    )?;
    ensure(report.source_path() == included, format!("attributed to {:?}", report.source_path()))?;
    ensure(report.line() == 1, "line")?;

    let text = report.to_text();
    ensure(
        text.starts_with("[!] There was an error while loading `hello.gemspec`: "),
        "summary names the manifest",
    )?;
    ensure(text.contains(&format!(" #  from {}:1\n", included.display())), "location line")?;
    ensure(text.contains(" >  VALUE = \"never closed\n"), "marker line")?;
    Ok(())
}

#[test]
fn missing_include_is_an_evaluation_failure_in_the_includer() -> TestResult {
    let project = Project::new()?;
    let path = project.write(
        "hello.gemspec",
        "Gem::Specification.new do |s|\n  s.name = \"hello\"\nend\nrequire_relative \
         \"missing\"\n",
    )?;
    let report = ManifestLoader::default().load_path(&path, None).unwrap_err();
    ensure(report.kind() == FailureKind::EvaluationFailure, "evaluation failure")?;
    ensure(report.message().starts_with("cannot load such file -- "), "message")?;
    ensure(report.source_path() == path, "attributed to the manifest")?;
    ensure(report.line() == 4, "line")?;
    Ok(())
}

#[test]
fn cyclic_includes_fail_with_an_evaluation_failure() -> TestResult {
    let project = Project::new()?;
    project.write("b.rb", "require_relative \"a.gemspec\"\n")?;
    let path = project.write(
        "a.gemspec",
        "require_relative \"b\"\nGem::Specification.new do |s|\n  s.name = \"a\"\n  s.version \
         = \"1\"\nend\n",
    )?;
    let report = ManifestLoader::default().load_path(&path, None).unwrap_err();
    ensure(report.kind() == FailureKind::EvaluationFailure, "evaluation failure")?;
    ensure(report.message().starts_with("cyclic include detected: "), "message")?;
    ensure(report.source_path().ends_with("b.rb"), "attributed to the file closing the cycle")?;
    ensure(report.line() == 1, "line")?;
    Ok(())
}

// ============================================================================
// SECTION: Syntax And Read Failures
// ============================================================================

#[test]
fn yaml_type_errors_carry_the_document_line() -> TestResult {
    let project = Project::new()?;
    let path = project.write("a.yml", "version: '1'\nname: [1, 2]\n")?;
    let report = ManifestLoader::default().load_path(&path, None).unwrap_err();
    ensure(report.kind() == FailureKind::SyntaxFailure, "syntax failure")?;
    ensure(report.line() == 2, format!("line {}", report.line()))?;
    ensure(report.context().iter().any(|line| line.tag == LineTag::Marker), "marker")?;
    Ok(())
}

#[test]
fn conflicting_author_keys_are_rejected() -> TestResult {
    let project = Project::new()?;
    let path = project.write("a.yml", "name: a\nversion: '1'\nauthor: A\nauthors: [B]\n")?;
    let report = ManifestLoader::default().load_path(&path, None).unwrap_err();
    ensure(report.kind() == FailureKind::SyntaxFailure, "syntax failure")?;
    ensure(report.line() == 4, "line of the second key")?;
    Ok(())
}

#[test]
fn unreadable_manifests_report_without_context() -> TestResult {
    let project = Project::new()?;
    let path = project.path("absent.gemspec");
    let report = ManifestLoader::default().load_path(&path, None).unwrap_err();
    ensure(report.kind() == FailureKind::EvaluationFailure, "evaluation failure")?;
    ensure(report.line() == 0, "unknown line")?;
    ensure(report.context().is_empty(), "no context")?;
    ensure(
        report.to_text()
            == format!(
                "[!] There was an error while loading `absent.gemspec`: {}\n #  from {}\n",
                report.message(),
                path.display()
            ),
        "summary and location only",
    )?;
    Ok(())
}

#[test]
fn in_memory_sources_render_context_from_their_bytes() -> TestResult {
    let bytes = b"name: a\nversion: '1'\nunknown: x\n";
    let path = std::path::Path::new("/nonexistent/virtual.yml");
    let report = ManifestLoader::default().load_bytes(bytes, path, None).unwrap_err();
    ensure(report.kind() == FailureKind::SyntaxFailure, "syntax failure")?;
    ensure(!report.context().is_empty(), "context from supplied bytes")?;
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_file_names_survive_rendering() -> TestResult {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let project = Project::new()?;
    let name = OsStr::from_bytes(b"bad\xffname.gemspec");
    let path = project.write(name, "Gem::Specification.new do |s|\n  s.name = \"x\nend\n")?;
    let report = ManifestLoader::default().load_path(&path, None).unwrap_err();
    let bytes = report.to_bytes();
    let needle = b"`bad\xffname.gemspec`";
    ensure(bytes.windows(needle.len()).any(|window| window == needle), "raw basename")?;
    Ok(())
}

// ============================================================================
// SECTION: Idempotence
// ============================================================================

#[test]
fn repeated_loads_are_identical() -> TestResult {
    let project = Project::new()?;
    project.write("lib/hello/version.rb", VERSION_RB)?;
    let good = project.write("hello.gemspec", HELLO_GEMSPEC)?;
    let bad = project.write("bad.gemspec", "Gem::Specification.new do |s|\n  s.nme = 1\nend\n")?;

    let loader = ManifestLoader::default();
    ensure(loader.load_path(&good, None)? == loader.load_path(&good, None)?, "manifests")?;
    let first = loader.load_path(&bad, None).unwrap_err();
    let second = loader.load_path(&bad, None).unwrap_err();
    ensure(first == second, "reports")?;
    ensure(first.to_bytes() == second.to_bytes(), "rendered bytes")?;
    ensure(
        first.message() == "undefined method `nme=' for an instance of Gem::Specification",
        format!("message: {}", first.message()),
    )?;
    Ok(())
}

#[test]
fn context_radius_is_configurable() -> TestResult {
    let project = Project::new()?;
    let path = project.write("a.yml", "a1: 1\nname: a\nversion: '1'\nz: 1\n")?;
    let report = ManifestLoader::default().with_context_radius(0).load_path(&path, None);
    let report = report.unwrap_err();
    ensure(report.line() == 1, format!("line {}", report.line()))?;
    ensure(report.context().len() == 1, "only the failing line")?;
    Ok(())
}
