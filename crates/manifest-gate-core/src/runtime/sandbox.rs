// crates/manifest-gate-core/src/runtime/sandbox.rs
// ============================================================================
// Module: Sandbox Evaluator
// Description: Decodes and evaluates manifest bytes in either dialect.
// Purpose: Turn raw manifest bytes into a PackageManifest or a classified failure.
// Dependencies: crate::core, manifest-script, serde, serde_yaml
// ============================================================================

//! ## Overview
//! The evaluator never touches process-wide state: the locale that decides
//! how script sources are decoded arrives in an [`EvaluationContext`].
//! Declarative documents are always UTF-8 YAML with a closed key set; a
//! document tagged as a rubygems specification is first normalized to that
//! key set. Script
//! manifests run through `manifest-script`, whose only capabilities are the
//! [`SpecificationBuilder`] defined here and a filesystem include resolver.
//! Every outcome is either a complete manifest or exactly one
//! [`SourceFailure`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use manifest_script::IncludeRequest;
use manifest_script::IncludeResolver;
use manifest_script::ScriptError;
use manifest_script::ScriptErrorKind;
use manifest_script::ScriptResult;
use manifest_script::SpecificationTarget;
use manifest_script::TargetError;
use manifest_script::Value;
use serde::Deserialize;

use crate::core::Dependency;
use crate::core::DependencyKind;
use crate::core::Dialect;
use crate::core::ExecutionLocale;
use crate::core::FailureKind;
use crate::core::ManifestDraft;
use crate::core::ManifestError;
use crate::core::PackageManifest;
use crate::core::Requirement;
use crate::core::SourceFailure;
use crate::core::TextEncoding;
use crate::core::Version;
use crate::core::encoding::decode;
use crate::core::encoding::decode_script;
use crate::interfaces::MAX_MANIFEST_BYTES;
use crate::interfaces::SourceError;
use crate::runtime::source::read_with_limit;

// ============================================================================
// SECTION: Evaluation Context
// ============================================================================

/// Explicit environment an evaluation runs under.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EvaluationContext {
    /// Locale that decides the assumed source encoding of scripts.
    locale: ExecutionLocale,
}

impl EvaluationContext {
    /// Creates a context for `locale`.
    #[must_use]
    pub const fn new(locale: ExecutionLocale) -> Self {
        Self {
            locale,
        }
    }

    /// Returns the execution locale.
    #[must_use]
    pub const fn locale(&self) -> &ExecutionLocale {
        &self.locale
    }
}

// ============================================================================
// SECTION: Sandbox Evaluator
// ============================================================================

/// Evaluates manifest bytes into the canonical manifest.
#[derive(Debug, Clone, Default)]
pub struct SandboxEvaluator {
    /// Evaluation environment.
    context: EvaluationContext,
}

impl SandboxEvaluator {
    /// Creates an evaluator bound to `context`.
    #[must_use]
    pub const fn new(context: EvaluationContext) -> Self {
        Self {
            context,
        }
    }

    /// Returns the evaluation context.
    #[must_use]
    pub const fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// Evaluates `bytes` read from `path` as `dialect`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceFailure`] classified as an encoding, syntax, or
    /// evaluation failure, attributed to the file and line that caused it.
    pub fn evaluate(
        &self,
        bytes: &[u8],
        path: &Path,
        dialect: Dialect,
    ) -> Result<PackageManifest, SourceFailure> {
        if bytes.len() > MAX_MANIFEST_BYTES {
            return Err(SourceFailure::new(
                FailureKind::EvaluationFailure,
                format!(
                    "manifest exceeds size limit: {} bytes (max {MAX_MANIFEST_BYTES})",
                    bytes.len()
                ),
                path,
                0,
            ));
        }
        match dialect {
            Dialect::Declarative => evaluate_declarative(bytes, path),
            Dialect::Script => self.evaluate_script(bytes, path),
        }
    }

    /// Decodes and runs a script manifest.
    fn evaluate_script(&self, bytes: &[u8], path: &Path) -> Result<PackageManifest, SourceFailure> {
        let locale = self.context.locale();
        let (text, encoding) = decode_script(bytes, locale).map_err(|err| {
            SourceFailure::new(FailureKind::EncodingFailure, err.to_string(), path, err.line())
        })?;

        // Includes that cycle back to the root resolve to its canonical path.
        let root = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let resolver = FileIncludeResolver {
            locale,
        };
        let mut builder = SpecificationBuilder::default();
        let outcome = manifest_script::evaluate(&text, &root, &mut builder, &resolver)
            .map_err(|err| script_failure(err, &root, path))?;

        builder.into_draft().finish(path.to_path_buf(), encoding).map_err(|err| {
            SourceFailure::new(
                FailureKind::EvaluationFailure,
                err.to_string(),
                path,
                outcome.specification_line,
            )
        })
    }
}

/// Converts a script error, mapping the canonical root back to `path`.
fn script_failure(err: ScriptError, root: &Path, path: &Path) -> SourceFailure {
    let kind = match err.kind {
        ScriptErrorKind::Syntax => FailureKind::SyntaxFailure,
        ScriptErrorKind::Encoding => FailureKind::EncodingFailure,
        ScriptErrorKind::Evaluation => FailureKind::EvaluationFailure,
    };
    let source_path = match err.path {
        Some(source) if source.as_path() != root => source,
        _ => path.to_path_buf(),
    };
    SourceFailure::new(kind, err.message, source_path, err.line)
}

// ============================================================================
// SECTION: Declarative Dialect
// ============================================================================

/// Value that may be written as one string or a list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    /// Single string.
    One(String),
    /// List of strings.
    Many(Vec<String>),
}

impl OneOrMany {
    /// Flattens into a list.
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(value) => vec![value],
            Self::Many(values) => values,
        }
    }
}

/// Dependency entry of a declarative document.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarativeDependency {
    /// Package name.
    name: String,
    /// Requirement fragments.
    requirement: Option<OneOrMany>,
    /// Dependency class.
    #[serde(rename = "type", default)]
    kind: DependencyKind,
}

/// Top-level declarative document. Unknown keys fail closed.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DeclarativeDocument {
    /// Package name.
    name: Option<String>,
    /// Package version; YAML may type it as a number.
    version: Option<serde_yaml::Value>,
    /// Summary.
    summary: Option<String>,
    /// Single author.
    author: Option<String>,
    /// Author list.
    authors: Option<OneOrMany>,
    /// Description.
    description: Option<String>,
    /// Homepage.
    homepage: Option<String>,
    /// Single license.
    license: Option<String>,
    /// License list.
    licenses: Option<OneOrMany>,
    /// Required runtime version.
    #[serde(alias = "required_ruby_version")]
    required_runtime_version: Option<OneOrMany>,
    /// Dependencies in declaration order.
    #[serde(default)]
    dependencies: Vec<DeclarativeDependency>,
}

/// Parses a declarative document.
fn evaluate_declarative(bytes: &[u8], path: &Path) -> Result<PackageManifest, SourceFailure> {
    let text = decode(bytes, TextEncoding::Utf8).map_err(|err| {
        SourceFailure::new(FailureKind::EncodingFailure, err.to_string(), path, err.line())
    })?;
    let syntax = |message: String, line: usize| {
        SourceFailure::new(FailureKind::SyntaxFailure, message, path, line)
    };

    let located = |err: serde_yaml::Error| {
        let line = err.location().map_or(0, |location| location.line());
        syntax(err.to_string(), line)
    };
    let raw: serde_yaml::Value = serde_yaml::from_str(&text).map_err(located)?;
    let document: DeclarativeDocument = match raw {
        serde_yaml::Value::Tagged(tagged) if tagged.tag == RUBYGEMS_SPECIFICATION_TAG => {
            serde_yaml::from_value(normalize_rubygems_document(tagged.value)).map_err(located)?
        }
        _ => serde_yaml::from_str(&text).map_err(located)?,
    };

    if document.author.is_some() && document.authors.is_some() {
        return Err(syntax(
            "author and authors are mutually exclusive".to_string(),
            key_line(&text, "authors"),
        ));
    }
    if document.license.is_some() && document.licenses.is_some() {
        return Err(syntax(
            "license and licenses are mutually exclusive".to_string(),
            key_line(&text, "licenses"),
        ));
    }

    let version = match document.version.map(|value| unwrap_version(untag(value))) {
        None | Some(serde_yaml::Value::Null) => None,
        Some(serde_yaml::Value::String(version)) => Some(version),
        Some(serde_yaml::Value::Number(number)) => Some(number.to_string()),
        Some(_) => {
            return Err(syntax(
                "version must be a string".to_string(),
                key_line(&text, "version"),
            ));
        }
    };
    if let Some(version) = &version {
        Version::parse(version)
            .map_err(|err| syntax(err.to_string(), key_line(&text, "version")))?;
    }

    let required_runtime_version = match document.required_runtime_version {
        Some(value) => {
            let fragments = value.into_vec();
            for fragment in &fragments {
                Requirement::parse(fragment).map_err(|err| {
                    syntax(err.to_string(), runtime_requirement_line(&text))
                })?;
            }
            Some(fragments.join(", "))
        }
        None => None,
    };

    let mut dependencies = Vec::with_capacity(document.dependencies.len());
    for entry in document.dependencies {
        let fragments = entry.requirement.map(OneOrMany::into_vec).unwrap_or_default();
        for fragment in &fragments {
            Requirement::parse(fragment)
                .map_err(|err| syntax(err.to_string(), key_line(&text, "dependencies")))?;
        }
        dependencies.push(Dependency::new(entry.name, &fragments, entry.kind));
    }

    let draft = ManifestDraft {
        name: document.name,
        version,
        summary: document.summary,
        authors: document
            .author
            .map(|author| vec![author])
            .or_else(|| document.authors.map(OneOrMany::into_vec))
            .unwrap_or_default(),
        description: document.description,
        homepage: document.homepage,
        licenses: document
            .license
            .map(|license| vec![license])
            .or_else(|| document.licenses.map(OneOrMany::into_vec))
            .unwrap_or_default(),
        dependencies,
        required_runtime_version,
    };
    draft.finish(path.to_path_buf(), TextEncoding::Utf8).map_err(|err| {
        let ManifestError::MissingAttribute(attribute) = err;
        syntax(err.to_string(), key_line(&text, attribute))
    })
}

// ============================================================================
// SECTION: Rubygems Serialization
// ============================================================================

/// Document tag written by rubygems when it serializes a specification.
const RUBYGEMS_SPECIFICATION_TAG: &str = "!ruby/object:Gem::Specification";

/// Dependency keys rubygems writes alongside `name`, `requirement`, `type`.
const IGNORED_DEPENDENCY_KEYS: &[&str] = &["prerelease", "version_requirements"];

/// Rewrites a rubygems-serialized specification into the plain key set.
///
/// Serialization metadata is dropped, nested `Gem::Version` and
/// `Gem::Requirement` objects collapse to strings, and `:runtime` symbols
/// lose their colon. Keys outside both sets are left for the closed
/// document schema to reject.
fn normalize_rubygems_document(value: serde_yaml::Value) -> serde_yaml::Value {
    let serde_yaml::Value::Mapping(mut document) = untag(value) else {
        return serde_yaml::Value::Null;
    };
    for key in IGNORED_ATTRIBUTES {
        document.shift_remove(*key);
    }
    if let Some(version) = document.get_mut("version") {
        *version = unwrap_version(std::mem::take(version));
    }
    for key in ["required_ruby_version", "required_runtime_version"] {
        if let Some(requirement) = document.get_mut(key) {
            *requirement = flatten_requirement(std::mem::take(requirement));
        }
    }
    if let Some(serde_yaml::Value::Sequence(dependencies)) = document.get_mut("dependencies") {
        for dependency in dependencies.iter_mut() {
            let serde_yaml::Value::Mapping(entry) = dependency else {
                continue;
            };
            for key in IGNORED_DEPENDENCY_KEYS {
                entry.shift_remove(*key);
            }
            if let Some(requirement) = entry.get_mut("requirement") {
                *requirement = flatten_requirement(std::mem::take(requirement));
            }
            if let Some(serde_yaml::Value::String(kind)) = entry.get_mut("type")
                && let Some(symbol) = kind.strip_prefix(':')
            {
                *kind = symbol.to_string();
            }
        }
    }
    serde_yaml::Value::Mapping(document)
}

/// Removes YAML tags at every depth.
fn untag(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::Tagged(tagged) => untag(tagged.value),
        serde_yaml::Value::Sequence(items) => {
            serde_yaml::Value::Sequence(items.into_iter().map(untag).collect())
        }
        serde_yaml::Value::Mapping(entries) => serde_yaml::Value::Mapping(
            entries.into_iter().map(|(key, value)| (key, untag(value))).collect(),
        ),
        other => other,
    }
}

/// Collapses a `{version: X}` object to `X`.
fn unwrap_version(value: serde_yaml::Value) -> serde_yaml::Value {
    match value {
        serde_yaml::Value::Mapping(mut entries)
            if entries.len() == 1 && entries.contains_key("version") =>
        {
            entries.shift_remove("version").unwrap_or_default()
        }
        other => other,
    }
}

/// Collapses `{requirements: [[op, version], ...]}` to `["op version", ...]`.
///
/// Shapes other than the rubygems one are returned unchanged.
fn flatten_requirement(value: serde_yaml::Value) -> serde_yaml::Value {
    match requirement_fragments(&value) {
        Some(fragments) => serde_yaml::Value::Sequence(
            fragments.into_iter().map(serde_yaml::Value::String).collect(),
        ),
        None => value,
    }
}

/// Reads the `[op, version]` pairs of a serialized `Gem::Requirement`.
fn requirement_fragments(value: &serde_yaml::Value) -> Option<Vec<String>> {
    let serde_yaml::Value::Sequence(pairs) = value.as_mapping()?.get("requirements")? else {
        return None;
    };
    pairs
        .iter()
        .map(|pair| {
            let [serde_yaml::Value::String(operator), version] = pair.as_sequence()?.as_slice()
            else {
                return None;
            };
            let version = match unwrap_version(version.clone()) {
                serde_yaml::Value::String(version) => version,
                serde_yaml::Value::Number(number) => number.to_string(),
                _ => return None,
            };
            Some(format!("{operator} {version}"))
        })
        .collect()
}

/// Returns the 1-based line of a top-level `key:` entry, or `0`.
fn key_line(text: &str, key: &str) -> usize {
    text.lines()
        .position(|line| {
            line.strip_prefix(key).is_some_and(|rest| rest.trim_start().starts_with(':'))
        })
        .map_or(0, |index| index + 1)
}

/// Returns the line of the runtime requirement under either spelling.
fn runtime_requirement_line(text: &str) -> usize {
    match key_line(text, "required_runtime_version") {
        0 => key_line(text, "required_ruby_version"),
        line => line,
    }
}

// ============================================================================
// SECTION: Specification Builder
// ============================================================================

/// Attributes outside the canonical model, dropped by the builder and from
/// rubygems-serialized documents.
const IGNORED_ATTRIBUTES: &[&str] = &[
    "autorequire",
    "bindir",
    "cert_chain",
    "date",
    "email",
    "executables",
    "extensions",
    "extra_rdoc_files",
    "files",
    "metadata",
    "platform",
    "post_install_message",
    "rdoc_options",
    "require_paths",
    "required_rubygems_version",
    "requirements",
    "rubygems_version",
    "signing_key",
    "specification_version",
    "test_files",
];

/// [`SpecificationTarget`] that fills a [`ManifestDraft`].
#[derive(Debug, Default)]
pub struct SpecificationBuilder {
    /// Draft under construction.
    draft: ManifestDraft,
}

impl SpecificationBuilder {
    /// Returns the populated draft.
    #[must_use]
    pub fn into_draft(self) -> ManifestDraft {
        self.draft
    }
}

impl SpecificationTarget for SpecificationBuilder {
    fn assign(&mut self, attribute: &str, value: Value) -> Result<(), TargetError> {
        match attribute {
            "name" => self.draft.name = scalar(attribute, value)?,
            "version" => {
                let version = scalar(attribute, value)?;
                if let Some(version) = &version {
                    Version::parse(version)
                        .map_err(|err| TargetError::Invalid(err.to_string()))?;
                }
                self.draft.version = version;
            }
            "summary" => self.draft.summary = scalar(attribute, value)?,
            "description" => self.draft.description = scalar(attribute, value)?,
            "homepage" => self.draft.homepage = scalar(attribute, value)?,
            "author" => self.draft.authors = scalar(attribute, value)?.into_iter().collect(),
            "authors" => self.draft.authors = list(attribute, value)?,
            "license" => self.draft.licenses = scalar(attribute, value)?.into_iter().collect(),
            "licenses" => self.draft.licenses = list(attribute, value)?,
            "required_ruby_version" | "required_runtime_version" => {
                let fragments = list(attribute, value)?;
                self.draft.required_runtime_version = if fragments.is_empty() {
                    None
                } else {
                    validate_requirements(&fragments)?;
                    Some(fragments.join(", "))
                };
            }
            _ if IGNORED_ATTRIBUTES.contains(&attribute) => {}
            _ => return Err(TargetError::UndefinedMethod),
        }
        Ok(())
    }

    fn invoke(&mut self, method: &str, args: Vec<Value>) -> Result<(), TargetError> {
        let kind = match method {
            "add_dependency" | "add_runtime_dependency" => DependencyKind::Runtime,
            "add_development_dependency" => DependencyKind::Development,
            _ => return Err(TargetError::UndefinedMethod),
        };
        let mut args = args.into_iter();
        let name = match args.next() {
            Some(Value::Str(name)) => name,
            Some(other) => {
                return Err(TargetError::Invalid(format!(
                    "dependency name must be a String, got {}",
                    other.class_name()
                )));
            }
            None => {
                return Err(TargetError::Invalid(
                    "wrong number of arguments (given 0, expected 1+)".to_string(),
                ));
            }
        };
        let mut fragments = Vec::new();
        for arg in args {
            fragments.extend(list(method, arg)?);
        }
        validate_requirements(&fragments)?;
        self.draft.dependencies.push(Dependency::new(name, &fragments, kind));
        Ok(())
    }
}

/// Reads a single string-like value; `nil` clears the attribute.
fn scalar(attribute: &str, value: Value) -> Result<Option<String>, TargetError> {
    match value {
        Value::Nil => Ok(None),
        Value::Str(text) => Ok(Some(text)),
        Value::Number(_) => Ok(Some(value.to_string())),
        other => Err(TargetError::Invalid(format!(
            "{attribute} must be a String, got {}",
            other.class_name()
        ))),
    }
}

/// Reads a string or an array of strings; `nil` yields an empty list.
fn list(attribute: &str, value: Value) -> Result<Vec<String>, TargetError> {
    match value {
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.extend(scalar(attribute, item)?);
            }
            Ok(out)
        }
        other => Ok(scalar(attribute, other)?.into_iter().collect()),
    }
}

/// Rejects requirement fragments that do not parse.
fn validate_requirements(fragments: &[String]) -> Result<(), TargetError> {
    for fragment in fragments {
        Requirement::parse(fragment).map_err(|err| TargetError::Invalid(err.to_string()))?;
    }
    Ok(())
}

// ============================================================================
// SECTION: Include Resolver
// ============================================================================

/// Resolves script includes against the filesystem.
struct FileIncludeResolver<'a> {
    /// Locale used to decode included files.
    locale: &'a ExecutionLocale,
}

impl IncludeResolver for FileIncludeResolver<'_> {
    fn locate(&self, from: &Path, request: &IncludeRequest<'_>) -> ScriptResult<PathBuf> {
        let base = from.parent().unwrap_or_else(|| Path::new("."));
        let requested = base.join(request.target);
        let candidate = if requested.extension().is_some() {
            requested.clone()
        } else {
            let mut file = requested.clone().into_os_string();
            file.push(".rb");
            PathBuf::from(file)
        };
        std::fs::canonicalize(&candidate).map_err(|_| {
            ScriptError::evaluation(
                format!("cannot load such file -- {}", requested.display()),
                request.line,
            )
        })
    }

    fn load(&self, path: &Path) -> ScriptResult<String> {
        let bytes = read_with_limit(path).map_err(|err| {
            let message = match err {
                SourceError::NotFound(_) => format!("cannot load such file -- {}", path.display()),
                other => other.to_string(),
            };
            ScriptError::evaluation(message, 0)
        })?;
        decode_script(&bytes, self.locale)
            .map(|(text, _)| text)
            .map_err(|err| ScriptError::encoding(err.to_string(), err.line()).attributed_to(path, 0))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only panic-based assertions are permitted."
    )]

    use std::path::Path;

    use super::SandboxEvaluator;
    use super::flatten_requirement;
    use super::key_line;
    use super::untag;
    use crate::core::Dialect;
    use crate::core::FailureKind;

    #[test]
    fn key_line_finds_top_level_keys_only() {
        let text = "name: a\ndependencies:\n  - name: b\nversion: 1\n";
        assert_eq!(key_line(text, "version"), 4);
        assert_eq!(key_line(text, "name"), 1);
        assert_eq!(key_line(text, "summary"), 0);
    }

    #[test]
    fn declarative_unknown_keys_fail_closed() {
        let err = SandboxEvaluator::default()
            .evaluate(b"name: a\nversion: '1'\nfiles: []\n", Path::new("a.yml"), Dialect::Declarative)
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::SyntaxFailure);
        assert!(err.message.contains("files"));
    }

    #[test]
    fn serialized_requirements_flatten_to_fragments() {
        let serialized: serde_yaml::Value = serde_yaml::from_str(
            "!ruby/object:Gem::Requirement\nrequirements:\n- - \"~>\"\n  - !ruby/object:Gem::Version\n    version: '1.2'\n",
        )
        .unwrap();
        let flattened = flatten_requirement(untag(serialized));
        let expected: serde_yaml::Value = serde_yaml::from_str("['~> 1.2']").unwrap();
        assert_eq!(flattened, expected);

        let plain: serde_yaml::Value = serde_yaml::from_str("'>= 1'").unwrap();
        assert_eq!(flatten_requirement(plain.clone()), plain);
    }

    #[test]
    fn declarative_numeric_versions_are_accepted() {
        let manifest = SandboxEvaluator::default()
            .evaluate(b"name: a\nversion: 2\n", Path::new("a.yml"), Dialect::Declarative)
            .unwrap();
        assert_eq!(manifest.version(), "2");
    }

    #[test]
    fn declarative_missing_version_is_a_syntax_failure() {
        let err = SandboxEvaluator::default()
            .evaluate(b"name: a\n", Path::new("a.yml"), Dialect::Declarative)
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::SyntaxFailure);
        assert_eq!(err.message, "missing value for attribute version");
        assert_eq!(err.line, 0);
    }

    #[test]
    fn script_without_name_fails_at_the_specification_line() {
        let source = b"# comment\nGem::Specification.new do |s|\n  s.version = '1.0'\nend\n";
        let err = SandboxEvaluator::default()
            .evaluate(source, Path::new("/nonexistent/a.gemspec"), Dialect::Script)
            .unwrap_err();
        assert_eq!(err.kind, FailureKind::EvaluationFailure);
        assert_eq!(err.message, "missing value for attribute name");
        assert_eq!(err.line, 2);
        assert_eq!(err.source_path, Path::new("/nonexistent/a.gemspec"));
    }

    #[test]
    fn malformed_script_versions_are_rejected() {
        let source = b"Gem::Specification.new do |s|\n  s.name = 'a'\n  s.version = 'one'\nend\n";
        let err = SandboxEvaluator::default()
            .evaluate(source, Path::new("/nonexistent/a.gemspec"), Dialect::Script)
            .unwrap_err();
        assert_eq!(err.message, "Malformed version number string \"one\"");
        assert_eq!(err.line, 3);
    }
}
