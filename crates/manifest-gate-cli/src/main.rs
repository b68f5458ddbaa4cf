// crates/manifest-gate-cli/src/main.rs
// ============================================================================
// Module: Manifest Gate CLI Entry Point
// Description: Command dispatcher for runtime gating and manifest loading.
// Purpose: Provide a safe, localized CLI over the manifest-gate crates.
// Dependencies: clap, manifest-gate-config, manifest-gate-core, serde_json, serde_yaml.
// ============================================================================

//! ## Overview
//! The Manifest Gate CLI runs the runtime compatibility gate and loads
//! package manifests. Diagnostics are written to stderr byte-for-byte as the
//! core renderer produced them; everything else is routed through the i18n
//! catalog. Exit statuses: `0` success, `18` runtime mismatch, `1` any other
//! failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use manifest_gate_cli::i18n::Locale;
use manifest_gate_cli::i18n::set_locale;
use manifest_gate_cli::logging::init_tracing;
use manifest_gate_cli::t;
use manifest_gate_config::LoaderConfig;
use manifest_gate_config::ManifestGateConfig;
use manifest_gate_core::DiagnosticReport;
use manifest_gate_core::Dialect;
use manifest_gate_core::DirectorySource;
use manifest_gate_core::EvaluationContext;
use manifest_gate_core::ExecutionLocale;
use manifest_gate_core::HostRuntime;
use manifest_gate_core::ManifestLoader;
use manifest_gate_core::PackageManifest;
use manifest_gate_core::RuntimeCompatibilityGate;
use manifest_gate_core::SpecificationCache;
use manifest_gate_core::Verdict;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable for CLI language selection.
const LANG_ENV: &str = "MANIFEST_GATE_LANG";
/// Process locale variables, in precedence order.
const LOCALE_ENV_VARS: [&str; 3] = ["LC_ALL", "LC_CTYPE", "LANG"];

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "manifest-gate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue)]
    show_version: bool,
    /// Preferred output language (overrides `MANIFEST_GATE_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the runtime gate, then load every configured manifest.
    Check(CheckCommand),
    /// Manifest utilities.
    Manifest {
        /// Selected manifest subcommand.
        #[command(subcommand)]
        command: ManifestCommand,
    },
    /// Specification cache utilities.
    Cache {
        /// Selected cache subcommand.
        #[command(subcommand)]
        command: CacheCommand,
    },
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Arguments for `check`.
#[derive(Args, Debug)]
struct CheckCommand {
    /// Path to the config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Locale manifests are evaluated under.
    #[arg(long, value_name = "LOCALE")]
    locale: Option<String>,
}

/// Manifest subcommands.
#[derive(Subcommand, Debug)]
enum ManifestCommand {
    /// Load one manifest and print its canonical structure.
    Load(ManifestLoadCommand),
}

/// Arguments for `manifest load`.
#[derive(Args, Debug)]
struct ManifestLoadCommand {
    /// Manifest path.
    #[arg(value_name = "PATH")]
    path: PathBuf,
    /// Dialect override; detected when absent.
    #[arg(long, value_enum)]
    dialect: Option<DialectArg>,
    /// Locale the manifest is evaluated under.
    #[arg(long, value_name = "LOCALE")]
    locale: Option<String>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Cache subcommands.
#[derive(Subcommand, Debug)]
enum CacheCommand {
    /// Load a cached manifest by name and version.
    Lookup(CacheLookupCommand),
}

/// Arguments for `cache lookup`.
#[derive(Args, Debug)]
struct CacheLookupCommand {
    /// Package name.
    #[arg(long)]
    name: String,
    /// Package version.
    #[arg(long = "version", id = "package_version")]
    package_version: String,
    /// Cache root; overrides `loader.cache_root`.
    #[arg(long, value_name = "PATH")]
    root: Option<PathBuf>,
    /// Path to the config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Path to the config file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

/// Manifest dialect selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum DialectArg {
    /// Declarative YAML document.
    Declarative,
    /// Builder script.
    Script,
}

impl From<DialectArg> for Dialect {
    fn from(value: DialectArg) -> Self {
        match value {
            DialectArg::Declarative => Self::Declarative,
            DialectArg::Script => Self::Script,
        }
    }
}

/// Manifest output formats.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Pretty-printed JSON.
    Json,
    /// YAML.
    Yaml,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Check(command) => command_check(&command),
        Commands::Manifest {
            command,
        } => command_manifest(command),
        Commands::Cache {
            command,
        } => command_cache(command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Check Command
// ============================================================================

/// Runs the gate, then loads every configured manifest and package.
fn command_check(command: &CheckCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;

    if let (Some(requirement), Some(host)) = (config.runtime_requirement(), config.host_runtime())
    {
        let verdict = RuntimeCompatibilityGate::evaluate(Some(&requirement), &host);
        if let Verdict::Incompatible(mismatch) = verdict {
            tracing::debug!(reason = %mismatch.message, "runtime gate rejected host");
            write_stderr_line(&mismatch.message)
                .map_err(|err| CliError::new(output_error("stderr", &err)))?;
            return Ok(ExitCode::from(mismatch.exit_status()));
        }
    }

    if config.manifests.is_empty() && config.packages.is_empty() {
        write_stdout_line(&t!("check.nothing"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let loader = build_loader(&config.loader, command.locale.as_deref());
    let host = config.host_runtime();
    let mut checked = 0usize;
    let mut failed = 0usize;

    for entry in &config.manifests {
        let path = config.resolve(&entry.path);
        let result = loader.load_path(&path, entry.dialect);
        checked += 1;
        if !report_outcome(result, host.as_ref())? {
            failed += 1;
        }
    }

    if let Some(manifest_dir) = config.manifest_dir() {
        let source = DirectorySource::new(manifest_dir);
        let cache = config.cache_root().map(SpecificationCache::new);
        for package in &config.packages {
            let result =
                loader.load_package(&package.name, &package.version, &source, cache.as_ref());
            checked += 1;
            if !report_outcome(result, host.as_ref())? {
                failed += 1;
            }
        }
    }

    write_stdout_line(&t!("check.summary", count = checked, failed = failed))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    if failed == 0 { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
}

/// Writes the outcome of one load and returns whether it succeeded.
fn report_outcome(
    result: Result<PackageManifest, DiagnosticReport>,
    host: Option<&HostRuntime>,
) -> CliResult<bool> {
    let manifest = match result {
        Ok(manifest) => manifest,
        Err(report) => {
            write_report(&report)?;
            return Ok(false);
        }
    };
    if let Some(host) = host
        && let Err(mismatch) = RuntimeCompatibilityGate::check_manifest(&manifest, host)
    {
        write_stderr_line(&mismatch.to_string())
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
        return Ok(false);
    }
    write_stdout_line(&t!(
        "check.manifest.ok",
        package = manifest.full_name(),
        path = manifest.source_path().display()
    ))
    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(true)
}

// ============================================================================
// SECTION: Manifest Commands
// ============================================================================

/// Dispatches manifest subcommands.
fn command_manifest(command: ManifestCommand) -> CliResult<ExitCode> {
    match command {
        ManifestCommand::Load(command) => command_manifest_load(&command),
    }
}

/// Loads one manifest and prints it.
fn command_manifest_load(command: &ManifestLoadCommand) -> CliResult<ExitCode> {
    let locale = command.locale.clone().or_else(process_locale);
    let context = locale.map_or_else(EvaluationContext::default, |name| {
        EvaluationContext::new(ExecutionLocale::new(name))
    });
    let loader = ManifestLoader::new(context);
    match loader.load_path(&command.path, command.dialect.map(Dialect::from)) {
        Ok(manifest) => {
            write_manifest(&manifest, command.format)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(report) => {
            write_report(&report)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// SECTION: Cache Commands
// ============================================================================

/// Dispatches cache subcommands.
fn command_cache(command: CacheCommand) -> CliResult<ExitCode> {
    match command {
        CacheCommand::Lookup(command) => command_cache_lookup(&command),
    }
}

/// Loads a cached manifest.
fn command_cache_lookup(command: &CacheLookupCommand) -> CliResult<ExitCode> {
    let (root, loader) = match &command.root {
        Some(root) => (root.clone(), ManifestLoader::default()),
        None => {
            let config = load_config(command.config.as_deref())?;
            let root = config
                .cache_root()
                .ok_or_else(|| CliError::new(t!("cache.root_missing")))?;
            (root, build_loader(&config.loader, None))
        }
    };
    let cache = SpecificationCache::new(&root);
    let Some(entry) = cache.entry(&command.name, &command.package_version) else {
        return Err(CliError::new(t!(
            "cache.miss",
            package = format!("{}-{}", command.name, command.package_version),
            root = root.display()
        )));
    };
    match loader.load_path(&entry.path, Some(Dialect::Declarative)) {
        Ok(manifest) if !entry.describes(&manifest) => Err(CliError::new(t!(
            "cache.mismatch",
            path = entry.path.display(),
            found = manifest.full_name(),
            package = format!("{}-{}", entry.name, entry.version)
        ))),
        Ok(manifest) => {
            write_manifest(&manifest, command.format)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(report) => {
            write_report(&report)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = load_config(command.config.as_deref())?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<ManifestGateConfig> {
    ManifestGateConfig::load(path).map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Builds a loader from config, with `--locale` taking precedence over
/// `loader.locale`, which takes precedence over the process locale.
fn build_loader(loader: &LoaderConfig, locale_flag: Option<&str>) -> ManifestLoader {
    let env_locale = if locale_flag.is_none() && loader.locale.is_none() {
        process_locale()
    } else {
        None
    };
    let context = loader.evaluation_context(locale_flag.or(env_locale.as_deref()));
    ManifestLoader::new(context).with_context_radius(loader.context_radius)
}

/// Returns the first non-empty process locale variable.
fn process_locale() -> Option<String> {
    LOCALE_ENV_VARS
        .iter()
        .find_map(|name| env::var(name).ok().filter(|value| !value.trim().is_empty()))
}

/// Resolves the CLI language from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

/// Serializes a manifest to stdout.
fn write_manifest(manifest: &PackageManifest, format: OutputFormat) -> CliResult<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(manifest)
            .map_err(|err| CliError::new(t!("manifest.serialize_failed", error = err)))?,
        OutputFormat::Yaml => serde_yaml::to_string(manifest)
            .map_err(|err| CliError::new(t!("manifest.serialize_failed", error = err)))?,
    };
    write_stdout_line(rendered.trim_end())
        .map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a rendered diagnostic to stderr byte-for-byte.
fn write_report(report: &DiagnosticReport) -> CliResult<()> {
    write_stderr_bytes(&report.to_bytes())
        .map_err(|err| CliError::new(output_error("stderr", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Writes raw bytes to stderr without adding a newline.
fn write_stderr_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    stderr.write_all(bytes)
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================
