//! `tm-l10n` command line: merge, statistics and lookups over translation memory files.

use std::ffi::OsString;
use std::io::Write;
use std::path::{
    Path,
    PathBuf,
};
use std::process::ExitCode;

use thiserror::Error;
use tm_l10n::config::L10nSettings;
use tm_l10n::document::{
    BackingKind,
    DocumentError,
    TmDocument,
};
use tm_l10n::error::L10nError;
use tm_l10n::merge::merge_with_installed;
use tm_l10n::registry::{
    ManagerParams,
    ManagerRegistry,
};
use tm_l10n::store::ENGLISH;
use tracing_subscriber::EnvFilter;

/// Printed for `--help` and usage errors.
const USAGE: &str = "\
Usage:
  tm-l10n merge  --kind <tmx|xliff> --installed <file> --harvested <file> --output <file> [--lang <code>]
  tm-l10n stats  --kind <tmx|xliff> --dir <dir> --app <id> --lang <code>
  tm-l10n lookup --dir <dir> --app <id> --id <string-id> [--english <text>] [--lang <code>] [--config <dir>]

Log verbosity follows RUST_LOG (default: warn).";

/// Errors reported by the command line.
#[derive(Error, Debug)]
enum CliError {
    /// Unknown or missing command
    #[error("{0}\n\n{usage}", usage = USAGE)]
    Usage(String),
    /// Missing or malformed option
    #[error(transparent)]
    Args(#[from] pico_args::Error),
    /// Registry or manager failure
    #[error(transparent)]
    L10n(#[from] L10nError),
    /// Unreadable or unwritable translation memory
    #[error(transparent)]
    Document(#[from] DocumentError),
    /// Writing to stdout failed
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Sets up logging and runs the requested command.
fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(pico_args::Arguments::from_env()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Dispatches to a subcommand.
fn run(mut args: pico_args::Arguments) -> Result<(), CliError> {
    if args.contains(["-h", "--help"]) {
        writeln!(std::io::stdout().lock(), "{USAGE}")?;
        return Ok(());
    }
    match args.subcommand()?.as_deref() {
        Some("merge") => merge(args),
        Some("stats") => stats(args),
        Some("lookup") => lookup(args),
        Some(other) => Err(CliError::Usage(format!("Unknown command '{other}'"))),
        None => Err(CliError::Usage("Missing command".to_string())),
    }
}

/// Fails on arguments no subcommand consumed.
fn finish(args: pico_args::Arguments) -> Result<(), CliError> {
    let rest: Vec<OsString> = args.finish();
    if rest.is_empty() {
        Ok(())
    } else {
        Err(CliError::Usage(format!("Unexpected arguments: {rest:?}")))
    }
}

/// File name up to the first dot, used as the application id of a merged file.
fn app_id_from_path(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().split('.').next().unwrap_or_default().to_string())
        .unwrap_or_default()
}

/// `merge`: reconciles an installed file with a harvested one.
fn merge(mut args: pico_args::Arguments) -> Result<(), CliError> {
    let kind: BackingKind = args.value_from_str("--kind")?;
    let installed: PathBuf = args.value_from_str("--installed")?;
    let harvested: PathBuf = args.value_from_str("--harvested")?;
    let output: PathBuf = args.value_from_str("--output")?;
    let language: Option<String> = args.opt_value_from_str("--lang")?;
    finish(args)?;

    let harvested = TmDocument::read(kind, &harvested)?;
    let (merged, report) =
        merge_with_installed(&harvested.to_entry_store(), TmDocument::read(kind, &installed));

    let language = language
        .or_else(|| merged.languages().into_iter().find(|language| language != ENGLISH))
        .unwrap_or_else(|| ENGLISH.to_string());
    let document = TmDocument::from_entry_store(
        kind,
        &merged,
        &app_id_from_path(&output),
        &language,
        harvested.app_version(),
    );
    document.write(&output)?;

    let mut stdout = std::io::stdout().lock();
    writeln!(
        stdout,
        "{}: kept {}, added {}, dropped {}",
        output.display(),
        report.kept,
        report.added,
        report.dropped
    )?;
    for id in &report.english_changed {
        writeln!(stdout, "  English changed, review: {id}")?;
    }
    Ok(())
}

/// Percentage for display.
#[allow(clippy::float_arithmetic)]
fn percent(fraction: f64) -> f64 {
    fraction * 100.0
}

/// `stats`: translation progress of one application and language.
fn stats(mut args: pico_args::Arguments) -> Result<(), CliError> {
    let kind: BackingKind = args.value_from_str("--kind")?;
    let dir: PathBuf = args.value_from_str("--dir")?;
    let app_id: String = args.value_from_str("--app")?;
    let language: String = args.value_from_str("--lang")?;
    finish(args)?;

    let registry = ManagerRegistry::new(&L10nSettings { backing_kind: kind, ..L10nSettings::default() });
    let manager = registry.create(ManagerParams::new(app_id).with_installed_dir(dir))?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "strings:    {}", manager.string_count()?)?;
    writeln!(
        stdout,
        "translated: {} ({:.1}%)",
        manager.number_translated(&language)?,
        percent(manager.fraction_translated(&language)?)
    )?;
    writeln!(
        stdout,
        "approved:   {} ({:.1}%)",
        manager.number_approved(&language)?,
        percent(manager.fraction_approved(&language)?)
    )?;
    Ok(())
}

/// `lookup`: resolves one string the way an application would.
fn lookup(mut args: pico_args::Arguments) -> Result<(), CliError> {
    let dir: PathBuf = args.value_from_str("--dir")?;
    let app_id: String = args.value_from_str("--app")?;
    let id: String = args.value_from_str("--id")?;
    let english: Option<String> = args.opt_value_from_str("--english")?;
    let language: Option<String> = args.opt_value_from_str("--lang")?;
    let config: Option<PathBuf> = args.opt_value_from_str("--config")?;
    finish(args)?;

    let registry = match config {
        Some(root) => ManagerRegistry::from_config_root(&root)?,
        None => ManagerRegistry::new(&L10nSettings::default()),
    };
    if let Some(language) = language {
        registry.set_ui_language(&language)?;
    }
    let manager = registry.create(ManagerParams::new(app_id).with_installed_dir(dir))?;
    let resolution = manager.resolve(&id, english.as_deref(), None)?;

    writeln!(std::io::stdout().lock(), "{}\t{}", resolution.language, resolution.text)?;
    Ok(())
}
