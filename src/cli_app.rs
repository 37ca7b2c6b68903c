//! Top-level CLI definition and dispatch.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use cache_keyfinder::core::config::{ScanConfig, Settings};
use cache_keyfinder::core::errors::KeyfinderError;
use cache_keyfinder::scanner::session::{FileOutcome, ScanReport, ScanSession};

#[derive(Debug, Parser)]
#[command(
    name = "ckf",
    version,
    about = "Find/unlink nginx cache files fast",
    long_about = None,
    override_usage = "ckf [OPTIONS] <path> <keyprefix> [keysuffix] [-d]",
    after_help = "Optional parameter -d unlinks found cache files"
)]
pub struct Cli {
    /// TOML settings file (falls back to CKF_CONFIG).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long)]
    json: bool,
    /// Disable colored output.
    #[arg(long)]
    no_color: bool,
    /// Trace every skipped file and print a summary to stderr.
    #[arg(short, long)]
    verbose: bool,
    /// <path> <keyprefix> [keysuffix] [-d]. Taken literally, so options
    /// must come before <path>.
    #[arg(
        value_name = "ARGS",
        required = true,
        num_args = 2..=4,
        allow_hyphen_values = true
    )]
    args: Vec<String>,
}

/// The only flag accepted after the key arguments.
const DELETE_FLAG: &str = "-d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type. Every variant maps to exit status 1.
#[derive(Debug, Error)]
pub enum CliError {
    /// Positional argument count outside 2..=4.
    #[error("expected <path> <keyprefix> [keysuffix] [-d]")]
    Usage,
    /// Unrecognized argument in the `-d` position.
    #[error("Invalid flag: {0}")]
    InvalidFlag(String),
    /// Sanity gate, traversal, delete or configuration failure.
    #[error(transparent)]
    Scan(#[from] KeyfinderError),
    /// The scan finished but met malformed cache files.
    #[error("{0} invalid cache file(s) encountered")]
    InvalidCacheFiles(u64),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// Usage banner printed to stdout when the arguments cannot be parsed.
pub fn usage_text() -> String {
    "Find/unlink nginx cache files fast\n\n\
     Usage: ckf <path> <keyprefix> [keysuffix] [-d]\n\n\
     Optional parameter -d unlinks found cache files\n\n"
        .to_string()
}

pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    let scan_config = resolve_scan_config(cli)?;
    let config_path = cli.config.clone().or_else(|| env_path("CKF_CONFIG"));
    let settings = Settings::load(config_path.as_deref())?;
    let mode = output_mode(cli);
    let verbose = cli.verbose;

    let report = ScanSession::new(&scan_config, &settings)
        .run(|path, outcome| emit_outcome(mode, verbose, path, outcome))?;

    if mode == OutputMode::Json {
        write_json_line(&json!({ "event": "summary", "report": report }))?;
    }
    if verbose {
        eprintln!("{}", format_summary(&report));
    }

    if report.has_errors() {
        return Err(CliError::InvalidCacheFiles(report.invalid));
    }
    Ok(())
}

/// `-d` is recognized only as the 3rd argument (no suffix) or the 4th
/// (after a suffix). Anything else in the 4th slot is rejected.
fn resolve_scan_config(cli: &Cli) -> Result<ScanConfig, CliError> {
    let (path, prefix, suffix, delete) = match cli.args.as_slice() {
        [path, prefix] => (path, prefix, None, false),
        [path, prefix, flag] if flag == DELETE_FLAG => (path, prefix, None, true),
        [path, prefix, suffix] => (path, prefix, Some(suffix.as_str()), false),
        [path, prefix, suffix, flag] if flag == DELETE_FLAG => {
            (path, prefix, Some(suffix.as_str()), true)
        }
        [_, _, _, other] => return Err(CliError::InvalidFlag(other.clone())),
        _ => return Err(CliError::Usage),
    };
    Ok(ScanConfig::new(path, prefix, suffix, delete))
}

fn emit_outcome(
    mode: OutputMode,
    verbose: bool,
    path: &Path,
    outcome: &FileOutcome,
) -> io::Result<()> {
    if *outcome == FileOutcome::InvalidStructure {
        report_invalid(path);
    }
    match mode {
        OutputMode::Human => emit_human(verbose, path, outcome),
        OutputMode::Json => emit_json(verbose, path, outcome),
    }
}

fn emit_human(verbose: bool, path: &Path, outcome: &FileOutcome) -> io::Result<()> {
    match outcome {
        FileOutcome::Matched { .. } => writeln!(io::stdout().lock(), "{}", path.display()),
        FileOutcome::Deleted { .. } => writeln!(
            io::stdout().lock(),
            "{} {}",
            "Deleted file:".green(),
            path.display()
        ),
        FileOutcome::Skipped(reason) => {
            if verbose {
                eprintln!(
                    "{}",
                    format!("Skipping file {}: {}", path.display(), reason.describe()).dimmed()
                );
            }
            Ok(())
        }
        FileOutcome::InvalidStructure => Ok(()),
    }
}

fn emit_json(verbose: bool, path: &Path, outcome: &FileOutcome) -> io::Result<()> {
    let path_str = path.to_string_lossy();
    let payload = match outcome {
        FileOutcome::Matched { key } => json!({ "event": "matched", "path": path_str, "key": key }),
        FileOutcome::Deleted { key } => json!({ "event": "deleted", "path": path_str, "key": key }),
        FileOutcome::InvalidStructure => json!({ "event": "invalid", "path": path_str }),
        FileOutcome::Skipped(reason) if verbose => {
            json!({ "event": "skipped", "path": path_str, "reason": reason })
        }
        FileOutcome::Skipped(_) => return Ok(()),
    };
    write_json_line(&payload)
}

fn report_invalid(path: &Path) {
    eprintln!(
        "{}",
        format!(
            "Invalid cache file \"{}\" encountered and skipped.",
            path.display()
        )
        .red()
    );
}

fn format_summary(report: &ScanReport) -> String {
    let s = &report.skipped;
    format!(
        "Scanned {} file(s) in {} ms: {} matched, {} deleted, {} invalid, {} skipped \
         (unreadable {}, too small {}, no marker {}, prefix {}, suffix {})",
        report.files_visited,
        report.duration_ms,
        report.matched,
        report.deleted,
        report.invalid,
        s.total(),
        s.unreadable,
        s.too_small,
        s.no_marker,
        s.prefix_mismatch,
        s.suffix_mismatch,
    )
}

fn write_json_line(payload: &Value) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var_os(name)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("CKF_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

// Plain paths stay the default even when piped, so `ckf ... | xargs` keeps working.
fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}
