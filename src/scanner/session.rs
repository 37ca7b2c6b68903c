//! Scan session: drives the walker, classifies each file, performs the action
//! and accumulates the run's report.
//!
//! Per-file state machine:
//! `Start -> PrefixCheck -> {Skip | SuffixCheck} -> {Skip | InvalidStructure | Match} -> {Report | Delete}`
//!
//! No file reaches more than one terminal action. The session replaces any
//! process-wide error flag: invalid cache files are counted in [`ScanReport`]
//! and the caller decides the exit status from it.

#![allow(missing_docs)]

use std::io;
use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::core::config::{ScanConfig, Settings};
use crate::core::errors::{KeyfinderError, Result};
use crate::logger::jsonl::{EventType, JsonlConfig, JsonlWriter, LogEntry, Severity};
use crate::scanner::deletion::delete_cache_file;
use crate::scanner::header::{HeaderRead, HeaderReader};
use crate::scanner::matcher::{KeyDecision, KeyPattern, extract_key};
use crate::scanner::walker::DirectoryWalker;

/// Why a file was passed over without action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Open, read or seek failed (e.g. the file vanished mid-scan).
    Unreadable,
    TooSmall,
    NoMarker,
    PrefixMismatch,
    SuffixMismatch,
}

impl SkipReason {
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Unreadable => "unreadable",
            Self::TooSmall => "header too small",
            Self::NoMarker => "no key marker",
            Self::PrefixMismatch => "prefix check failed",
            Self::SuffixMismatch => "suffix check failed",
        }
    }
}

/// Terminal classification of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Skipped(SkipReason),
    /// A suffix was requested but the key line is not newline-terminated
    /// within the window. Counted as an error; the file is left alone.
    InvalidStructure,
    /// Report mode match.
    Matched { key: Option<String> },
    /// Delete mode match; the file is gone.
    Deleted { key: Option<String> },
}

/// Per-reason skip counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub unreadable: u64,
    pub too_small: u64,
    pub no_marker: u64,
    pub prefix_mismatch: u64,
    pub suffix_mismatch: u64,
}

impl SkipCounts {
    fn record(&mut self, reason: SkipReason) {
        let slot = match reason {
            SkipReason::Unreadable => &mut self.unreadable,
            SkipReason::TooSmall => &mut self.too_small,
            SkipReason::NoMarker => &mut self.no_marker,
            SkipReason::PrefixMismatch => &mut self.prefix_mismatch,
            SkipReason::SuffixMismatch => &mut self.suffix_mismatch,
        };
        *slot += 1;
    }

    pub const fn total(&self) -> u64 {
        self.unreadable
            + self.too_small
            + self.no_marker
            + self.prefix_mismatch
            + self.suffix_mismatch
    }
}

/// Summary of a completed (or aborted) run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    pub files_visited: u64,
    pub matched: u64,
    pub deleted: u64,
    pub invalid: u64,
    pub skipped: SkipCounts,
    pub duration_ms: u64,
}

impl ScanReport {
    /// Whether any invalid cache file was encountered. Drives the exit status.
    pub const fn has_errors(&self) -> bool {
        self.invalid > 0
    }

    fn record(&mut self, outcome: &FileOutcome) {
        self.files_visited += 1;
        match outcome {
            FileOutcome::Skipped(reason) => self.skipped.record(*reason),
            FileOutcome::InvalidStructure => self.invalid += 1,
            FileOutcome::Matched { .. } => self.matched += 1,
            FileOutcome::Deleted { .. } => {
                self.matched += 1;
                self.deleted += 1;
            }
        }
    }
}

/// One run over one root.
pub struct ScanSession<'a> {
    config: &'a ScanConfig,
    reader: HeaderReader,
    report: ScanReport,
    activity: Option<JsonlWriter>,
}

impl<'a> ScanSession<'a> {
    pub fn new(config: &'a ScanConfig, settings: &Settings) -> Self {
        let activity = settings.log.activity_log.as_ref().map(|path| {
            JsonlWriter::open(JsonlConfig {
                path: path.clone(),
                fallback_to_stderr: settings.log.fallback_to_stderr,
            })
        });

        Self {
            config,
            reader: HeaderReader::new(&settings.header),
            report: ScanReport::default(),
            activity,
        }
    }

    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    /// Classify one file and perform its action.
    ///
    /// Returns an error only for the first-file sanity gate and for failed
    /// deletions; everything else is folded into the outcome.
    pub fn process_file(&mut self, path: &Path) -> Result<FileOutcome> {
        let outcome = self.classify_and_act(path)?;
        self.report.record(&outcome);
        self.log_outcome(path, &outcome);
        Ok(outcome)
    }

    /// Walk the configured root, processing every non-directory entry.
    ///
    /// `observe` sees each outcome right after it is final; an output error
    /// there aborts the walk like any other fatal error.
    pub fn run<F>(mut self, mut observe: F) -> Result<ScanReport>
    where
        F: FnMut(&Path, &FileOutcome) -> io::Result<()>,
    {
        let start = Instant::now();
        let config = self.config;

        let mut entry =
            LogEntry::new(EventType::ScanStart, Severity::Info).with_path(&config.root_path);
        entry.delete_mode = Some(config.delete);
        self.log_event(&entry);

        let walker = DirectoryWalker::new(&config.root_path);
        let walked = walker.walk(|path| {
            let outcome = self.process_file(path)?;
            observe(path, &outcome).map_err(|e| KeyfinderError::Runtime {
                details: format!("failed to write output: {e}"),
            })
        });

        self.report.duration_ms = duration_ms(start.elapsed());

        if let Err(err) = walked {
            let mut entry = LogEntry::new(EventType::Error, Severity::Critical);
            entry.error_code = Some(err.code().to_string());
            entry.error_message = Some(err.to_string());
            self.log_event(&entry);
            return Err(err);
        }

        let severity = if self.report.has_errors() {
            Severity::Warning
        } else {
            Severity::Info
        };
        let mut entry =
            LogEntry::new(EventType::ScanComplete, severity).with_path(&config.root_path);
        entry.files_visited = Some(self.report.files_visited);
        entry.matched = Some(self.report.matched);
        entry.deleted = Some(self.report.deleted);
        entry.invalid = Some(self.report.invalid);
        entry.duration_ms = Some(self.report.duration_ms);
        self.log_event(&entry);

        Ok(self.report)
    }

    fn classify_and_act(&mut self, path: &Path) -> Result<FileOutcome> {
        let window = match self.reader.read(path)? {
            HeaderRead::Window(window) => window,
            HeaderRead::Skip(reason) => return Ok(FileOutcome::Skipped(reason)),
        };

        match KeyPattern::from_config(self.config).decide(&window) {
            KeyDecision::PrefixMismatch => Ok(FileOutcome::Skipped(SkipReason::PrefixMismatch)),
            KeyDecision::SuffixMismatch => Ok(FileOutcome::Skipped(SkipReason::SuffixMismatch)),
            KeyDecision::Unterminated => Ok(FileOutcome::InvalidStructure),
            KeyDecision::Match => {
                let key = extract_key(&window).map(|k| String::from_utf8_lossy(k).into_owned());
                if self.config.delete {
                    delete_cache_file(path)?;
                    Ok(FileOutcome::Deleted { key })
                } else {
                    Ok(FileOutcome::Matched { key })
                }
            }
        }
    }

    fn log_outcome(&mut self, path: &Path, outcome: &FileOutcome) {
        let entry = match outcome {
            FileOutcome::Skipped(_) => return,
            FileOutcome::InvalidStructure => {
                let mut entry = LogEntry::new(EventType::InvalidCacheFile, Severity::Warning);
                entry.error_message = Some("key line not newline-terminated".to_string());
                entry
            }
            FileOutcome::Matched { key } => {
                let mut entry = LogEntry::new(EventType::CacheFileMatched, Severity::Info);
                entry.key.clone_from(key);
                entry
            }
            FileOutcome::Deleted { key } => {
                let mut entry = LogEntry::new(EventType::CacheFileDeleted, Severity::Info);
                entry.key.clone_from(key);
                entry
            }
        };
        self.log_event(&entry.with_path(path));
    }

    fn log_event(&mut self, entry: &LogEntry) {
        if let Some(writer) = self.activity.as_mut() {
            writer.write_entry(entry);
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn duration_ms(elapsed: Duration) -> u64 {
    elapsed.as_millis().min(u128::from(u64::MAX)) as u64
}
