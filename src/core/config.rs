//! Configuration: per-invocation scan parameters plus tunables loaded from an
//! optional TOML file with env var overrides.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{KeyfinderError, Result};
use crate::scanner::header::KEY_MARKER;

/// Default size of each header window read from a cache file.
pub const DEFAULT_WINDOW_BYTES: usize = 256;

/// Default minimum size the first file's header window must reach.
pub const DEFAULT_MIN_FIRST_FILE_BYTES: usize = 150;

/// Hard ceiling for `header.window_bytes`.
pub const MAX_WINDOW_BYTES: usize = 1024 * 1024;

/// What to look for and what to do with it. Built once from the command line
/// and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub root_path: PathBuf,
    /// Marker text followed by the caller's key prefix.
    pub key_prefix_pattern: Vec<u8>,
    /// Required ending of the key line; `None` disables the suffix check.
    pub key_suffix: Option<Vec<u8>>,
    pub delete: bool,
}

impl ScanConfig {
    /// Build a scan configuration. An empty suffix is the same as no suffix.
    pub fn new(
        root_path: impl Into<PathBuf>,
        key_prefix: &str,
        key_suffix: Option<&str>,
        delete: bool,
    ) -> Self {
        let mut key_prefix_pattern = Vec::with_capacity(KEY_MARKER.len() + key_prefix.len());
        key_prefix_pattern.extend_from_slice(KEY_MARKER);
        key_prefix_pattern.extend_from_slice(key_prefix.as_bytes());

        Self {
            root_path: root_path.into(),
            key_prefix_pattern,
            key_suffix: key_suffix
                .filter(|s| !s.is_empty())
                .map(|s| s.as_bytes().to_vec()),
            delete,
        }
    }
}

/// Tunables for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Settings {
    pub header: HeaderConfig,
    pub log: LogConfig,
}

/// Header window sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HeaderConfig {
    /// Bytes read per window (both the initial and the marker-offset read).
    pub window_bytes: usize,
    /// The first file of a run must yield at least this many bytes.
    pub min_first_file_bytes: usize,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            window_bytes: DEFAULT_WINDOW_BYTES,
            min_first_file_bytes: DEFAULT_MIN_FIRST_FILE_BYTES,
        }
    }
}

/// Activity log destination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// JSONL activity log path. Disabled when unset.
    pub activity_log: Option<PathBuf>,
    /// Write log lines to stderr when the log file cannot be opened.
    pub fallback_to_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            activity_log: None,
            fallback_to_stderr: true,
        }
    }
}

impl Settings {
    /// Load settings from an optional TOML file, then apply env overrides.
    ///
    /// Without a path, defaults are used. An explicit path that does not
    /// exist is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) if path.exists() => {
                let raw = fs::read_to_string(path).map_err(|e| KeyfinderError::io(path, e))?;
                toml::from_str::<Self>(&raw)?
            }
            Some(path) => {
                return Err(KeyfinderError::MissingConfig {
                    path: path.to_path_buf(),
                });
            }
            None => Self::default(),
        };

        settings.apply_env_overrides_from(env_var)?;
        settings.validate()?;
        Ok(settings)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CKF_HEADER_WINDOW_BYTES") {
            self.header.window_bytes = parse_env_usize("CKF_HEADER_WINDOW_BYTES", &raw)?;
        }

        if let Some(raw) = lookup("CKF_HEADER_MIN_FIRST_FILE_BYTES") {
            self.header.min_first_file_bytes =
                parse_env_usize("CKF_HEADER_MIN_FIRST_FILE_BYTES", &raw)?;
        }

        if let Some(raw) = lookup("CKF_ACTIVITY_LOG") {
            self.log.activity_log = Some(PathBuf::from(raw));
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let window = self.header.window_bytes;
        if window <= KEY_MARKER.len() || window > MAX_WINDOW_BYTES {
            return Err(KeyfinderError::InvalidConfig {
                details: format!(
                    "header.window_bytes must be in ({}, {MAX_WINDOW_BYTES}], got {window}",
                    KEY_MARKER.len()
                ),
            });
        }

        if self.header.min_first_file_bytes > window {
            return Err(KeyfinderError::InvalidConfig {
                details: format!(
                    "header.min_first_file_bytes ({}) must not exceed header.window_bytes ({window})",
                    self.header.min_first_file_bytes
                ),
            });
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_usize(name: &str, raw: &str) -> Result<usize> {
    raw.trim()
        .parse::<usize>()
        .map_err(|error| KeyfinderError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

#[cfg(test)]
mod tests {
    use super::{KeyfinderError, ScanConfig, Settings};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.header.window_bytes, 256);
        assert_eq!(settings.header.min_first_file_bytes, 150);
        assert!(settings.log.activity_log.is_none());
    }

    #[test]
    fn scan_config_prepends_marker_to_prefix() {
        let cfg = ScanConfig::new("/var/cache/nginx", "users:", None, false);
        assert_eq!(cfg.key_prefix_pattern, b"\nKEY: users:".to_vec());
        assert!(cfg.key_suffix.is_none());
        assert!(!cfg.delete);
    }

    #[test]
    fn empty_suffix_disables_suffix_check() {
        let cfg = ScanConfig::new("/tmp", "a", Some(""), true);
        assert!(cfg.key_suffix.is_none());
        let cfg = ScanConfig::new("/tmp", "a", Some(".jpg"), true);
        assert_eq!(cfg.key_suffix.as_deref(), Some(&b".jpg"[..]));
    }

    #[test]
    fn window_must_exceed_marker_length() {
        let mut settings = Settings::default();
        settings.header.window_bytes = 6;
        settings.header.min_first_file_bytes = 0;
        let err = settings.validate().expect_err("window too small");
        assert!(err.to_string().contains("window_bytes"));
    }

    #[test]
    fn min_first_file_bytes_cannot_exceed_window() {
        let mut settings = Settings::default();
        settings.header.min_first_file_bytes = 300;
        let err = settings.validate().expect_err("minimum above window");
        match err {
            KeyfinderError::InvalidConfig { details } => {
                assert!(details.contains("min_first_file_bytes"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn env_overrides_apply() {
        let mut settings = Settings::default();
        let overrides = vars(&[
            ("CKF_HEADER_WINDOW_BYTES", "1024"),
            ("CKF_HEADER_MIN_FIRST_FILE_BYTES", " 200 "),
            ("CKF_ACTIVITY_LOG", "/tmp/ckf.jsonl"),
        ]);
        settings
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect("overrides should parse");
        assert_eq!(settings.header.window_bytes, 1024);
        assert_eq!(settings.header.min_first_file_bytes, 200);
        assert_eq!(
            settings.log.activity_log,
            Some(PathBuf::from("/tmp/ckf.jsonl"))
        );
    }

    #[test]
    fn malformed_env_override_is_parse_error() {
        let mut settings = Settings::default();
        let overrides = vars(&[("CKF_HEADER_WINDOW_BYTES", "lots")]);
        let err = settings
            .apply_env_overrides_from(|name| overrides.get(name).cloned())
            .expect_err("non-numeric window");
        assert_eq!(err.code(), "CKF-1003");
        assert!(err.to_string().contains("CKF_HEADER_WINDOW_BYTES"));
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ckf.toml");
        std::fs::write(
            &path,
            "[header]\nwindow_bytes = 512\n\n[log]\nactivity_log = \"/tmp/a.jsonl\"\n",
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).expect("config should load");
        assert_eq!(settings.header.window_bytes, 512);
        assert_eq!(settings.header.min_first_file_bytes, 150);
        assert!(settings.log.fallback_to_stderr);
    }

    #[test]
    fn load_rejects_missing_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml")))
            .expect_err("explicit path must exist");
        assert_eq!(err.code(), "CKF-1002");
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[header\nwindow_bytes = ").unwrap();
        let err = Settings::load(Some(&path)).expect_err("malformed toml");
        assert_eq!(err.code(), "CKF-1003");
    }
}
