//! CKF-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, KeyfinderError>;

/// Top-level error type for the cache key finder.
#[derive(Debug, Error)]
pub enum KeyfinderError {
    #[error("[CKF-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CKF-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CKF-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error(
        "[CKF-2001] first file too small ({bytes_read} bytes, need {minimum}): {path}. Path incorrect?"
    )]
    HeaderTooSmall {
        path: PathBuf,
        bytes_read: usize,
        minimum: usize,
    },

    #[error("[CKF-2002] could not find key marker in first file: {path}. Path incorrect?")]
    MarkerNotFound { path: PathBuf },

    #[error("[CKF-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[CKF-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl KeyfinderError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "CKF-1001",
            Self::MissingConfig { .. } => "CKF-1002",
            Self::ConfigParse { .. } => "CKF-1003",
            Self::HeaderTooSmall { .. } => "CKF-2001",
            Self::MarkerNotFound { .. } => "CKF-2002",
            Self::Io { .. } => "CKF-3002",
            Self::Runtime { .. } => "CKF-3900",
        }
    }

    /// Whether the error came from the first-file sanity gate, i.e. the scan
    /// root most likely does not hold cache files at all.
    #[must_use]
    pub const fn is_sanity_failure(&self) -> bool {
        matches!(
            self,
            Self::HeaderTooSmall { .. } | Self::MarkerNotFound { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<toml::de::Error> for KeyfinderError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
