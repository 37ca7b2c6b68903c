//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use cache_keyfinder::prelude::*;
//! ```

// Core
pub use crate::core::config::{ScanConfig, Settings};
pub use crate::core::errors::{KeyfinderError, Result};

// Scanner
pub use crate::scanner::header::{HeaderRead, HeaderReader, KEY_MARKER};
pub use crate::scanner::matcher::{KeyDecision, KeyPattern};
pub use crate::scanner::session::{FileOutcome, ScanReport, ScanSession, SkipReason};
pub use crate::scanner::walker::DirectoryWalker;
