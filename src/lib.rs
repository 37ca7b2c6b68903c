#![forbid(unsafe_code)]

//! Cache key finder (ckf): locate or purge reverse-proxy cache files by the
//! cache key embedded in their header.
//!
//! Every regular file under a root is inspected:
//! 1. **Header reader** reads a fixed window, finds the `\nKEY: ` marker and
//!    re-reads a window starting at it
//! 2. **Key matcher** compares the key line against a prefix and optional suffix
//! 3. **Session** reports or deletes matches and tallies the run
//!
//! # Library usage
//!
//! ```rust,no_run
//! use cache_keyfinder::prelude::*;
//!
//! let config = ScanConfig::new("/var/cache/nginx", "httpsexample.com/img/", None, false);
//! let report = ScanSession::new(&config, &Settings::default())
//!     .run(|path, outcome| {
//!         if matches!(outcome, FileOutcome::Matched { .. }) {
//!             println!("{}", path.display());
//!         }
//!         Ok(())
//!     })
//!     .expect("scan failed");
//! assert!(!report.has_errors());
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod scanner;
