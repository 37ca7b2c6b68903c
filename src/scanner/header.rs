//! Two-phase header reader.
//!
//! Phase one reads a fixed-size window from the start of the file and locates
//! the `\nKEY: ` marker. Phase two repositions the cursor at the marker's
//! offset and reads a second window of the same size; that second window is
//! what the key matcher inspects.
//!
//! The first file to reach phase one passes through the sanity gate: if it is
//! too small or carries no marker, the scan root almost certainly does not
//! hold cache files and the run is aborted. Every later file with the same
//! defects is an ordinary skip.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use memchr::memmem;

use crate::core::config::HeaderConfig;
use crate::core::errors::{KeyfinderError, Result};
use crate::scanner::session::SkipReason;

/// Literal text introducing the cache key in a file's header region.
pub const KEY_MARKER: &[u8] = b"\nKEY: ";

/// Result of reading one file's header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderRead {
    /// Second-phase window, starting exactly at the marker byte.
    Window(Vec<u8>),
    Skip(SkipReason),
}

/// Reads header windows for a single run. Owns the one-shot sanity gate.
#[derive(Debug)]
pub struct HeaderReader {
    window_bytes: usize,
    min_first_file_bytes: usize,
    gate_pending: bool,
}

impl HeaderReader {
    pub fn new(config: &HeaderConfig) -> Self {
        Self {
            window_bytes: config.window_bytes,
            min_first_file_bytes: config.min_first_file_bytes,
            gate_pending: true,
        }
    }

    /// Open `path` and read its key window.
    ///
    /// Open and read failures are silent skips. Only the sanity gate returns
    /// an error.
    pub fn read(&mut self, path: &Path) -> Result<HeaderRead> {
        let Ok(mut file) = File::open(path) else {
            return Ok(HeaderRead::Skip(SkipReason::Unreadable));
        };
        self.read_from(path, &mut file)
    }

    /// Same as [`read`](Self::read) over an already-open source.
    pub fn read_from<R: Read + Seek>(&mut self, path: &Path, source: &mut R) -> Result<HeaderRead> {
        let Ok(head) = read_window(source, self.window_bytes) else {
            return Ok(HeaderRead::Skip(SkipReason::Unreadable));
        };

        // The gate is spent on the first file that yields a readable window.
        let gated = std::mem::replace(&mut self.gate_pending, false);

        if head.len() < self.min_first_file_bytes {
            if gated {
                return Err(KeyfinderError::HeaderTooSmall {
                    path: path.to_path_buf(),
                    bytes_read: head.len(),
                    minimum: self.min_first_file_bytes,
                });
            }
            return Ok(HeaderRead::Skip(SkipReason::TooSmall));
        }

        let Some(offset) = memmem::find(&head, KEY_MARKER) else {
            if gated {
                return Err(KeyfinderError::MarkerNotFound {
                    path: path.to_path_buf(),
                });
            }
            return Ok(HeaderRead::Skip(SkipReason::NoMarker));
        };

        if source.seek(SeekFrom::Start(offset as u64)).is_err() {
            return Ok(HeaderRead::Skip(SkipReason::Unreadable));
        }
        match read_window(source, self.window_bytes) {
            Ok(window) => Ok(HeaderRead::Window(window)),
            Err(_) => Ok(HeaderRead::Skip(SkipReason::Unreadable)),
        }
    }
}

/// Read up to `limit` bytes. Hitting EOF first is not an error.
fn read_window<R: Read>(source: &mut R, limit: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(limit);
    source.by_ref().take(limit as u64).read_to_end(&mut buf)?;
    Ok(buf)
}
