//! Removal of matched cache files.
//!
//! One `remove_file` per match, followed by a post-deletion check. There is no
//! transactional guarantee across matches; re-running a scan re-evaluates
//! whatever is left.

use std::fs;
use std::path::Path;

use crate::core::errors::{KeyfinderError, Result};

/// Delete a single matched cache file.
///
/// Failures are returned to the caller, which treats them as fatal for the
/// whole walk.
pub fn delete_cache_file(path: &Path) -> Result<()> {
    fs::remove_file(path).map_err(|e| KeyfinderError::io(path, e))?;

    // Post-deletion verification: path should be gone.
    if fs::symlink_metadata(path).is_ok() {
        return Err(KeyfinderError::Runtime {
            details: format!("path still exists after deletion: {}", path.display()),
        });
    }

    Ok(())
}
