//! Sequential depth-first directory walker.
//!
//! Children of each directory are visited in lexicographic order by file name;
//! a subdirectory is fully walked before its next sibling. Only regular files
//! reach the visitor. FIFOs, sockets and device nodes are passed over, since
//! opening one can block indefinitely. A symlink below the root is visited
//! when it resolves to a regular file and is never descended.
//!
//! Any traversal error (unreadable directory, vanished root) aborts the walk
//! and is returned to the caller.

#![allow(missing_docs)]

use std::fs::{self, FileType};
use std::path::{Path, PathBuf};

use crate::core::errors::{KeyfinderError, Result};

/// Walks every regular file under one root path.
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Visit every regular file in traversal order.
    ///
    /// The first error, from the filesystem or from `visit`, stops the walk.
    pub fn walk<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(&Path) -> Result<()>,
    {
        // The root is named explicitly by the operator, so a symlinked root is followed.
        let meta = fs::metadata(&self.root).map_err(|e| KeyfinderError::io(&self.root, e))?;
        if !meta.is_dir() {
            return if meta.is_file() {
                visit(&self.root)
            } else {
                Ok(())
            };
        }

        let mut stack = vec![read_sorted(&self.root)?.into_iter()];
        while let Some(children) = stack.last_mut() {
            let Some((path, file_type)) = children.next() else {
                stack.pop();
                continue;
            };

            if file_type.is_dir() {
                stack.push(read_sorted(&path)?.into_iter());
            } else if is_regular_file(&path, file_type) {
                visit(&path)?;
            }
        }

        Ok(())
    }
}

/// Read one directory level, sorted by file name.
fn read_sorted(dir: &Path) -> Result<Vec<(PathBuf, FileType)>> {
    let entries = fs::read_dir(dir).map_err(|e| KeyfinderError::io(dir, e))?;

    let mut children = Vec::new();
    for entry_result in entries {
        let entry = entry_result.map_err(|e| KeyfinderError::io(dir, e))?;
        // file_type() does not follow symlinks and is usually free (cached in the dirent).
        let file_type = entry
            .file_type()
            .map_err(|e| KeyfinderError::io(entry.path(), e))?;
        children.push((entry.path(), file_type));
    }

    children.sort_by(|a, b| a.0.file_name().cmp(&b.0.file_name()));
    Ok(children)
}

/// Dangling links and links to anything but a regular file do not qualify.
fn is_regular_file(path: &Path, file_type: FileType) -> bool {
    if file_type.is_symlink() {
        return fs::metadata(path).is_ok_and(|meta| meta.is_file());
    }
    file_type.is_file()
}
