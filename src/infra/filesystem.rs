//! Filesystem operations
//!
//! Handles file and directory operations.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::FilesystemError;

/// Create a directory and all parent directories
pub fn create_dir_all(path: &Path) -> Result<(), FilesystemError> {
    std::fs::create_dir_all(path).map_err(|e| FilesystemError::CreateDir {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Remove a directory and all its contents
pub fn remove_dir_all(path: &Path) -> Result<(), FilesystemError> {
    if path.exists() {
        std::fs::remove_dir_all(path).map_err(|e| FilesystemError::RemoveDir {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
    }
    Ok(())
}

/// Copy a directory tree to a destination that must not hold content yet
///
/// Intermediate directories are created as needed.
pub fn copy_recursive(from: &Path, to: &Path) -> Result<(), FilesystemError> {
    if exists_non_empty(to) {
        return Err(FilesystemError::DestinationNotEmpty {
            path: to.to_path_buf(),
        });
    }
    if let Some(parent) = to.parent() {
        create_dir_all(parent)?;
    }

    for entry in WalkDir::new(from) {
        let entry = entry.map_err(|e| FilesystemError::ReadDir {
            path: from.to_path_buf(),
            error: e.to_string(),
        })?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|e| FilesystemError::Copy {
                from: entry.path().to_path_buf(),
                to: to.to_path_buf(),
                error: e.to_string(),
            })?;
        let target = to.join(relative);
        if entry.file_type().is_dir() {
            create_dir_all(&target)?;
        } else {
            std::fs::copy(entry.path(), &target).map_err(|e| FilesystemError::Copy {
                from: entry.path().to_path_buf(),
                to: target.clone(),
                error: e.to_string(),
            })?;
        }
    }
    Ok(())
}

/// True when the path exists and is a non-empty directory or a file
fn exists_non_empty(path: &Path) -> bool {
    match std::fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => path.exists(),
    }
}

/// List direct children of `directory` carrying the given extension
pub fn children_with_extension(
    directory: &Path,
    extension: &str,
) -> Result<Vec<PathBuf>, FilesystemError> {
    let entries = std::fs::read_dir(directory).map_err(|e| FilesystemError::ReadDir {
        path: directory.to_path_buf(),
        error: e.to_string(),
    })?;
    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| FilesystemError::ReadDir {
            path: directory.to_path_buf(),
            error: e.to_string(),
        })?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) == Some(extension) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}
