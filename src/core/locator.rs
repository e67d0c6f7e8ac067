//! Build descriptor discovery
//!
//! Scans a directory for workspace and project descriptors. A workspace is
//! a superset container, so it supersedes any bare project found in the same
//! scan. Ambiguity is surfaced, never silently resolved.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::error::LocatorError;

/// Exactly one discovered build unit in a directory
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectLocator {
    /// A workspace descriptor (container of projects)
    Workspace(PathBuf),
    /// A standalone project descriptor
    ProjectFile(PathBuf),
}

impl ProjectLocator {
    /// Path of the descriptor
    pub fn path(&self) -> &Path {
        match self {
            Self::Workspace(path) | Self::ProjectFile(path) => path,
        }
    }

    /// Argument flag selecting this descriptor kind on the build tool
    pub fn toolchain_flag(&self) -> &'static str {
        match self {
            Self::Workspace(_) => "-workspace",
            Self::ProjectFile(_) => "-project",
        }
    }
}

impl fmt::Display for ProjectLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

/// Scan one directory for build descriptors
///
/// Non-recursive. Returns the discovered locators, which is a single
/// workspace or a single project once disambiguated. Each call rescans the
/// directory. Fails with [`LocatorError::NotFound`] on an empty scan and
/// [`LocatorError::Ambiguous`] when more than one workspace (or more than
/// one project with no workspace) is present.
pub fn locate_projects(directory: &Path) -> Result<Vec<ProjectLocator>, LocatorError> {
    let entries = std::fs::read_dir(directory).map_err(|e| LocatorError::Io {
        path: directory.to_path_buf(),
        error: e.to_string(),
    })?;

    let mut workspaces = Vec::new();
    let mut projects = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LocatorError::Io {
            path: directory.to_path_buf(),
            error: e.to_string(),
        })?;
        let path = entry.path();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext == defaults::WORKSPACE_EXTENSION => workspaces.push(path),
            Some(ext) if ext == defaults::PROJECT_EXTENSION => projects.push(path),
            _ => {}
        }
    }
    // Deterministic order regardless of readdir order
    workspaces.sort();
    projects.sort();

    // A workspace supersedes any project found in the same scan
    let (candidates, kind): (Vec<PathBuf>, fn(PathBuf) -> ProjectLocator) = if workspaces.is_empty()
    {
        (projects, ProjectLocator::ProjectFile)
    } else {
        (workspaces, ProjectLocator::Workspace)
    };

    match candidates.len() {
        0 => Err(LocatorError::NotFound {
            directory: directory.to_path_buf(),
        }),
        1 => Ok(candidates.into_iter().map(kind).collect()),
        _ => Err(LocatorError::Ambiguous { candidates }),
    }
}

/// Locate the single build unit for a directory
///
/// Retries on the parent directory exactly once when the directory itself
/// contains no descriptor.
pub fn locate_project(directory: &Path) -> Result<ProjectLocator, LocatorError> {
    match locate_projects(directory) {
        Ok(found) => first_locator(found, directory),
        Err(LocatorError::NotFound { .. }) => {
            let parent = directory.parent().ok_or_else(|| LocatorError::NotFound {
                directory: directory.to_path_buf(),
            })?;
            tracing::debug!(
                "No descriptor in '{}', retrying parent",
                directory.display()
            );
            first_locator(locate_projects(parent)?, parent)
        }
        Err(e) => Err(e),
    }
}

fn first_locator(
    found: Vec<ProjectLocator>,
    directory: &Path,
) -> Result<ProjectLocator, LocatorError> {
    found
        .into_iter()
        .next()
        .ok_or_else(|| LocatorError::NotFound {
            directory: directory.to_path_buf(),
        })
}
