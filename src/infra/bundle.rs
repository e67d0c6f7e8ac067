//! Artifact bundles
//!
//! A bundle is a directory-shaped artifact: one binary payload named after
//! the bundle plus metadata files. Its architecture set is always derived
//! from the payload, never stored.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::core::platform::Architecture;
use crate::error::{FatError, FilesystemError, StripError};
use crate::infra::{fat, filesystem};

/// A directory-shaped packaged binary plus metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactBundle {
    path: PathBuf,
}

impl ArtifactBundle {
    /// Wrap an existing or future bundle location
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Bundle directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bundle name without the container extension
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Path of the binary payload inside the bundle
    pub fn binary_path(&self) -> PathBuf {
        self.path.join(self.name())
    }

    /// Whether the bundle exists on disk
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Architectures embedded in the binary payload
    pub fn architectures(&self) -> Result<BTreeSet<Architecture>, FatError> {
        fat::architectures(&self.binary_path())
    }

    /// Copy the whole bundle (binary + metadata) to a destination path
    ///
    /// Fails if the destination already exists and is not empty.
    pub fn copy_to(&self, destination: &Path) -> Result<ArtifactBundle, FilesystemError> {
        tracing::debug!(
            "Copying bundle '{}' to '{}'",
            self.path.display(),
            destination.display()
        );
        filesystem::copy_recursive(&self.path, destination)?;
        Ok(ArtifactBundle::new(destination))
    }

    /// Remove one architecture slice from the binary payload in place
    ///
    /// Invalidates any signature previously applied to the bundle.
    pub fn strip(&self, architecture: &Architecture) -> Result<(), StripError> {
        fat::strip(&self.binary_path(), architecture)
    }
}
