//! Signing tool invocation and verification
//!
//! Signing applies a trust signature to an artifact bundle through the
//! external signing tool; verification runs the tool's read-only check and
//! looks for its affirmative phrase in the diagnostic output.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::config::defaults;
use crate::error::SigningError;
use crate::infra::bundle::ArtifactBundle;

/// Outcome of a signature verification
#[derive(Debug, Clone)]
pub struct Verification {
    /// Whether the signature is structurally valid
    pub valid: bool,
    /// Diagnostic text captured from the signing tool
    pub diagnostic: String,
}

/// Handle to the external signing tool
#[derive(Debug, Clone)]
pub struct Codesign {
    /// Path to the signing tool binary
    program: PathBuf,
}

impl Codesign {
    /// Wrap an explicit signing tool binary
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate the default signing tool on PATH
    pub fn locate() -> Result<Self, SigningError> {
        which::which(defaults::DEFAULT_SIGNING_TOOL)
            .map(Self::new)
            .map_err(|e| SigningError::Spawn {
                program: PathBuf::from(defaults::DEFAULT_SIGNING_TOOL),
                error: e.to_string(),
            })
    }

    /// Path to the signing tool binary
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Apply a trust signature to the bundle
    ///
    /// The literal identity "-" requests local ad-hoc signing. Any later
    /// mutation of the bundle's binary invalidates the signature.
    pub async fn sign(
        &self,
        bundle: &ArtifactBundle,
        identity: &str,
    ) -> Result<(), SigningError> {
        tracing::info!(
            "Signing '{}' with identity '{identity}'",
            bundle.path().display()
        );
        let output = Command::new(&self.program)
            .arg("--force")
            .arg("--sign")
            .arg(identity)
            .arg(bundle.path())
            .output()
            .await
            .map_err(|e| SigningError::Spawn {
                program: self.program.clone(),
                error: e.to_string(),
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(SigningError::Failed {
                diagnostic: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    /// Check whether the bundle carries a valid signature
    ///
    /// Valid means the tool exited zero and its diagnostic output contains
    /// the affirmative phrase.
    pub async fn verify(&self, bundle: &ArtifactBundle) -> Result<Verification, SigningError> {
        let output = Command::new(&self.program)
            .arg("--verify")
            .arg("--verbose")
            .arg(bundle.path())
            .output()
            .await
            .map_err(|e| SigningError::Spawn {
                program: self.program.clone(),
                error: e.to_string(),
            })?;

        let mut diagnostic = String::from_utf8_lossy(&output.stderr).into_owned();
        diagnostic.push_str(&String::from_utf8_lossy(&output.stdout));
        let valid =
            output.status.success() && diagnostic.contains(defaults::VERIFY_AFFIRMATIVE_PHRASE);
        Ok(Verification { valid, diagnostic })
    }
}
