//! Error types for unibuild
//!
//! Domain-specific error types using thiserror.

use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::platform::Architecture;

/// Project location errors
#[derive(Error, Debug)]
pub enum LocatorError {
    /// No build descriptor in the scanned directory
    #[error("No project or workspace found in '{directory}'")]
    NotFound { directory: PathBuf },

    /// More than one candidate of the same kind
    #[error("Ambiguous project layout, candidates: {candidates:?}")]
    Ambiguous { candidates: Vec<PathBuf> },

    /// IO error while scanning
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// External build-tool errors
#[derive(Error, Debug)]
pub enum ToolchainError {
    /// The tool could not be launched
    #[error("Failed to launch '{program}': {error}")]
    Spawn { program: PathBuf, error: String },

    /// The tool exited with a non-zero status
    #[error("Build tool exited with status {exit_code}:\n{diagnostic}")]
    ExitFailure { exit_code: i32, diagnostic: String },

    /// Scheme listing output could not be interpreted
    #[error("Could not read scheme list for '{path}': {detail}")]
    SchemeListing { path: PathBuf, detail: String },

    /// IO error while draining tool output
    #[error("IO error reading build tool output: {error}")]
    Io { error: String },
}

/// Universal binary container errors
#[derive(Error, Debug)]
pub enum FatError {
    /// IO error reading or writing a binary
    #[error("IO error for '{path}': {error}")]
    Io { path: PathBuf, error: String },

    /// The file is neither a thin image nor a universal container
    #[error("'{path}' is not a recognized binary image (magic {magic:#010x})")]
    BadMagic { path: PathBuf, magic: u32 },

    /// Header declares data beyond the end of the file
    #[error("Binary '{path}' is truncated")]
    Truncated { path: PathBuf },
}

/// Universal binary merge errors
#[derive(Error, Debug)]
pub enum MergeError {
    /// Merge called with no inputs
    #[error("At least one input binary is required to merge")]
    NotEnoughInputs,

    /// Two inputs carry the same architecture slice
    #[error("Architecture '{architecture}' is present in more than one input")]
    DuplicateArchitecture { architecture: Architecture },

    /// Input images do not share the same binary interface shape
    #[error("Input binaries do not share the same interface shape: {reason}")]
    MismatchedInputs { reason: String },

    /// Merged output does not carry the declared architecture set
    #[error("Merged binary has architectures {actual:?}, expected {expected:?}")]
    UnexpectedArchitectures {
        expected: BTreeSet<Architecture>,
        actual: BTreeSet<Architecture>,
    },

    /// Container parse error on an input
    #[error(transparent)]
    Container(#[from] FatError),
}

/// Architecture strip errors
#[derive(Error, Debug)]
pub enum StripError {
    /// The named architecture is not in the binary
    #[error("Architecture '{architecture}' is not present in '{path}'")]
    NotPresent {
        architecture: Architecture,
        path: PathBuf,
    },

    /// Removing the slice would leave no architectures at all
    #[error("Stripping '{path}' would leave an empty container")]
    WouldEmptyContainer { path: PathBuf },

    /// Container parse error
    #[error(transparent)]
    Container(#[from] FatError),
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to list a directory
    #[error("Failed to read directory '{path}': {error}")]
    ReadDir { path: PathBuf, error: String },

    /// Failed to copy a file
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Copy destination already holds content
    #[error("Destination '{path}' already exists and is not empty")]
    DestinationNotEmpty { path: PathBuf },
}

/// Signing tool errors
#[derive(Error, Debug)]
pub enum SigningError {
    /// The signing tool could not be launched
    #[error("Failed to launch '{program}': {error}")]
    Spawn { program: PathBuf, error: String },

    /// The signing tool rejected the request
    #[error("Signing failed: {diagnostic}")]
    Failed { diagnostic: String },
}

/// Build scheduling errors
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// A project failed before any scheme could be built
    #[error("Build of {project} failed: {source}")]
    ProjectFailed {
        project: String,
        #[source]
        source: Box<UnibuildError>,
    },

    /// One scheme's build failed, aborting the run
    #[error("Build of scheme '{scheme}' in {project} failed: {source}")]
    SchemeFailed {
        project: String,
        scheme: String,
        #[source]
        source: Box<UnibuildError>,
    },

    /// The located project lists no buildable schemes
    #[error("No buildable schemes found in '{path}'")]
    NoSchemes { path: PathBuf },

    /// A build invocation produced no artifact bundle
    #[error("Scheme '{scheme}' produced no artifacts for platform {platform}")]
    MissingArtifact { scheme: String, platform: String },

    /// Two schemes produced an artifact with the same name for one platform
    #[error("Multiple schemes produce artifact '{name}' for platform {platform}")]
    ArtifactCollision { name: String, platform: String },

    /// A build task stopped without reporting an outcome
    #[error("Build task aborted: {error}")]
    Aborted { error: String },
}

/// Top-level unibuild error type
#[derive(Error, Debug)]
pub enum UnibuildError {
    /// Locator error
    #[error("Locator error: {0}")]
    Locator(#[from] LocatorError),

    /// Toolchain error
    #[error("Toolchain error: {0}")]
    Toolchain(#[from] ToolchainError),

    /// Container error
    #[error("Binary container error: {0}")]
    Fat(#[from] FatError),

    /// Merge error
    #[error("Merge error: {0}")]
    Merge(#[from] MergeError),

    /// Strip error
    #[error("Strip error: {0}")]
    Strip(#[from] StripError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Signing error
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Scheduler error
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),
}
