//! Unibuild - Build orchestrator for native dependency projects
//!
//! This library turns an already-resolved, ordered list of source
//! dependencies into verified, merged, optionally trimmed binary artifacts.
//! It locates each project's build description, drives the external build
//! tool across schemes and target platforms, assembles per-architecture
//! outputs into universal binaries, and signs the result.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`core`] - Business logic (project identity, location, scheduling)
//! - [`infra`] - Infrastructure layer (external processes, filesystem,
//!   binary containers)
//! - [`config`] - Configuration and constants
//! - [`error`] - Error types and handling
//!
//! Dependency resolution, version solving, source fetching, and manifest
//! parsing are outside this crate; callers hand it an ordered
//! [`core::identifier::ProjectIdentifier`] list plus a directory of
//! checked-out sources.

pub mod config;
pub mod core;
pub mod error;
pub mod infra;

#[cfg(test)]
pub mod test_utils;
