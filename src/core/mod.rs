//! Core business logic module
//!
//! This module contains the build orchestration logic for unibuild.
//! External processes and filesystem side effects live in [`crate::infra`].
//!
//! # Submodules
//!
//! - [`identifier`] - Resolved dependency identity and build schemes
//! - [`locator`] - Build descriptor discovery in a source tree
//! - [`platform`] - Target platforms, SDKs, and architectures
//! - [`scheduler`] - Ordered-yet-concurrent build execution

pub mod identifier;
pub mod locator;
pub mod platform;
pub mod scheduler;
