//! Infrastructure layer
//!
//! Handles all I/O operations: external processes, filesystem, and binary
//! containers. This module is the only place where side effects occur.

pub mod bundle;
pub mod codesign;
pub mod fat;
pub mod filesystem;
pub mod toolchain;
