//! Shared utilities: configuration, diagnostics, filesystem and path
//! helpers.

pub mod config;
pub mod diagnostic;
pub mod fs;
pub mod paths;
