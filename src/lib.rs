//! Moor - an environment-oriented package manager
//!
//! This crate provides the core library functionality for Moor:
//! parsing package definitions, resolving included packages into a
//! runtime environment, retrieving assets, and publishing.

pub mod core;
pub mod env;
pub mod error;
pub mod ops;
pub mod parser;
pub mod sources;
pub mod unparser;
pub mod util;

/// In-memory transport mocks for unit tests.
#[cfg(test)]
pub mod test_support;

pub use crate::core::{
    descriptor::Descriptor, package::Package, statement::GrammarVersion,
    statement::Statement, statement::StatementKind,
};

pub use env::RuntimeEnvironment;
pub use error::{Error, Result};
pub use sources::Repository;
