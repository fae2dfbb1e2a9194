//! Core data structures for moor.
//!
//! This module contains the foundational types used throughout moor:
//! - Package descriptors (`name/version:config`)
//! - The statement sum type forming a package definition's body
//! - The parsed Package container

pub mod descriptor;
pub mod package;
pub mod statement;

pub use descriptor::{Descriptor, DEFAULT_CONFIG};
pub use package::Package;
pub use statement::{GrammarVersion, Position, Statement, StatementKind, UsageFlags, ValueForm};
