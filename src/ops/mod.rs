//! High-level operations.
//!
//! This module contains the implementation of moor commands.

pub mod list_local;
pub mod list_variables;
pub mod publish;
pub mod resolve;
pub mod run;
pub mod tree;

pub use list_local::list_local;
pub use list_variables::list_variables;
pub use publish::{publish, DefinitionTextAssembler};
pub use resolve::{load_base_package, resolve_environment, PackageSpec, ResolveOptions};
pub use run::{run, RunOptions};
pub use tree::{dependency_dot, dependency_tree};
