//! Package transport and the caching repository facade.
//!
//! The engine never touches storage directly. A `Transport` moves
//! definition text and assets for one backing store; `Repository`
//! wraps a transport, parses definitions, and caches the resulting
//! packages per invocation.

pub mod directory;
pub mod repository;

use std::path::{Path, PathBuf};

use crate::error::Result;

pub use directory::DirectorySource;
pub use repository::Repository;

/// How a repository reaches its backing store.
pub trait Transport {
    /// Human-readable name of the store, for diagnostics.
    fn description(&self) -> String;

    /// The definition text of one published package version.
    fn fetch_package_text(&self, name: &str, version: &str) -> Result<String>;

    /// The directory a package's files live in once fetched. Doubles
    /// as the package's runtime directory.
    fn package_directory(&self, name: &str, version: &str) -> PathBuf;

    /// All published versions of one package, sorted.
    fn list_versions(&self, name: &str) -> Result<Vec<String>>;

    /// Every `(name, version)` pair the store holds, sorted.
    fn list_packages(&self) -> Result<Vec<(String, String)>>;

    /// Publish a definition under `name/version`.
    fn publish_definition(&self, name: &str, version: &str, text: &str) -> Result<()>;

    /// Place an asset file next to a published definition.
    fn upload_asset(&self, name: &str, version: &str, source: &Path) -> Result<()>;

    /// Copy a published asset to `destination`.
    fn download_asset(
        &self,
        name: &str,
        version: &str,
        asset_name: &str,
        destination: &Path,
    ) -> Result<()>;
}
