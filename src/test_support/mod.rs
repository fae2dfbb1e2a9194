//! Test utilities for moor unit tests.
//!
//! `MemoryTransport` implements the `Transport` trait over in-memory
//! maps so repository and publish behavior can be tested without a
//! directory layout on disk.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{PackageNotFoundError, RepositoryError, Result};
use crate::sources::Transport;

/// In-memory transport; definitions and uploaded assets are held in
/// maps, downloads are unsupported.
#[derive(Default)]
pub struct MemoryTransport {
    definitions: RefCell<BTreeMap<(String, String), String>>,
    uploads: RefCell<Vec<(String, String, PathBuf)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_definition(self, name: &str, version: &str, text: &str) -> Self {
        self.definitions
            .borrow_mut()
            .insert((name.to_string(), version.to_string()), text.to_string());
        self
    }

    /// The definition text last published under `name/version`.
    pub fn definition(&self, name: &str, version: &str) -> Option<String> {
        self.definitions
            .borrow()
            .get(&(name.to_string(), version.to_string()))
            .cloned()
    }

    /// Every asset path uploaded so far, in upload order.
    pub fn uploads(&self) -> Vec<(String, String, PathBuf)> {
        self.uploads.borrow().clone()
    }
}

/// Tests keep a handle to the transport after handing it to a
/// `Repository`, so the trait is also implemented for `Rc`.
impl Transport for std::rc::Rc<MemoryTransport> {
    fn description(&self) -> String {
        (**self).description()
    }

    fn fetch_package_text(&self, name: &str, version: &str) -> Result<String> {
        (**self).fetch_package_text(name, version)
    }

    fn package_directory(&self, name: &str, version: &str) -> PathBuf {
        (**self).package_directory(name, version)
    }

    fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        (**self).list_versions(name)
    }

    fn list_packages(&self) -> Result<Vec<(String, String)>> {
        (**self).list_packages()
    }

    fn publish_definition(&self, name: &str, version: &str, text: &str) -> Result<()> {
        (**self).publish_definition(name, version, text)
    }

    fn upload_asset(&self, name: &str, version: &str, source: &Path) -> Result<()> {
        (**self).upload_asset(name, version, source)
    }

    fn download_asset(
        &self,
        name: &str,
        version: &str,
        asset_name: &str,
        destination: &Path,
    ) -> Result<()> {
        (**self).download_asset(name, version, asset_name, destination)
    }
}

impl Transport for MemoryTransport {
    fn description(&self) -> String {
        "in-memory store".to_string()
    }

    fn fetch_package_text(&self, name: &str, version: &str) -> Result<String> {
        self.definition(name, version).ok_or_else(|| {
            PackageNotFoundError {
                name: name.to_string(),
                version: Some(version.to_string()),
                store: self.description(),
            }
            .into()
        })
    }

    fn package_directory(&self, name: &str, version: &str) -> PathBuf {
        PathBuf::from(format!("/memory/{}/{}", name, version))
    }

    fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        Ok(self
            .definitions
            .borrow()
            .keys()
            .filter(|(n, _)| n == name)
            .map(|(_, version)| version.clone())
            .collect())
    }

    fn list_packages(&self) -> Result<Vec<(String, String)>> {
        Ok(self.definitions.borrow().keys().cloned().collect())
    }

    fn publish_definition(&self, name: &str, version: &str, text: &str) -> Result<()> {
        self.definitions
            .borrow_mut()
            .insert((name.to_string(), version.to_string()), text.to_string());
        Ok(())
    }

    fn upload_asset(&self, name: &str, version: &str, source: &Path) -> Result<()> {
        self.uploads
            .borrow_mut()
            .push((name.to_string(), version.to_string(), source.to_path_buf()));
        Ok(())
    }

    fn download_asset(
        &self,
        name: &str,
        version: &str,
        asset_name: &str,
        _destination: &Path,
    ) -> Result<()> {
        Err(RepositoryError(format!(
            "in-memory store holds no asset {} for {}/{}",
            asset_name, name, version
        ))
        .into())
    }
}
