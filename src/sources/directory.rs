//! Filesystem-backed transport.
//!
//! Layout: `root/<name>/<version>/package.moor`, with asset files
//! stored next to the definition.

use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::error::{Error, PackageNotFoundError, RepositoryError, Result};
use crate::sources::Transport;
use crate::util::fs;

pub const DEFINITION_FILE: &str = "package.moor";

pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn definition_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version).join(DEFINITION_FILE)
    }

    /// Subdirectory names of `directory`, skipping hidden entries.
    fn subdirectories(directory: &Path) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = std::fs::read_dir(directory).map_err(|e| {
            Error::io(format!("failed to list {}", directory.display()), e)
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::io(format!("failed to list {}", directory.display()), e)
            })?;
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

impl Transport for DirectorySource {
    fn description(&self) -> String {
        format!("directory repository at {}", self.root.display())
    }

    fn fetch_package_text(&self, name: &str, version: &str) -> Result<String> {
        let path = self.definition_path(name, version);
        if !path.exists() {
            return Err(PackageNotFoundError {
                name: name.to_string(),
                version: Some(version.to_string()),
                store: self.description(),
            }
            .into());
        }
        fs::read_to_string(&path)
    }

    fn package_directory(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version)
    }

    fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        let directory = self.root.join(name);
        if !directory.exists() {
            return Err(PackageNotFoundError {
                name: name.to_string(),
                version: None,
                store: self.description(),
            }
            .into());
        }
        Self::subdirectories(&directory)
    }

    fn list_packages(&self) -> Result<Vec<(String, String)>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let names = Self::subdirectories(&self.root)?;

        // Version scans are independent per package.
        let mut pairs: Vec<(String, String)> = names
            .par_iter()
            .map(|name| -> Result<Vec<(String, String)>> {
                let versions = Self::subdirectories(&self.root.join(name))?;
                Ok(versions
                    .into_iter()
                    .filter(|version| {
                        self.definition_path(name, version).exists()
                    })
                    .map(|version| (name.clone(), version))
                    .collect())
            })
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .flatten()
            .collect();

        pairs.sort();
        Ok(pairs)
    }

    fn publish_definition(&self, name: &str, version: &str, text: &str) -> Result<()> {
        fs::write(&self.definition_path(name, version), text)
    }

    fn upload_asset(&self, name: &str, version: &str, source: &Path) -> Result<()> {
        let Some(file_name) = source.file_name() else {
            return Err(RepositoryError(format!(
                "cannot derive an asset name from {}",
                source.display()
            ))
            .into());
        };
        let destination = self.package_directory(name, version).join(file_name);
        fs::copy_recursive(source, &destination)
    }

    fn download_asset(
        &self,
        name: &str,
        version: &str,
        asset_name: &str,
        destination: &Path,
    ) -> Result<()> {
        let source = self.package_directory(name, version).join(asset_name);
        if !source.exists() {
            return Err(RepositoryError(format!(
                "asset {} not found for {}/{}",
                asset_name, name, version
            ))
            .into());
        }
        fs::copy_recursive(&source, destination)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_source(dir: &Path) -> DirectorySource {
        for (name, version) in [("alpha", "1.0"), ("alpha", "2.0"), ("beta", "0.5")] {
            let package_dir = dir.join(name).join(version);
            std::fs::create_dir_all(&package_dir).unwrap();
            std::fs::write(
                package_dir.join(DEFINITION_FILE),
                "config default\nend\n",
            )
            .unwrap();
        }
        // A version directory without a definition is not a package.
        std::fs::create_dir_all(dir.join("beta").join("incomplete")).unwrap();
        DirectorySource::new(dir)
    }

    #[test]
    fn test_fetch_and_list() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = seeded_source(dir.path());

        let text = source.fetch_package_text("alpha", "1.0").unwrap();
        assert!(text.contains("config default"));

        assert_eq!(source.list_versions("alpha").unwrap(), vec!["1.0", "2.0"]);
        assert_eq!(
            source.list_packages().unwrap(),
            vec![
                ("alpha".to_string(), "1.0".to_string()),
                ("alpha".to_string(), "2.0".to_string()),
                ("beta".to_string(), "0.5".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_package_is_a_not_found_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = seeded_source(dir.path());

        let err = source.fetch_package_text("gamma", "1.0").unwrap_err();
        assert!(matches!(err, Error::PackageNotFound(_)));
        assert!(err.to_string().contains("gamma/1.0"));

        let err = source.list_versions("gamma").unwrap_err();
        assert!(matches!(err, Error::PackageNotFound(_)));
    }

    #[test]
    fn test_publish_and_asset_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = DirectorySource::new(dir.path().join("repo"));

        source
            .publish_definition("newpkg", "1.0", "config default\nend\n")
            .unwrap();
        assert!(source.fetch_package_text("newpkg", "1.0").is_ok());

        let asset = dir.path().join("dist.tgz");
        std::fs::write(&asset, "bytes").unwrap();
        source.upload_asset("newpkg", "1.0", &asset).unwrap();

        let fetched = dir.path().join("fetched.tgz");
        source
            .download_asset("newpkg", "1.0", "dist.tgz", &fetched)
            .unwrap();
        assert_eq!(std::fs::read_to_string(fetched).unwrap(), "bytes");
    }
}
