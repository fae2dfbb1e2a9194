//! The repository facade: parse-and-cache on top of a transport.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::descriptor::Descriptor;
use crate::core::package::Package;
use crate::env::PackageStore;
use crate::error::{RepositoryError, Result};
use crate::parser::{Parser, UnparsedPackage};
use crate::util::{fs, paths};

pub struct Repository {
    transport: Box<dyn crate::sources::Transport>,
    parser: Parser,
    packages: RefCell<HashMap<(String, String), Rc<Package>>>,
    file_packages: RefCell<HashMap<PathBuf, Rc<Package>>>,
}

impl Repository {
    pub fn new(
        transport: Box<dyn crate::sources::Transport>,
        url_whitelist: Option<Vec<String>>,
    ) -> Self {
        Repository {
            transport,
            parser: Parser::new(url_whitelist, false),
            packages: RefCell::new(HashMap::new()),
            file_packages: RefCell::new(HashMap::new()),
        }
    }

    pub fn transport(&self) -> &dyn crate::sources::Transport {
        self.transport.as_ref()
    }

    pub fn list_packages(&self) -> Result<Vec<(String, String)>> {
        self.transport.list_packages()
    }

    pub fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        self.transport.list_versions(name)
    }

    pub fn publish_definition(&self, name: &str, version: &str, text: &str) -> Result<()> {
        self.transport.publish_definition(name, version, text)
    }

    pub fn upload_asset(&self, name: &str, version: &str, source: &Path) -> Result<()> {
        self.transport.upload_asset(name, version, source)
    }

    /// Parse a definition that lives outside the repository, for
    /// direct file and stdin invocations. The descriptor's base
    /// directories anchor `@` expansion and include-file resolution.
    pub fn package_from_text(
        &self,
        text: &str,
        descriptor: Descriptor,
        base_directory: &Path,
        source_description: &str,
    ) -> Result<Rc<Package>> {
        let package = self.parser.parse_package(&UnparsedPackage {
            descriptor,
            runtime_directory: base_directory.to_path_buf(),
            include_file_base_directory: base_directory.to_path_buf(),
            source_description: source_description.to_string(),
            text: text.to_string(),
        })?;
        Ok(Rc::new(package))
    }
}

impl PackageStore for Repository {
    fn package_for(&self, descriptor: &Descriptor) -> Result<Rc<Package>> {
        let Some(name) = &descriptor.name else {
            return Err(RepositoryError(format!(
                "cannot load a package without a name from {}",
                self.transport.description()
            ))
            .into());
        };
        let Some(version) = &descriptor.version else {
            return Err(RepositoryError(format!(
                "no version specified for package {}",
                name
            ))
            .into());
        };

        let key = (name.clone(), version.clone());
        if let Some(package) = self.packages.borrow().get(&key) {
            return Ok(package.clone());
        }

        let text = self.transport.fetch_package_text(name, version)?;
        let directory = self.transport.package_directory(name, version);
        let package = Rc::new(self.parser.parse_package(&UnparsedPackage {
            descriptor: Descriptor::new(Some(name.clone()), Some(version.clone()), None),
            runtime_directory: directory.clone(),
            include_file_base_directory: directory,
            source_description: format!("{}/{}", name, version),
            text,
        })?);

        self.packages.borrow_mut().insert(key, package.clone());
        Ok(package)
    }

    fn package_for_file(&self, path: &Path) -> Result<Rc<Package>> {
        let normalized = paths::normalize_path(path);
        if let Some(package) = self.file_packages.borrow().get(&normalized) {
            return Ok(package.clone());
        }

        let text = fs::read_to_string(path)?;
        let base_directory = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let package = Rc::new(self.parser.parse_package(&UnparsedPackage {
            descriptor: Descriptor::for_file(path.to_path_buf(), None),
            runtime_directory: base_directory.clone(),
            include_file_base_directory: base_directory,
            source_description: path.display().to_string(),
            text,
        })?);

        self.file_packages
            .borrow_mut()
            .insert(normalized, package.clone());
        Ok(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::DirectorySource;

    fn repository_with(definitions: &[(&str, &str, &str)]) -> (tempfile::TempDir, Repository) {
        let dir = tempfile::TempDir::new().unwrap();
        for (name, version, text) in definitions {
            let package_dir = dir.path().join(name).join(version);
            std::fs::create_dir_all(&package_dir).unwrap();
            std::fs::write(package_dir.join("package.moor"), text).unwrap();
        }
        let repository = Repository::new(
            Box::new(DirectorySource::new(dir.path())),
            None,
        );
        (dir, repository)
    }

    #[test]
    fn test_packages_are_cached_per_identity() {
        let (_dir, repository) = repository_with(&[(
            "dep",
            "1.0",
            "config default\n  set FOO=bar\nend\n",
        )]);

        let descriptor =
            Descriptor::new(Some("dep".into()), Some("1.0".into()), None);
        let first = repository.package_for(&descriptor).unwrap();
        let second = repository.package_for(&descriptor).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.name(), Some("dep"));
    }

    #[test]
    fn test_versionless_descriptor_is_rejected() {
        let (_dir, repository) =
            repository_with(&[("dep", "1.0", "config default\nend\n")]);

        let descriptor = Descriptor::new(Some("dep".into()), None, None);
        let err = repository.package_for(&descriptor).unwrap_err();
        assert!(err.to_string().contains("no version specified"));
    }

    #[test]
    fn test_runtime_directory_points_into_the_repository() {
        let (dir, repository) =
            repository_with(&[("dep", "1.0", "config default\nend\n")]);

        let descriptor =
            Descriptor::new(Some("dep".into()), Some("1.0".into()), None);
        let package = repository.package_for(&descriptor).unwrap();
        assert_eq!(
            package.runtime_directory(),
            dir.path().join("dep").join("1.0")
        );
    }

    #[test]
    fn test_file_package_has_no_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let definition = dir.path().join("standalone.moor");
        std::fs::write(&definition, "config default\n  set X=1\nend\n").unwrap();

        let repository = Repository::new(
            Box::new(DirectorySource::new(dir.path().join("repo"))),
            None,
        );
        let package = repository.package_for_file(&definition).unwrap();
        assert_eq!(package.name(), None);
        assert!(package.file_path().is_some());

        let again = repository.package_for_file(&definition).unwrap();
        assert!(Rc::ptr_eq(&package, &again));
    }
}
