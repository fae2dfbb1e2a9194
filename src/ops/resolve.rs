//! Base-package loading and environment resolution.
//!
//! The base package is whatever the invocation starts from: an
//! explicit definition file, stdin, the `package.moor` in the current
//! directory, or a repository descriptor. Command-line `--set` and
//! `--append` options become synthetic statements in an anonymous
//! package applied after the base, so they win over package-provided
//! values.

use std::io::Read;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};

use crate::core::descriptor::{Descriptor, DEFAULT_CONFIG};
use crate::core::package::Package;
use crate::core::statement::{Statement, StatementKind};
use crate::env::{IncludeSuppression, PackageStore, RuntimeEnvironment};
use crate::sources::Repository;
use crate::util::diagnostic::suggestions;

pub const DEFAULT_DEFINITION_FILE: &str = "package.moor";

/// Where the base package comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSpec {
    /// `package.moor` in the working directory.
    Default,
    File(PathBuf),
    Stdin,
    Descriptor(Descriptor),
}

#[derive(Debug, Clone)]
pub struct ResolveOptions {
    pub package: PackageSpec,
    pub config: Option<String>,
    /// `--set NAME=VALUE` pairs, in command-line order.
    pub sets: Vec<(String, String)>,
    /// `--append NAME=VALUE` pairs, in command-line order.
    pub appends: Vec<(String, String)>,
    pub retrieve_root: Option<PathBuf>,
    pub suppression: IncludeSuppression,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        ResolveOptions {
            package: PackageSpec::Default,
            config: None,
            sets: Vec::new(),
            appends: Vec::new(),
            retrieve_root: None,
            suppression: IncludeSuppression::None,
        }
    }
}

/// Load the base package named by `spec`.
pub fn load_base_package(repository: &Repository, spec: &PackageSpec) -> Result<Rc<Package>> {
    match spec {
        PackageSpec::Default => {
            let path = PathBuf::from(DEFAULT_DEFINITION_FILE);
            if !path.exists() {
                anyhow::bail!(
                    "no {} in the current directory\n{}",
                    DEFAULT_DEFINITION_FILE,
                    suggestions::NO_PACKAGE_FILE
                );
            }
            Ok(repository.package_for_file(&path)?)
        }
        PackageSpec::File(path) => Ok(repository.package_for_file(path)?),
        PackageSpec::Stdin => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read a package definition from stdin")?;
            let current = std::env::current_dir()
                .context("failed to determine the working directory")?;
            Ok(repository.package_from_text(
                &text,
                Descriptor::default().with_description("stdin"),
                &current,
                "<stdin>",
            )?)
        }
        PackageSpec::Descriptor(descriptor) => Ok(repository.package_for(descriptor)?),
    }
}

/// Resolve the full environment for one invocation: base package,
/// transitive includes, then command-line variable statements.
pub fn resolve_environment<'a>(
    repository: &'a Repository,
    options: &ResolveOptions,
) -> Result<(RuntimeEnvironment<'a>, Rc<Package>)> {
    let base = load_base_package(repository, &options.package)?;

    let mut environment = RuntimeEnvironment::new(
        repository,
        options.retrieve_root.clone(),
        options.suppression,
    );

    let config = options
        .config
        .as_deref()
        .or_else(|| match &options.package {
            PackageSpec::Descriptor(descriptor) => descriptor.config.as_deref(),
            _ => None,
        });

    environment
        .apply_base_package(&base, config)
        .with_context(|| {
            format!(
                "failed to resolve {}",
                base.name_or_file_or_description()
            )
        })?;

    if !options.sets.is_empty() || !options.appends.is_empty() {
        let overrides = command_line_package(&options.sets, &options.appends);
        environment
            .apply_base_package(&overrides, Some(DEFAULT_CONFIG))
            .context("failed to apply command-line variable options")?;
    }

    environment.finalize();
    Ok((environment, base))
}

/// Wrap `--set`/`--append` pairs as statements in an anonymous
/// package.
fn command_line_package(
    sets: &[(String, String)],
    appends: &[(String, String)],
) -> Rc<Package> {
    let description = "command line";
    let mut body = Vec::new();
    for (name, value) in sets {
        body.push(Statement::synthetic(
            StatementKind::Set {
                name: name.clone(),
                value: value.clone(),
            },
            description,
        ));
    }
    for (name, value) in appends {
        body.push(Statement::synthetic(
            StatementKind::Path {
                name: name.clone(),
                value: value.clone(),
            },
            description,
        ));
    }

    let config = Statement::synthetic(
        StatementKind::Configuration {
            name: DEFAULT_CONFIG.to_string(),
            body,
        },
        description,
    );

    Rc::new(Package::synthetic(vec![config], description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::DirectorySource;

    fn repository(dir: &std::path::Path) -> Repository {
        Repository::new(Box::new(DirectorySource::new(dir.join("repo"))), None)
    }

    #[test]
    fn test_file_base_package_resolves() {
        let dir = tempfile::TempDir::new().unwrap();
        let definition = dir.path().join("standalone.moor");
        std::fs::write(&definition, "config default\n  set GREETING=hello\nend\n")
            .unwrap();

        let repository = repository(dir.path());
        let options = ResolveOptions {
            package: PackageSpec::File(definition),
            ..ResolveOptions::default()
        };

        let (environment, base) = resolve_environment(&repository, &options).unwrap();
        assert_eq!(environment.lookup("GREETING"), Some("hello"));
        assert_eq!(base.name(), None);
    }

    #[test]
    fn test_command_line_sets_win_over_the_base() {
        let dir = tempfile::TempDir::new().unwrap();
        let definition = dir.path().join("standalone.moor");
        std::fs::write(
            &definition,
            "config default\n  set GREETING=hello\n  append TRAIL=a\nend\n",
        )
        .unwrap();

        let repository = repository(dir.path());
        let options = ResolveOptions {
            package: PackageSpec::File(definition),
            sets: vec![("GREETING".to_string(), "goodbye".to_string())],
            appends: vec![("TRAIL".to_string(), "b".to_string())],
            ..ResolveOptions::default()
        };

        let (environment, _) = resolve_environment(&repository, &options).unwrap();
        assert_eq!(environment.lookup("GREETING"), Some("goodbye"));
        let expected = format!("a{}b", crate::util::paths::path_list_separator());
        assert_eq!(environment.lookup("TRAIL"), Some(expected.as_str()));
    }

    #[test]
    fn test_descriptor_base_package_uses_its_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let package_dir = dir.path().join("repo/tool/1.0");
        std::fs::create_dir_all(&package_dir).unwrap();
        std::fs::write(
            package_dir.join("package.moor"),
            "config default\n  set MODE=normal\nend\nconfig debug\n  set MODE=debug\nend\n",
        )
        .unwrap();

        let repository = repository(dir.path());
        let options = ResolveOptions {
            package: PackageSpec::Descriptor(
                Descriptor::parse("tool/1.0:debug").unwrap(),
            ),
            ..ResolveOptions::default()
        };

        let (environment, base) = resolve_environment(&repository, &options).unwrap();
        assert_eq!(environment.lookup("MODE"), Some("debug"));
        assert_eq!(base.name(), Some("tool"));
    }

    #[test]
    fn test_explicit_missing_file_fails_with_the_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let repository = repository(dir.path());
        let options = PackageSpec::File(dir.path().join("absent.moor"));

        let err = load_base_package(&repository, &options).unwrap_err();
        assert!(err.to_string().contains("absent.moor"));
    }
}
