//! The parsed representation of a package definition for a specific
//! version. Contains the statement objects.
//!
//! A package is uniquely identified by (name, version); a different
//! version of the same package is a separate instance.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::descriptor::{compare_optional, Descriptor, DEFAULT_CONFIG};
use crate::core::statement::{Statement, StatementKind};
use crate::env::backtrace::IncludeBacktrace;
use crate::error::{NoSuchConfigError, RepositoryError};

pub struct Package {
    name: Option<String>,
    version: Option<String>,
    file_path: Option<PathBuf>,
    description: Option<String>,
    runtime_directory: PathBuf,
    include_file_base_directory: PathBuf,
    statements: Vec<Statement>,
    synthetic: bool,

    // Mutated by the runtime environment as the package is resolved.
    applied_config_names: RefCell<Vec<String>>,
    backtrace: RefCell<Option<Rc<IncludeBacktrace>>>,
}

impl Package {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: Option<String>,
        version: Option<String>,
        file_path: Option<PathBuf>,
        description: Option<String>,
        runtime_directory: PathBuf,
        include_file_base_directory: PathBuf,
        statements: Vec<Statement>,
        synthetic: bool,
    ) -> Self {
        Package {
            name,
            version,
            file_path,
            description,
            runtime_directory,
            include_file_base_directory,
            statements,
            synthetic,
            applied_config_names: RefCell::new(Vec::new()),
            backtrace: RefCell::new(None),
        }
    }

    /// An unnamed package assembled programmatically, e.g. to carry
    /// command-line environment statements.
    pub fn synthetic(statements: Vec<Statement>, description: impl Into<String>) -> Self {
        let base = PathBuf::from(".");
        Package::new(
            None,
            None,
            None,
            Some(description.into()),
            base.clone(),
            base,
            statements,
            true,
        )
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn runtime_directory(&self) -> &Path {
        &self.runtime_directory
    }

    pub fn include_file_base_directory(&self) -> &Path {
        &self.include_file_base_directory
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Was this package created from something other than usual parsing?
    pub fn is_synthetic(&self) -> bool {
        self.synthetic
    }

    pub fn descriptor(&self) -> Descriptor {
        let mut descriptor = Descriptor::new(self.name.clone(), self.version.clone(), None);
        descriptor.file_path = self.file_path.clone();
        descriptor.description = self.description.clone();
        descriptor
    }

    /// Config lookup by name; the error carries the valid config names
    /// so callers can render suggestions.
    pub fn config(&self, config_name: &str) -> Result<&Statement, NoSuchConfigError> {
        for statement in &self.statements {
            if let StatementKind::Configuration { name, .. } = &statement.kind {
                if name == config_name {
                    return Ok(statement);
                }
            }
        }

        let mut descriptor = Descriptor::new(
            self.name.clone(),
            self.version.clone(),
            Some(config_name.to_string()),
        );
        descriptor.file_path = self.file_path.clone();
        descriptor.description = self.description.clone();

        Err(NoSuchConfigError {
            descriptor,
            valid_configs: self.config_names(),
        })
    }

    pub fn configs(&self) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(|statement| matches!(statement.kind, StatementKind::Configuration { .. }))
    }

    pub fn config_names(&self) -> Vec<String> {
        self.statements
            .iter()
            .filter_map(|statement| match &statement.kind {
                StatementKind::Configuration { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn retrieves(&self) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(|statement| matches!(statement.kind, StatementKind::Retrieve { .. }))
    }

    pub fn archive_locations(&self) -> Vec<String> {
        self.statements
            .iter()
            .filter_map(|statement| match &statement.kind {
                StatementKind::Archive { location, .. } => Some(location.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn resource_locations(&self) -> Vec<String> {
        self.statements
            .iter()
            .filter_map(|statement| match &statement.kind {
                StatementKind::Resource { location, .. } => Some(location.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn applied_config_names(&self) -> Vec<String> {
        self.applied_config_names.borrow().clone()
    }

    pub fn add_applied_config_name(&self, name: &str) {
        self.applied_config_names
            .borrow_mut()
            .push(name.to_string());
    }

    pub fn backtrace(&self) -> Option<Rc<IncludeBacktrace>> {
        self.backtrace.borrow().clone()
    }

    pub fn set_backtrace(&self, backtrace: Option<Rc<IncludeBacktrace>>) {
        *self.backtrace.borrow_mut() = backtrace;
    }

    /// Descriptors of everything the named config pulls in, in statement
    /// order.
    ///
    /// Override statements encountered during the walk are applied to
    /// the backtrace as a side effect, so they affect resolution of the
    /// includes that follow them in statement order. That in-order
    /// interleaving is load-bearing: an override must be declared before
    /// the includes it is meant to pin.
    pub fn package_dependencies(
        &self,
        config_name: Option<&str>,
        backtrace: &Rc<IncludeBacktrace>,
    ) -> Result<Vec<Descriptor>, RepositoryError> {
        let config_name = config_name.unwrap_or(DEFAULT_CONFIG);
        let config = self
            .config(config_name)
            .map_err(|e| RepositoryError(e.to_string()))?;

        let mut descriptors = Vec::new();
        let mut error = None;
        config.walk(&mut |statement| {
            if error.is_some() {
                return;
            }
            match &statement.kind {
                StatementKind::Include { .. } => {
                    descriptors.push(self.resolve_include_descriptor(statement, backtrace));
                }
                StatementKind::IncludeFile { path, config_name } => {
                    descriptors.push(Descriptor::for_file(
                        self.resolve_include_file_path(path),
                        config_name.clone(),
                    ));
                }
                StatementKind::Override { .. } => {
                    if let Err(e) = backtrace.add_override(statement) {
                        error = Some(e);
                    }
                }
                _ => {}
            }
        });

        match error {
            Some(e) => Err(e),
            None => Ok(descriptors),
        }
    }

    /// Fill in the omitted parts of an include's descriptor: a nameless
    /// include refers to the containing package, and an active override
    /// on the backtrace wins over the version written in the statement.
    pub fn resolve_include_descriptor(
        &self,
        include: &Statement,
        backtrace: &Rc<IncludeBacktrace>,
    ) -> Descriptor {
        let StatementKind::Include {
            descriptor,
            containing_package_name,
        } = &include.kind
        else {
            panic!("resolve_include_descriptor called on a non-include statement");
        };

        let (name, version) = match &descriptor.name {
            Some(name) => (Some(name.clone()), descriptor.version.clone()),
            None => (
                containing_package_name
                    .clone()
                    .or_else(|| self.name.clone()),
                descriptor.version.clone().or_else(|| self.version.clone()),
            ),
        };

        let version = match &name {
            Some(name) => backtrace.get_override(name).or(version),
            None => version,
        };

        Descriptor::new(name, version, descriptor.config.clone())
    }

    /// Absolute path of an include-file target, relative to this
    /// package's base directory when not already absolute.
    pub fn resolve_include_file_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.include_file_base_directory.join(path)
        }
    }

    /// Visit every statement in the package, depth first.
    pub fn walk_statements(&self, visit: &mut dyn FnMut(&Statement)) {
        for statement in &self.statements {
            visit(statement);
            statement.walk(visit);
        }
    }

    pub fn name_or_file_or_description(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        if let Some(path) = &self.file_path {
            return format!("[{}]", path.display());
        }
        format!("<{}>", self.description.as_deref().unwrap_or(""))
    }

}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            Descriptor::format(
                Some(&self.name_or_file_or_description()),
                Some(self.version.as_deref().unwrap_or("<empty>")),
                None,
            )
        )
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("file_path", &self.file_path)
            .field("synthetic", &self.synthetic)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Package {
    /// Synthetic packages are never ordered. Packages with neither name
    /// nor description order by file path; otherwise by (name, version)
    /// with `None` sorting after any concrete value.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.synthetic || other.synthetic {
            return None;
        }

        let by_first = if self.name.is_none()
            && other.name.is_none()
            && self.description.is_none()
            && other.description.is_none()
        {
            compare_optional(&self.file_path, &other.file_path)
        } else {
            compare_optional(&self.name, &other.name)
        };

        Some(by_first.then_with(|| compare_optional(&self.version, &other.version)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, version: Option<&str>) -> Package {
        Package::new(
            Some(name.to_string()),
            version.map(str::to_string),
            None,
            None,
            PathBuf::from("."),
            PathBuf::from("."),
            Vec::new(),
            false,
        )
    }

    fn config(name: &str, body: Vec<Statement>) -> Statement {
        Statement::synthetic(
            StatementKind::Configuration {
                name: name.to_string(),
                body,
            },
            "test",
        )
    }

    #[test]
    fn test_config_lookup_reports_valid_names() {
        let package = Package::new(
            Some("pkg".into()),
            Some("1.0".into()),
            None,
            None,
            PathBuf::from("."),
            PathBuf::from("."),
            vec![config("default", vec![]), config("debug", vec![])],
            false,
        );

        assert!(package.config("default").is_ok());
        let err = package.config("nope").unwrap_err();
        assert_eq!(err.valid_configs, vec!["default", "debug"]);
        assert_eq!(err.descriptor.config.as_deref(), Some("nope"));
    }

    #[test]
    fn test_ordering_missing_version_sorts_last() {
        let concrete = named("pkg", Some("1.0"));
        let unversioned = named("pkg", None);
        assert_eq!(concrete.partial_cmp(&unversioned), Some(Ordering::Less));
    }

    #[test]
    fn test_synthetic_packages_are_incomparable() {
        let synthetic = Package::synthetic(vec![], "test");
        let real = named("pkg", Some("1.0"));
        assert_eq!(synthetic.partial_cmp(&real), None);
    }

    #[test]
    fn test_package_dependencies_applies_overrides_in_statement_order() {
        let include_dep = Statement::synthetic(
            StatementKind::Include {
                descriptor: Descriptor::parse("dep").unwrap(),
                containing_package_name: None,
            },
            "test",
        );
        let override_dep = Statement::synthetic(
            StatementKind::Override {
                package_name: "dep".into(),
                version: "9.9".into(),
            },
            "test",
        );
        let include_again = include_dep.clone();

        let package = Package::new(
            Some("pkg".into()),
            Some("1.0".into()),
            None,
            None,
            PathBuf::from("."),
            PathBuf::from("."),
            vec![config(
                "default",
                vec![include_dep, override_dep, include_again],
            )],
            false,
        );

        let backtrace = Rc::new(IncludeBacktrace::root(package.descriptor()));
        let deps = package.package_dependencies(None, &backtrace).unwrap();

        // The override only pins includes that come after it.
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].version, None);
        assert_eq!(deps[1].version.as_deref(), Some("9.9"));
    }
}
