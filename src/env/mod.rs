//! Runtime environment construction.
//!
//! One `RuntimeEnvironment` per invocation: it owns the variable map,
//! the registered-package set, and the pending retrieves. Resolution
//! is single-threaded, depth-first, and strictly statement-ordered;
//! override visibility depends on that ordering (an override only
//! affects includes that come after it in the same pass).

pub mod backtrace;
pub mod retrieve;

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::core::descriptor::{Descriptor, DEFAULT_CONFIG};
use crate::core::package::Package;
use crate::core::statement::{Statement, StatementKind};
use crate::error::{RepositoryError, Result, VersionConflictError};
use crate::util::paths;

pub use backtrace::IncludeBacktrace;
pub use retrieve::RetrieveManager;

/// Where the environment builder gets dependency packages from.
///
/// Implemented by `sources::Repository` for real invocations and by
/// in-memory stores in tests.
pub trait PackageStore {
    fn package_for(&self, descriptor: &Descriptor) -> Result<Rc<Package>>;
    fn package_for_file(&self, path: &Path) -> Result<Rc<Package>>;
}

/// Include statements can be suppressed wholesale or only when they
/// cross a package boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludeSuppression {
    #[default]
    None,
    All,
    CrossPackage,
}

/// An asset declaration recorded during resolution; materialization
/// belongs to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    pub owner: Descriptor,
    pub location: String,
    pub is_archive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveConfig {
    package: String,
    version: Option<String>,
    config: String,
}

impl std::fmt::Display for ActiveConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}/{}:{}", self.package, version, self.config),
            None => write!(f, "{}:{}", self.package, self.config),
        }
    }
}

pub struct RuntimeEnvironment<'a> {
    store: &'a dyn PackageStore,
    variables: BTreeMap<String, String>,
    packages: HashMap<String, Rc<Package>>,
    retrieves: RetrieveManager,
    pending_assets: Vec<PendingAsset>,
    suppression: IncludeSuppression,
    /// Depth of the include recursion below the base package; zero
    /// while applying the base package's own config.
    include_depth: usize,
    active: Vec<ActiveConfig>,
}

impl std::fmt::Debug for RuntimeEnvironment<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeEnvironment").finish_non_exhaustive()
    }
}

impl<'a> RuntimeEnvironment<'a> {
    pub fn new(
        store: &'a dyn PackageStore,
        retrieve_root: Option<PathBuf>,
        suppression: IncludeSuppression,
    ) -> Self {
        RuntimeEnvironment {
            store,
            variables: BTreeMap::new(),
            packages: HashMap::new(),
            retrieves: RetrieveManager::new(retrieve_root),
            pending_assets: Vec::new(),
            suppression,
            include_depth: 0,
            active: Vec::new(),
        }
    }

    pub fn variables(&self) -> &BTreeMap<String, String> {
        &self.variables
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Rc<Package>> {
        self.packages.values()
    }

    pub fn pending_assets(&self) -> &[PendingAsset] {
        &self.pending_assets
    }

    /// Seed a variable before resolution, e.g. from the caller's
    /// process environment.
    pub fn seed_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    /// Resolve the base package: create the root backtrace node,
    /// register the package, and apply the named (or default) config.
    pub fn apply_base_package(
        &mut self,
        package: &Rc<Package>,
        config_name: Option<&str>,
    ) -> Result<()> {
        let config_name = config_name.unwrap_or(DEFAULT_CONFIG);
        let mut descriptor = package.descriptor();
        descriptor.config = Some(config_name.to_string());
        let backtrace = Rc::new(IncludeBacktrace::root(descriptor));
        package.set_backtrace(Some(backtrace.clone()));

        self.register_package(package)?;
        self.apply_config(package, config_name, &backtrace)
    }

    /// Emit warnings for retrieves that were registered but whose
    /// variable was never set. Call once, after all configs have been
    /// applied.
    pub fn finalize(&self) {
        self.retrieves.warn_unused();
    }

    /// Record a package under its name. Idempotent for the same
    /// package object; a different package under an already-registered
    /// name is the conflicting-version failure users see.
    pub fn register_package(&mut self, package: &Rc<Package>) -> Result<()> {
        let Some(name) = package.name() else {
            // Synthetic and file-based packages are anonymous and
            // cannot conflict.
            return Ok(());
        };

        if let Some(existing) = self.packages.get(name) {
            if Rc::ptr_eq(existing, package) {
                return Ok(());
            }
            return Err(VersionConflictError {
                package: name.to_string(),
                existing: existing.version().unwrap_or("<unversioned>").to_string(),
                requested: package.version().unwrap_or("<unversioned>").to_string(),
                backtrace: existing.backtrace().map(|b| b.dump_to_string()),
            }
            .into());
        }

        for location in package.archive_locations() {
            self.pending_assets.push(PendingAsset {
                owner: package.descriptor(),
                location,
                is_archive: true,
            });
        }
        for location in package.resource_locations() {
            self.pending_assets.push(PendingAsset {
                owner: package.descriptor(),
                location,
                is_archive: false,
            });
        }

        self.packages.insert(name.to_string(), package.clone());
        Ok(())
    }

    /// Apply one config of one package: walk its statements in order,
    /// recursing into includes depth-first.
    pub fn apply_config(
        &mut self,
        package: &Rc<Package>,
        config_name: &str,
        backtrace: &Rc<IncludeBacktrace>,
    ) -> Result<()> {
        let key = ActiveConfig {
            package: package.name_or_file_or_description(),
            version: package.version().map(str::to_string),
            config: config_name.to_string(),
        };

        if self.active.contains(&key) {
            let mut chain: Vec<String> =
                self.active.iter().map(ActiveConfig::to_string).collect();
            chain.push(key.to_string());
            return Err(RepositoryError(format!(
                "circular package dependency: {}",
                chain.join(" -> ")
            ))
            .into());
        }

        if package
            .applied_config_names()
            .iter()
            .any(|applied| applied == config_name)
        {
            return Ok(());
        }
        package.add_applied_config_name(config_name);

        for statement in package.retrieves() {
            self.retrieves.add(statement);
        }

        tracing::debug!(
            "applying {} at include depth {}",
            key,
            self.include_depth
        );

        self.active.push(key);
        let result = self.apply_config_statements(package, config_name, backtrace);
        self.active.pop();
        result
    }

    fn apply_config_statements(
        &mut self,
        package: &Rc<Package>,
        config_name: &str,
        backtrace: &Rc<IncludeBacktrace>,
    ) -> Result<()> {
        let config = package.config(config_name)?;
        let StatementKind::Configuration { body, .. } = &config.kind else {
            return Ok(());
        };
        config.usage.mark_added_to_environment();

        for statement in body {
            match &statement.kind {
                StatementKind::Set { name, value } => {
                    self.apply_variable(package, statement, name, value, true)?;
                }
                StatementKind::Path { name, value } => {
                    self.apply_variable(package, statement, name, value, false)?;
                }
                StatementKind::Include { .. } => {
                    self.apply_include(package, statement, backtrace)?;
                }
                StatementKind::IncludeFile { path, config_name } => {
                    self.apply_include_file(
                        package,
                        path,
                        config_name.as_deref(),
                        backtrace,
                    )?;
                }
                StatementKind::Override { .. } => {
                    backtrace.add_override(statement)?;
                }
                // Commands run on demand (`moor run`), never during
                // environment construction.
                _ => {}
            }
        }

        Ok(())
    }

    fn apply_variable(
        &mut self,
        package: &Rc<Package>,
        statement: &Statement,
        name: &str,
        raw_value: &str,
        replace: bool,
    ) -> Result<()> {
        statement.usage.mark_added_to_environment();

        let mut value = expand_at_signs(raw_value, package.runtime_directory());

        if self.retrieves.knows(name) {
            if let Some(rewritten) = self.retrieves.activate(name, package, &value)? {
                value = rewritten;
            } else if let Some((prefix, preserved)) = value.split_once("//") {
                // The boundary marker only matters during retrieval.
                value = format!("{}/{}", prefix, preserved);
            }
        }

        if replace {
            self.variables.insert(name.to_string(), value);
            return Ok(());
        }

        match self.variables.get_mut(name) {
            Some(existing) if !existing.is_empty() => {
                existing.push(paths::path_list_separator());
                existing.push_str(&value);
            }
            _ => {
                self.variables.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    fn apply_include(
        &mut self,
        package: &Rc<Package>,
        statement: &Statement,
        backtrace: &Rc<IncludeBacktrace>,
    ) -> Result<()> {
        let resolved = package.resolve_include_descriptor(statement, backtrace);

        match self.suppression {
            IncludeSuppression::All => return Ok(()),
            IncludeSuppression::CrossPackage
                if resolved.name.is_some() && resolved.name.as_deref() != package.name() =>
            {
                return Ok(());
            }
            _ => {}
        }

        statement.usage.mark_added_to_environment();

        // A nameless or self-referencing include stays inside the
        // current package; everything else goes through the store.
        let target = if resolved.name.as_deref() == package.name()
            && resolved.version.as_deref() == package.version()
        {
            package.clone()
        } else {
            self.store.package_for(&resolved)?
        };

        let config_name = resolved
            .config
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG.to_string());

        let mut child_descriptor = target.descriptor();
        child_descriptor.config = Some(config_name.clone());
        let child = IncludeBacktrace::child(backtrace, child_descriptor);
        target.set_backtrace(Some(child.clone()));

        self.register_package(&target)?;

        self.include_depth += 1;
        let result = self.apply_config(&target, &config_name, &child);
        self.include_depth -= 1;
        result
    }

    fn apply_include_file(
        &mut self,
        package: &Rc<Package>,
        path: &str,
        config_name: Option<&str>,
        backtrace: &Rc<IncludeBacktrace>,
    ) -> Result<()> {
        let resolved_path = package.resolve_include_file_path(path);
        let target = self.store.package_for_file(&resolved_path)?;

        // File packages carry no descriptor identity; they do not push
        // a backtrace node and never participate in overrides.
        self.apply_config(
            &target,
            config_name.unwrap_or(DEFAULT_CONFIG),
            backtrace,
        )
    }
}

/// Expand `@` to the package's runtime directory; `\@` is a literal
/// `@`.
fn expand_at_signs(value: &str, runtime_directory: &Path) -> String {
    let directory = runtime_directory.to_string_lossy();
    let mut out = String::with_capacity(value.len());
    let mut rest = value.chars().peekable();
    while let Some(c) = rest.next() {
        match c {
            '\\' if rest.peek() == Some(&'@') => {
                rest.next();
                out.push('@');
            }
            '@' => out.push_str(&directory),
            _ => out.push(c),
        }
    }
    out
}
