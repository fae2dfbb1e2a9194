//! Retrieve activation: copying package files into a working
//! directory when an environment variable that names them is set.
//!
//! A `retrieve VAR->pattern` statement registers interest in VAR. When
//! some package later sets VAR, the retrieve is activated against that
//! concrete package: `[package]` in the pattern is substituted with
//! the package's name, the files the value points at are copied under
//! the retrieve root, and the variable is rewritten to the retrieved
//! location. A `//` inside the value marks the boundary after which
//! the path is preserved verbatim under the destination.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::package::Package;
use crate::core::statement::{Statement, StatementKind};
use crate::error::Result;
use crate::util::{fs, paths};

#[derive(Debug)]
struct RetrieveEntry {
    pattern: String,
    description: String,
    used: bool,
}

/// Pending retrieves for one environment-building invocation.
#[derive(Debug, Default)]
pub struct RetrieveManager {
    /// Where retrieved files land; `None` means retrieval was not
    /// requested and retrieves are tracked but never activated.
    root: Option<PathBuf>,
    entries: HashMap<String, RetrieveEntry>,
}

impl RetrieveManager {
    pub fn new(root: Option<PathBuf>) -> Self {
        RetrieveManager {
            root,
            entries: HashMap::new(),
        }
    }

    /// Register a retrieve statement. The first registration for a
    /// variable wins; later duplicates are ignored.
    pub fn add(&mut self, statement: &Statement) {
        let StatementKind::Retrieve { variable, pattern } = &statement.kind else {
            return;
        };
        self.entries
            .entry(variable.clone())
            .or_insert_with(|| RetrieveEntry {
                pattern: pattern.clone(),
                description: statement.position_string(),
                used: false,
            });
    }

    pub fn knows(&self, variable: &str) -> bool {
        self.entries.contains_key(variable)
    }

    /// Activate the retrieve for `variable` against a concrete package
    /// whose statement just set it. Returns the rewritten variable
    /// value when files were (or would be) retrieved, `None` when
    /// retrieval was not requested for this invocation.
    ///
    /// Missing source files warn and leave the value pointing at the
    /// destination; they never abort the build.
    pub fn activate(
        &mut self,
        variable: &str,
        package: &Package,
        expanded_value: &str,
    ) -> Result<Option<String>> {
        let Some(entry) = self.entries.get_mut(variable) else {
            return Ok(None);
        };
        entry.used = true;

        let Some(root) = &self.root else {
            return Ok(None);
        };
        let Some(package_name) = package.name() else {
            // Synthetic and file-based packages have nothing to
            // substitute for [package]; their values pass through.
            return Ok(None);
        };

        let destination_directory =
            root.join(substitute_package_name(&entry.pattern, package_name));

        // `prefix//suffix` copies `prefix/suffix` and keeps `suffix`
        // as the layout under the destination.
        let (source, destination) = match expanded_value.split_once("//") {
            Some((prefix, preserved)) => (
                PathBuf::from(format!("{}/{}", prefix, preserved)),
                destination_directory.join(preserved),
            ),
            None => {
                let source = PathBuf::from(expanded_value);
                let destination =
                    destination_directory.join(paths::basename(expanded_value));
                (source, destination)
            }
        };

        copy_matches(&source, &destination, variable)?;

        Ok(Some(destination.to_string_lossy().into_owned()))
    }

    /// Variables with a registered retrieve that no applied statement
    /// ever set, sorted.
    pub fn unused_variables(&self) -> Vec<&str> {
        let mut unused: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.used)
            .map(|(variable, _)| variable.as_str())
            .collect();
        unused.sort_unstable();
        unused
    }

    /// Warn about every registered retrieve whose variable was never
    /// set by any applied statement.
    pub fn warn_unused(&self) {
        for variable in self.unused_variables() {
            let entry = &self.entries[variable];
            tracing::warn!(
                "retrieve {}->{} was never referenced{}",
                variable,
                entry.pattern,
                entry.description,
            );
        }
    }
}

/// Copy whatever `source` names: an exact file or directory, or every
/// glob match when the path contains glob metacharacters.
fn copy_matches(source: &Path, destination: &Path, variable: &str) -> Result<()> {
    let source_text = source.to_string_lossy();

    if source_text.contains(['*', '?', '[']) {
        let Ok(matches) = glob::glob(&source_text) else {
            tracing::warn!("retrieve source {} is not a valid glob", source_text);
            return Ok(());
        };
        let mut found_any = false;
        for matched in matches.flatten() {
            found_any = true;
            let target = match matched.file_name() {
                Some(name) => destination.join(name),
                None => destination.to_path_buf(),
            };
            fs::copy_recursive(&matched, &target)?;
        }
        if !found_any {
            tracing::warn!(
                "nothing matched retrieve source {} for variable {}",
                source_text,
                variable,
            );
        }
        return Ok(());
    }

    if !source.exists() {
        tracing::warn!(
            "retrieve source {} for variable {} does not exist",
            source.display(),
            variable,
        );
        return Ok(());
    }

    fs::copy_recursive(source, destination)
}

fn substitute_package_name(pattern: &str, package_name: &str) -> String {
    pattern.replace("[package]", package_name)
}
