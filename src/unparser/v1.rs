//! Emitter for the v1 and later grammars. v2 and v3 only widen what
//! the parser accepts; emission is shared, parameterized by the
//! version written into the `grammar` line.

use crate::core::statement::{GrammarVersion, Statement, StatementKind, ValueForm};
use crate::util::paths;

use super::quoting;
use super::{Emit, UnparseError, Unparser};

pub struct UnparserV1 {
    version: GrammarVersion,
    mode: Emit,
}

impl UnparserV1 {
    pub fn new(version: GrammarVersion, mode: Emit) -> Self {
        debug_assert!(version >= GrammarVersion::V1);
        UnparserV1 { version, mode }
    }

    fn emit_statement(
        &self,
        out: &mut String,
        indent: usize,
        statement: &Statement,
    ) -> Result<(), UnparseError> {
        let pad = "  ".repeat(indent);

        match &statement.kind {
            StatementKind::GrammarVersion { .. } => {
                out.push_str(&format!("{}grammar {}\n", pad, self.version));
            }
            StatementKind::Configuration { name, body } => {
                out.push_str(&format!("{}config {}\n", pad, name));
                for inner in body {
                    self.emit_statement(out, indent + 1, inner)?;
                }
                out.push_str(&format!("{}end\n", pad));
            }
            StatementKind::Include { descriptor, .. } => {
                out.push_str(&format!("{}include {}\n", pad, descriptor));
            }
            StatementKind::IncludeFile { path, config_name } => {
                if self.version < GrammarVersion::V3 {
                    return Err(UnparseError {
                        what: "an include-file statement".to_string(),
                        version: self.version,
                    });
                }
                out.push_str(&format!("{}include-file {}", pad, quoting::quote(path)));
                if let Some(config_name) = config_name {
                    out.push_str(&format!(" :{}", config_name));
                }
                out.push('\n');
            }
            StatementKind::Override {
                package_name,
                version,
            } => {
                out.push_str(&format!("{}override {}/{}\n", pad, package_name, version));
            }
            StatementKind::Set { name, value } => {
                out.push_str(&format!("{}set {}={}\n", pad, name, quoting::quote(value)));
            }
            StatementKind::Path { name, value } => {
                out.push_str(&format!(
                    "{}append {}={}\n",
                    pad,
                    name,
                    quoting::quote(value)
                ));
            }
            StatementKind::Archive { location, form } => {
                out.push_str(&format!("{}archive {}\n", pad, self.location(location, *form)));
            }
            StatementKind::Resource { location, form } => {
                out.push_str(&format!(
                    "{}resource {}\n",
                    pad,
                    self.location(location, *form)
                ));
            }
            StatementKind::Retrieve { variable, pattern } => {
                let pattern = if quoting::bare_safe(pattern) {
                    pattern.clone()
                } else {
                    if self.version < GrammarVersion::V2 {
                        return Err(UnparseError {
                            what: format!("the retrieve pattern \"{}\"", pattern),
                            version: self.version,
                        });
                    }
                    quoting::quote(pattern)
                };
                out.push_str(&format!("{}retrieve {}->{}\n", pad, variable, pattern));
            }
            StatementKind::Command { command } => {
                out.push_str(&format!(
                    "{}command {} end\n",
                    pad,
                    quoting::double_quote(command)
                ));
            }
            StatementKind::SyntheticRawText { text } => {
                out.push_str(text);
                if !text.ends_with('\n') {
                    out.push('\n');
                }
            }
        }

        Ok(())
    }

    /// Asset locations keep the quoting form they were written with;
    /// published definitions reference local assets by basename,
    /// because publishing places the asset next to the definition.
    /// URL locations are fetched at runtime and stay intact.
    fn location(&self, location: &str, form: ValueForm) -> String {
        let location = match self.mode {
            Emit::AsInput => location,
            Emit::ToBePublished if paths::is_url(location) => location,
            Emit::ToBePublished => paths::basename(location),
        };
        match form {
            ValueForm::Bare if quoting::bare_safe(location) => location.to_string(),
            ValueForm::DoubleQuoted => quoting::double_quote(location),
            // Single quotes cannot hold a literal single quote.
            _ if location.contains('\'') => quoting::double_quote(location),
            _ => quoting::single_quote(location),
        }
    }
}

impl Unparser for UnparserV1 {
    fn version(&self) -> GrammarVersion {
        self.version
    }

    fn unparse(&self, statements: &[Statement]) -> Result<String, UnparseError> {
        let mut out = String::new();
        for statement in statements {
            self.emit_statement(&mut out, 0, statement)?;
        }
        Ok(out)
    }
}
