//! Emitter for the original v0 grammar: bareword values, raw double
//! quotes for command text and asset locations, no escapes anywhere.

use crate::core::statement::{Statement, StatementKind, ValueForm};
use crate::core::GrammarVersion;
use crate::util::paths;

use super::quoting;
use super::{Emit, UnparseError, Unparser};

pub struct UnparserV0 {
    mode: Emit,
}

impl UnparserV0 {
    pub fn new(mode: Emit) -> Self {
        UnparserV0 { mode }
    }

    fn not_representable(&self, what: impl Into<String>) -> UnparseError {
        UnparseError {
            what: what.into(),
            version: GrammarVersion::V0,
        }
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
                out.push_str(&format!("{}grammar v0\n", pad));
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
            StatementKind::IncludeFile { .. } => {
                return Err(self.not_representable("an include-file statement"));
            }
            StatementKind::Override {
                package_name,
                version,
            } => {
                out.push_str(&format!("{}override {}/{}\n", pad, package_name, version));
            }
            StatementKind::Set { name, value } => {
                if !quoting::v0_set_safe(value) {
                    return Err(self.not_representable(format!("the value \"{}\"", value)));
                }
                out.push_str(&format!("{}set {}={}\n", pad, name, value));
            }
            StatementKind::Path { name, value } => {
                if !quoting::v0_path_safe(value) {
                    return Err(self.not_representable(format!("the value \"{}\"", value)));
                }
                out.push_str(&format!("{}append {}={}\n", pad, name, value));
            }
            StatementKind::Archive { location, form } => {
                out.push_str(&format!(
                    "{}archive {}\n",
                    pad,
                    self.location(location, *form)?
                ));
            }
            StatementKind::Resource { location, form } => {
                out.push_str(&format!(
                    "{}resource {}\n",
                    pad,
                    self.location(location, *form)?
                ));
            }
            StatementKind::Retrieve { variable, pattern } => {
                if !quoting::bare_safe(pattern) {
                    return Err(
                        self.not_representable(format!("the retrieve pattern \"{}\"", pattern))
                    );
                }
                out.push_str(&format!("{}retrieve {}->{}\n", pad, variable, pattern));
            }
            StatementKind::Command { command } => {
                if !quoting::v0_command_safe(command) {
                    return Err(
                        self.not_representable(format!("the command \"{}\"", command))
                    );
                }
                out.push_str(&format!("{}command \"{}\"\n", pad, command));
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

    fn location(&self, location: &str, form: ValueForm) -> Result<String, UnparseError> {
        let location = match self.mode {
            Emit::AsInput => location,
            Emit::ToBePublished if paths::is_url(location) => location,
            Emit::ToBePublished => paths::basename(location),
        };
        if location.contains(crate::parser::V0_ASSET_DISALLOWED) {
            return Err(self.not_representable(format!("the location \"{}\"", location)));
        }
        match form {
            ValueForm::Bare if quoting::bare_safe(location) => Ok(location.to_string()),
            // Raw double quotes shelter whitespace but nothing else.
            ValueForm::Bare | ValueForm::DoubleQuoted if !location.contains('#') => {
                Ok(format!("\"{}\"", location))
            }
            _ => Err(self.not_representable(format!("the location \"{}\"", location))),
        }
    }
}

impl Unparser for UnparserV0 {
    fn version(&self) -> GrammarVersion {
        GrammarVersion::V0
    }

    fn unparse(&self, statements: &[Statement]) -> Result<String, UnparseError> {
        let mut out = String::new();
        for statement in statements {
            self.emit_statement(&mut out, 0, statement)?;
        }
        Ok(out)
    }
}
