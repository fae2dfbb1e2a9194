//! Serializing statements back to package definition text.
//!
//! Each grammar version has an emitter; `grammar_for_statements`
//! inspects a statement list and picks the lowest version that can
//! represent every value, along with human-readable explanations of
//! what pushed the version up. The emitters stay symmetric with the
//! parser: re-parsing emitted text yields structurally equal
//! statements.

pub mod quoting;
mod v0;
mod v1;

use thiserror::Error;

use crate::core::statement::{GrammarVersion, Statement, StatementKind, ValueForm};

pub use v0::UnparserV0;
pub use v1::UnparserV1;

/// What the emitted text is for. Published definitions reference
/// assets by basename, because publishing uploads the asset next to
/// the definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    AsInput,
    ToBePublished,
}

#[derive(Debug, Clone, Error)]
#[error("cannot represent {what} in the {version} grammar")]
pub struct UnparseError {
    pub what: String,
    pub version: GrammarVersion,
}

pub trait Unparser {
    fn version(&self) -> GrammarVersion;
    fn unparse(&self, statements: &[Statement]) -> Result<String, UnparseError>;
}

pub fn unparser_for(version: GrammarVersion, mode: Emit) -> Box<dyn Unparser> {
    match version {
        GrammarVersion::V0 => Box::new(UnparserV0::new(mode)),
        later => Box::new(UnparserV1::new(later, mode)),
    }
}

/// Pick the lowest grammar version able to represent `statements`,
/// with one explanation per statement that raised the requirement.
pub fn grammar_for_statements(
    statements: &[Statement],
    mode: Emit,
) -> (GrammarVersion, Vec<String>) {
    let mut version = GrammarVersion::V0;
    let mut explanations = Vec::new();

    if mode == Emit::ToBePublished {
        version = GrammarVersion::V1;
        explanations.push("published definitions use at least the v1 grammar".to_string());
    }

    let mut consider = |statement: &Statement| {
        let required = version_required_by(statement);
        if required > version {
            version = required;
        }
        if required > GrammarVersion::V0 {
            explanations.push(format!(
                "grammar {} required by the {} statement{}",
                required,
                statement.keyword(),
                statement.position_string(),
            ));
        }
    };

    for statement in statements {
        consider(statement);
        statement.walk(&mut consider);
    }

    (version, explanations)
}

fn version_required_by(statement: &Statement) -> GrammarVersion {
    match &statement.kind {
        StatementKind::IncludeFile { .. } => GrammarVersion::V3,
        StatementKind::Retrieve { pattern, .. } => {
            if quoting::bare_safe(pattern) {
                GrammarVersion::V0
            } else {
                GrammarVersion::V2
            }
        }
        StatementKind::Set { value, .. } => {
            if quoting::v0_set_safe(value) {
                GrammarVersion::V0
            } else {
                GrammarVersion::V1
            }
        }
        StatementKind::Path { value, .. } => {
            if quoting::v0_path_safe(value) {
                GrammarVersion::V0
            } else {
                GrammarVersion::V1
            }
        }
        StatementKind::Archive { location, form }
        | StatementKind::Resource { location, form } => {
            if asset_fits_v0(location, *form) {
                GrammarVersion::V0
            } else {
                GrammarVersion::V1
            }
        }
        StatementKind::Command { command } => {
            if quoting::v0_command_safe(command) {
                GrammarVersion::V0
            } else {
                GrammarVersion::V1
            }
        }
        StatementKind::GrammarVersion { version } => *version,
        _ => GrammarVersion::V0,
    }
}

/// v0 asset locations reject `@ < > | ' "` outright; beyond that, bare
/// locations cannot contain token-splitting characters, while raw
/// double quotes shelter whitespace. Single-quoted locations only
/// exist from v1 on.
fn asset_fits_v0(location: &str, form: ValueForm) -> bool {
    if location.contains(crate::parser::V0_ASSET_DISALLOWED) {
        return false;
    }
    match form {
        ValueForm::Bare => quoting::bare_safe(location),
        ValueForm::DoubleQuoted => !location.contains('#'),
        ValueForm::SingleQuoted => false,
    }
}

/// Serialize `statements` with the lowest workable grammar. Returns
/// the text, the version used, and the version explanations.
pub fn unparse_statements(
    statements: &[Statement],
    mode: Emit,
) -> Result<(String, GrammarVersion, Vec<String>), UnparseError> {
    let (version, explanations) = grammar_for_statements(statements, mode);
    let text = unparser_for(version, mode).unparse(statements)?;
    Ok((text, version, explanations))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::core::descriptor::Descriptor;
    use crate::parser::{Parser, UnparsedPackage};

    fn parse_statements(text: &str) -> Vec<Statement> {
        let package = Parser::new(None, false)
            .parse_package(&UnparsedPackage {
                descriptor: Descriptor::new(Some("p".into()), Some("1.0".into()), None),
                runtime_directory: PathBuf::from("."),
                include_file_base_directory: PathBuf::from("."),
                source_description: "round trip".into(),
                text: text.to_string(),
            })
            .unwrap();
        package.statements().to_vec()
    }

    fn assert_round_trips(text: &str) {
        let statements = parse_statements(text);
        let (version, _) = grammar_for_statements(&statements, Emit::AsInput);
        let emitted = unparser_for(version, Emit::AsInput)
            .unparse(&statements)
            .unwrap();
        let reparsed = parse_statements(&emitted);
        assert_eq!(statements, reparsed, "emitted text:\n{}", emitted);
    }

    #[test]
    fn test_v0_round_trip() {
        assert_round_trips(
            "archive dist.tgz\n\
             retrieve LIB->libs/[package]\n\
             config default\n\
             \x20 include dep/1.2:tools\n\
             \x20 override pinned/3.0\n\
             \x20 set FOO=bar\n\
             \x20 append PATH_LIKE=@/bin\n\
             \x20 command \"echo hello world\"\n\
             end\n",
        );
    }

    #[test]
    fn test_v1_round_trip_with_quoting() {
        assert_round_trips(
            "grammar v1\n\
             resource 'a resource with spaces.txt'\n\
             config default\n\
             \x20 set MESSAGE='two words'\n\
             \x20 set TRICKY=\"it's\"\n\
             \x20 append WIDE='x;y:z'\n\
             \x20 command \"echo done\" end\n\
             end\n",
        );
    }

    #[test]
    fn test_v2_round_trip_quoted_retrieve() {
        assert_round_trips(
            "grammar v2\n\
             retrieve FOO->'dest dir/[package]'\n\
             config default\nend\n",
        );
    }

    #[test]
    fn test_v3_round_trip_include_file() {
        assert_round_trips(
            "grammar v3\n\
             config default\n\
             \x20 include-file 'extra definitions.moor' :tools\n\
             end\n",
        );
    }

    #[test]
    fn test_version_selection_explanations() {
        let statements = parse_statements(
            "grammar v3\nconfig default\n  include-file 'x.moor'\n  set S='a b'\nend\n",
        );
        // Strip the grammar statement so selection reflects content.
        let without_grammar: Vec<_> = statements
            .iter()
            .filter(|s| !matches!(s.kind, StatementKind::GrammarVersion { .. }))
            .cloned()
            .collect();

        let (version, explanations) =
            grammar_for_statements(&without_grammar, Emit::AsInput);
        assert_eq!(version, GrammarVersion::V3);
        assert!(explanations.iter().any(|e| e.contains("include-file")));
        assert!(explanations.iter().any(|e| e.contains("v1")));
    }

    #[test]
    fn test_published_mode_is_at_least_v1() {
        let statements = parse_statements("config default\n  set FOO=bar\nend\n");
        let (version, explanations) =
            grammar_for_statements(&statements, Emit::ToBePublished);
        assert_eq!(version, GrammarVersion::V1);
        assert!(!explanations.is_empty());
    }

    #[test]
    fn test_published_assets_by_basename() {
        let statements = parse_statements("archive lib/deep/dist.tgz\nconfig default\nend\n");
        let text = unparser_for(GrammarVersion::V1, Emit::ToBePublished)
            .unparse(&statements)
            .unwrap();
        assert!(text.contains("archive dist.tgz"));
        assert!(!text.contains("lib/deep"));
    }
}
