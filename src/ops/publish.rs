//! Publishing: assemble a canonical definition text and hand it to
//! the transport along with the package's local assets.

use anyhow::Result;

use crate::core::package::Package;
use crate::core::statement::{Statement, StatementKind};
use crate::sources::Repository;
use crate::unparser::{grammar_for_statements, unparser_for, Emit, UnparseError};
use crate::util::paths;

/// Builds the text of a definition to be published.
///
/// Input statements participate in grammar selection only; output
/// statements are what gets emitted. Grammar statements never survive
/// into the output list, because the assembler writes its own header
/// for the version it actually selected.
pub struct DefinitionTextAssembler {
    mode: Emit,
    input_statements: Vec<Statement>,
    output_statements: Vec<Statement>,
    header: Vec<String>,
    footer: Vec<String>,
}

impl DefinitionTextAssembler {
    pub fn new(mode: Emit) -> Self {
        DefinitionTextAssembler {
            mode,
            input_statements: Vec::new(),
            output_statements: Vec::new(),
            header: Vec::new(),
            footer: Vec::new(),
        }
    }

    pub fn add_input_statements<'a>(
        &mut self,
        statements: impl IntoIterator<Item = &'a Statement>,
    ) {
        self.input_statements.extend(statements.into_iter().cloned());
    }

    pub fn add_output_statements<'a>(
        &mut self,
        statements: impl IntoIterator<Item = &'a Statement>,
    ) {
        self.output_statements.extend(
            statements
                .into_iter()
                .filter(|s| !matches!(s.kind, StatementKind::GrammarVersion { .. }))
                .cloned(),
        );
    }

    /// Add a `#`-prefixed comment block above the statements.
    pub fn add_header_comment(&mut self, text: impl Into<String>) {
        self.header.push(comment_block(&text.into()));
    }

    /// Add a `#`-prefixed comment block below the statements.
    pub fn add_footer_comment(&mut self, text: impl Into<String>) {
        self.footer.push(comment_block(&text.into()));
    }

    /// Produce the definition text plus the explanations for the
    /// grammar version chosen; the first explanation names it.
    pub fn assemble(&self) -> Result<(String, Vec<String>), UnparseError> {
        let mut considered: Vec<Statement> = Vec::new();
        considered.extend(
            self.input_statements
                .iter()
                .filter(|s| !matches!(s.kind, StatementKind::GrammarVersion { .. }))
                .cloned(),
        );
        considered.extend(self.output_statements.iter().cloned());

        let (version, mut explanations) =
            grammar_for_statements(&considered, self.mode);
        explanations.insert(
            0,
            format!("emitting the definition in the {} grammar", version),
        );

        // Header and footer comments travel as raw-text statements so
        // the whole definition goes through one unparser.
        let mut emitted: Vec<Statement> = Vec::new();
        for block in &self.header {
            emitted.push(raw_text(format!("{}\n", block)));
        }
        emitted.extend(self.output_statements.iter().cloned());
        for block in &self.footer {
            emitted.push(raw_text(format!("\n{}", block)));
        }

        let unparser = unparser_for(version, self.mode);
        let body = unparser.unparse(&emitted)?;

        let mut text = String::new();
        if version > crate::core::GrammarVersion::V0 {
            text.push_str(&format!("grammar {}\n\n", version));
        }
        text.push_str(&body);

        Ok((squeeze_blank_lines(&text), explanations))
    }
}

fn raw_text(text: String) -> Statement {
    Statement::synthetic(StatementKind::SyntheticRawText { text }, "assembled text")
}

fn comment_block(text: &str) -> String {
    let mut out = String::new();
    for line in text.lines() {
        if line.is_empty() {
            out.push_str("#\n");
        } else {
            out.push_str("# ");
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Collapse runs of blank lines down to a single blank line.
fn squeeze_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Publish `package` under `name/version`: write the assembled
/// definition through the transport and upload every local asset it
/// references. Assets named by URL stay where they are.
pub fn publish(
    repository: &Repository,
    package: &Package,
    name: &str,
    version: &str,
) -> Result<Vec<String>> {
    let mut assembler = DefinitionTextAssembler::new(Emit::ToBePublished);
    assembler.add_header_comment(format!("Publication of {}/{}.", name, version));
    assembler.add_input_statements(package.statements());
    assembler.add_output_statements(package.statements());

    let (text, explanations) = assembler.assemble()?;
    repository.publish_definition(name, version, &text)?;

    for statement in package.statements().iter().filter(|s| s.is_asset()) {
        let Some(location) = statement.asset_location() else {
            continue;
        };
        if paths::is_url(location) {
            continue;
        }
        let full = package.resolve_include_file_path(location);
        if statement.asset_name().is_some() {
            repository.upload_asset(name, version, &full)?;
            continue;
        }
        // A glob location: every match is uploaded under its own name.
        for matched in glob::glob(&full.to_string_lossy())
            .map_err(|e| anyhow::anyhow!("bad asset glob {}: {}", full.display(), e))?
            .flatten()
        {
            repository.upload_asset(name, version, &matched)?;
        }
    }

    Ok(explanations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::rc::Rc;

    use crate::core::descriptor::Descriptor;
    use crate::parser::{Parser, UnparsedPackage};

    fn parsed(text: &str, base_dir: &std::path::Path) -> Rc<Package> {
        Rc::new(
            Parser::new(None, false)
                .parse_package(&UnparsedPackage {
                    descriptor: Descriptor::new(Some("p".into()), Some("1".into()), None),
                    runtime_directory: base_dir.to_path_buf(),
                    include_file_base_directory: base_dir.to_path_buf(),
                    source_description: "publish test".into(),
                    text: text.into(),
                })
                .unwrap(),
        )
    }

    #[test]
    fn test_assembled_text_has_grammar_header_and_comments() {
        let dir = tempfile::TempDir::new().unwrap();
        let package = parsed("config default\n  set FOO=bar\nend\n", dir.path());

        let mut assembler = DefinitionTextAssembler::new(Emit::ToBePublished);
        assembler.add_header_comment("Publication of p/1.\nFor testing.");
        assembler.add_footer_comment("End of definition.");
        assembler.add_input_statements(package.statements());
        assembler.add_output_statements(package.statements());

        let (text, explanations) = assembler.assemble().unwrap();
        assert!(text.starts_with("grammar v1\n"));
        assert!(text.contains("# Publication of p/1."));
        assert!(text.contains("set FOO=bar"));
        assert!(text.ends_with("# End of definition.\n"));
        assert!(!text.contains("\n\n\n"));
        assert!(explanations[0].contains("v1"));
    }

    #[test]
    fn test_input_statements_raise_the_grammar() {
        let dir = tempfile::TempDir::new().unwrap();
        let package = parsed(
            "grammar v3\nconfig default\n  include-file 'extra.moor'\nend\n",
            dir.path(),
        );

        let mut assembler = DefinitionTextAssembler::new(Emit::ToBePublished);
        assembler.add_input_statements(package.statements());
        assembler.add_output_statements(package.statements());

        let (text, explanations) = assembler.assemble().unwrap();
        assert!(text.starts_with("grammar v3\n"));
        assert!(explanations.iter().any(|e| e.contains("include-file")));
        // The original grammar statement is not re-emitted.
        assert_eq!(text.matches("grammar").count(), 1);
    }

    #[test]
    fn test_publish_writes_definition_and_uploads_local_assets() {
        let dir = tempfile::TempDir::new().unwrap();
        let package_dir = dir.path().join("work");
        std::fs::create_dir_all(&package_dir).unwrap();
        std::fs::write(package_dir.join("dist.tgz"), "artifact").unwrap();

        let package = parsed(
            "archive dist.tgz\nresource http://example/remote.txt\nconfig default\nend\n",
            &package_dir,
        );

        let transport = Rc::new(crate::test_support::MemoryTransport::new());
        let repository = Repository::new(Box::new(transport.clone()), None);
        publish(&repository, &package, "p", "1.0").unwrap();

        let text = transport.definition("p", "1.0").unwrap();
        assert!(text.contains("archive dist.tgz"));
        // Remote resources stay referenced by URL.
        assert!(text.contains("resource http://example/remote.txt"));

        let uploads = transport.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].2, package_dir.join("dist.tgz"));
    }

    #[test]
    fn test_publish_expands_glob_assets_to_every_match() {
        let dir = tempfile::TempDir::new().unwrap();
        let package_dir = dir.path().join("work");
        std::fs::create_dir_all(&package_dir).unwrap();
        std::fs::write(package_dir.join("lib-a.so"), "a").unwrap();
        std::fs::write(package_dir.join("lib-b.so"), "b").unwrap();
        std::fs::write(package_dir.join("unrelated.txt"), "no").unwrap();

        let package = parsed("resource lib-*.so\nconfig default\nend\n", &package_dir);

        let transport = Rc::new(crate::test_support::MemoryTransport::new());
        let repository = Repository::new(Box::new(transport.clone()), None);
        publish(&repository, &package, "p", "1.0").unwrap();

        let mut uploaded: Vec<PathBuf> =
            transport.uploads().into_iter().map(|(_, _, path)| path).collect();
        uploaded.sort();
        assert_eq!(
            uploaded,
            vec![package_dir.join("lib-a.so"), package_dir.join("lib-b.so")]
        );
    }
}
