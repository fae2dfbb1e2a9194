//! `moor check` command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::CheckArgs;
use moor::core::Descriptor;
use moor::ops::resolve::DEFAULT_DEFINITION_FILE;
use moor::parser::{Parser, UnparsedPackage};
use moor::util::diagnostic::ParseDiagnostic;

pub fn execute(args: CheckArgs) -> Result<()> {
    let path = args
        .path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DEFINITION_FILE));
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let base_directory = base_directory(&path);
    let unparsed = UnparsedPackage {
        descriptor: Descriptor::for_file(path.clone(), None),
        runtime_directory: base_directory.clone(),
        include_file_base_directory: base_directory,
        source_description: path.display().to_string(),
        text: text.clone(),
    };

    match Parser::new(None, false).parse_package(&unparsed) {
        Ok(package) => {
            println!(
                "{}: ok ({} statements)",
                path.display(),
                package.statements().len()
            );
            Ok(())
        }
        Err(moor::Error::Parse(error)) => {
            let report = miette::Report::new(ParseDiagnostic::from_parse_error(&error, &text));
            eprintln!("{:?}", report);
            std::process::exit(1);
        }
        Err(other) => Err(other.into()),
    }
}

fn base_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
