//! `moor fmt` command

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cli::FmtArgs;
use moor::core::Descriptor;
use moor::ops::resolve::DEFAULT_DEFINITION_FILE;
use moor::parser::{Parser, UnparsedPackage};
use moor::unparser::{unparse_statements, Emit};

pub fn execute(args: FmtArgs) -> Result<()> {
    let path = args
        .path
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DEFINITION_FILE));
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let base_directory = base_directory(&path);
    let package = Parser::new(None, false).parse_package(&UnparsedPackage {
        descriptor: Descriptor::for_file(path.clone(), None),
        runtime_directory: base_directory.clone(),
        include_file_base_directory: base_directory,
        source_description: path.display().to_string(),
        text,
    })?;

    let (formatted, version, _) =
        unparse_statements(package.statements(), Emit::AsInput)?;
    tracing::debug!("reprinting {} in the {} grammar", path.display(), version);

    if args.write {
        std::fs::write(&path, &formatted)
            .with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        print!("{}", formatted);
    }
    Ok(())
}

fn base_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
