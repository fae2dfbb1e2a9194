//! `moor tree` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::TreeArgs;
use moor::ops::{dependency_dot, dependency_tree, load_base_package};

pub fn execute(args: TreeArgs, repository_flag: Option<PathBuf>) -> Result<()> {
    let config = super::app_config();
    let repository = super::open_repository(repository_flag, &config)?;
    let options = super::resolve_options(&args.package, &config)?;

    let base = load_base_package(&repository, &options.package)?;
    let rendered = if args.dot {
        dependency_dot(&repository, &base, options.config.as_deref())?
    } else {
        dependency_tree(&repository, &base, options.config.as_deref())?
    };

    print!("{}", rendered);
    Ok(())
}
