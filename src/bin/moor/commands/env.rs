//! `moor env` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::EnvArgs;
use moor::ops::{list_variables, resolve_environment};

pub fn execute(args: EnvArgs, repository_flag: Option<PathBuf>) -> Result<()> {
    let config = super::app_config();
    let repository = super::open_repository(repository_flag, &config)?;
    let options = super::resolve_options(&args.package, &config)?;

    let (environment, _) = resolve_environment(&repository, &options)?;
    print!("{}", list_variables(&environment));
    Ok(())
}
