//! `moor list` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::ListArgs;
use moor::ops::list_local;

pub fn execute(args: ListArgs, repository_flag: Option<PathBuf>) -> Result<()> {
    let config = super::app_config();
    let repository = super::open_repository(repository_flag, &config)?;

    if let Some(name) = args.name {
        for version in repository.list_versions(&name)? {
            println!("{}/{}", name, version);
        }
    } else {
        for line in list_local(&repository)? {
            println!("{}", line);
        }
    }
    Ok(())
}
