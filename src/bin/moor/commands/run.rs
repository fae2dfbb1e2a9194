//! `moor run` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::RunArgs;
use moor::ops::{self, RunOptions};

pub fn execute(args: RunArgs, repository_flag: Option<PathBuf>) -> Result<i32> {
    let config = super::app_config();
    let repository = super::open_repository(repository_flag, &config)?;

    let options = RunOptions {
        resolve: super::resolve_options(&args.package, &config)?,
        argv: args.argv,
    };

    ops::run(&repository, &options)
}
