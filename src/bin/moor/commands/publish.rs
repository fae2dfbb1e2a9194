//! `moor publish` command

use std::path::PathBuf;

use anyhow::Result;

use crate::cli::PublishArgs;
use moor::core::Descriptor;
use moor::env::PackageStore;
use moor::ops::{self, resolve::DEFAULT_DEFINITION_FILE};

pub fn execute(args: PublishArgs, repository_flag: Option<PathBuf>) -> Result<()> {
    let config = super::app_config();
    let repository = super::open_repository(repository_flag, &config)?;

    let descriptor = Descriptor::parse(&args.descriptor)?;
    let (name, version) = match (&descriptor.name, &descriptor.version) {
        (Some(name), Some(version)) => (name.clone(), version.clone()),
        _ => anyhow::bail!(
            "publish needs a name/version descriptor, got `{}`",
            args.descriptor
        ),
    };

    let path = args
        .file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DEFINITION_FILE));
    let package = repository.package_for_file(&path)?;

    let explanations = ops::publish(&repository, &package, &name, &version)?;
    for explanation in explanations {
        tracing::info!("{}", explanation);
    }
    println!("published {}/{}", name, version);
    Ok(())
}
