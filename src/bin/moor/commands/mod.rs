//! Command implementations

use std::path::{Path, PathBuf};

use anyhow::Result;

use moor::core::Descriptor;
use moor::env::IncludeSuppression;
use moor::ops::{PackageSpec, ResolveOptions};
use moor::sources::{DirectorySource, Repository};
use moor::util::config::{
    self, load_app_config, project_config_path, AppConfig,
};

use crate::cli::PackageArgs;

pub mod check;
pub mod env;
pub mod fmt;
pub mod list;
pub mod publish;
pub mod run;
pub mod tree;

/// Default retrieve destination when `--update` names no directory.
const DEFAULT_RETRIEVE_DIRECTORY: &str = ".moor/retrieve";

/// Merged global and project configuration for the working directory.
pub fn app_config() -> AppConfig {
    let global = config::global_config_path();
    load_app_config(global.as_deref(), &project_config_path(Path::new(".")))
}

/// Open the package repository: `--repository` wins, then the config
/// files, then `~/.moor/repository`.
pub fn open_repository(flag: Option<PathBuf>, config: &AppConfig) -> Result<Repository> {
    let root = flag
        .or_else(|| config.repository.path.clone())
        .or_else(|| config::global_config_dir().map(|dir| dir.join("repository")))
        .ok_or_else(|| anyhow::anyhow!("no repository configured and no home directory"))?;

    Ok(Repository::new(
        Box::new(DirectorySource::new(root)),
        config.repository.url_whitelist.clone(),
    ))
}

/// Translate the shared package arguments into resolve options.
pub fn resolve_options(args: &PackageArgs, config: &AppConfig) -> Result<ResolveOptions> {
    let package = if args.stdin {
        PackageSpec::Stdin
    } else if let Some(file) = &args.file {
        PackageSpec::File(file.clone())
    } else if let Some(descriptor) = &args.package {
        PackageSpec::Descriptor(Descriptor::parse(descriptor)?)
    } else {
        PackageSpec::Default
    };

    // The configured default config must not shadow one named in the
    // descriptor itself.
    let descriptor_config = match &package {
        PackageSpec::Descriptor(descriptor) => descriptor.config.clone(),
        _ => None,
    };
    let config_name = args
        .config
        .clone()
        .or(descriptor_config)
        .or_else(|| config.environment.default_config.clone());

    let retrieve_root = match &args.update {
        None => None,
        Some(Some(dir)) => Some(dir.clone()),
        Some(None) => Some(
            config
                .environment
                .retrieve_directory
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_RETRIEVE_DIRECTORY)),
        ),
    };

    let suppression = if args.suppress_includes {
        IncludeSuppression::All
    } else if args.suppress_cross_package_includes {
        IncludeSuppression::CrossPackage
    } else {
        IncludeSuppression::None
    };

    Ok(ResolveOptions {
        package,
        config: config_name,
        sets: parse_assignments(&args.set)?,
        appends: parse_assignments(&args.append)?,
        retrieve_root,
        suppression,
    })
}

fn parse_assignments(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .ok_or_else(|| anyhow::anyhow!("expected NAME=VALUE, got `{}`", pair))
        })
        .collect()
}
